// RSA Key Generation
// Implements RSA key pair generation (public and private keys)

use chrono::{DateTime, Local};
use num_traits::One;
use rand::{thread_rng, Rng};
use tracing::{debug, info, warn};

use super::bigint::{from_u64, gcd, mod_inverse, random_prime_with, RsaBigInt};
use crate::config::{Config, MIN_KEY_SIZE, PUBLIC_EXPONENT};
use crate::error::{CryptError, Result};
use crate::keystore::KeyStore;

/// Smallest prime size for which two distinct primes can be drawn
pub const MIN_PRIME_BITS: u32 = 3;

/// Attempts with fresh primes before a missing inverse is reported
pub const MAX_ATTEMPTS: u32 = 16;

/// RSA Public Key
#[derive(Debug, Clone, PartialEq)]
pub struct RsaPublicKey {
    pub n: RsaBigInt, // Modulus
    pub e: RsaBigInt, // Public exponent
}

/// RSA Private Key
#[derive(Debug, Clone, PartialEq)]
pub struct RsaPrivateKey {
    pub n: RsaBigInt, // Modulus (same as public)
    pub d: RsaBigInt, // Private exponent
}

/// The two primes behind a freshly generated modulus; never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PrimeFactors {
    pub p: RsaBigInt,
    pub q: RsaBigInt,
}

/// RSA Key Pair (both public and private keys)
#[derive(Debug, Clone)]
pub struct RsaKeyPair {
    pub public_key: RsaPublicKey,
    pub private_key: RsaPrivateKey,
    pub created_at: DateTime<Local>,
    pub factors: Option<PrimeFactors>,
}

impl RsaPublicKey {
    /// Get the bit length of the modulus
    pub fn bit_length(&self) -> u64 {
        self.n.bits()
    }

    /// Leading bytes of the modulus in hex, for display
    pub fn fingerprint(&self) -> String {
        let bytes = self.n.to_bytes_be();
        hex::encode(&bytes[..bytes.len().min(8)])
    }
}

impl RsaPrivateKey {
    /// Get the bit length of the modulus
    pub fn bit_length(&self) -> u64 {
        self.n.bits()
    }
}

impl RsaKeyPair {
    /// Get the bit length of the key
    pub fn bit_length(&self) -> u64 {
        self.public_key.bit_length()
    }
}

/// Turn a requested total key size into the size actually generated.
/// `None` selects `default_size`; anything else is rounded down to a power of two.
pub fn resolve_key_size(requested: Option<u32>, default_size: u32) -> Result<u32> {
    let bits = match requested {
        None => return Ok(default_size),
        Some(bits) => bits,
    };

    if bits < MIN_KEY_SIZE {
        return Err(CryptError::InvalidKeySize {
            requested: bits,
            minimum: MIN_KEY_SIZE,
        });
    }

    Ok(1 << (u32::BITS - 1 - bits.leading_zeros()))
}

/// Build a key pair from two chosen primes with e = 65537
pub fn derive_keypair(p: RsaBigInt, q: RsaBigInt) -> Result<RsaKeyPair> {
    let e = from_u64(PUBLIC_EXPONENT);

    let n = &p * &q;
    let phi = (&p - 1u8) * (&q - 1u8);

    if !gcd(&e, &phi).is_one() {
        return Err(CryptError::ModularInverseUndefined);
    }

    let d = mod_inverse(&e, &phi).ok_or(CryptError::ModularInverseUndefined)?;

    Ok(RsaKeyPair {
        public_key: RsaPublicKey { n: n.clone(), e },
        private_key: RsaPrivateKey { n, d },
        created_at: Local::now(),
        factors: Some(PrimeFactors { p, q }),
    })
}

/// Generates key pairs and persists them to a key store
pub struct KeyGenerator<'a, S: KeyStore> {
    store: &'a S,
    prime_rounds: u32,
}

impl<'a, S: KeyStore> KeyGenerator<'a, S> {
    pub fn new(config: &Config, store: &'a S) -> Self {
        Self {
            store,
            prime_rounds: config.prime_rounds,
        }
    }

    /// Generate a key pair from two primes of `prime_bits` each and save it,
    /// replacing any existing record
    pub fn generate(&self, prime_bits: u32) -> Result<RsaKeyPair> {
        self.generate_with(prime_bits, &mut thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(&self, prime_bits: u32, rng: &mut R) -> Result<RsaKeyPair> {
        let keypair = generate_keypair_with(prime_bits, self.prime_rounds, rng)?;
        self.store.save(&keypair)?;

        info!(
            bits = keypair.bit_length(),
            fingerprint = %keypair.public_key.fingerprint(),
            "key generation successful"
        );
        Ok(keypair)
    }
}

/// Generate a key pair without persisting it
pub fn generate_keypair(prime_bits: u32, rounds: u32) -> Result<RsaKeyPair> {
    generate_keypair_with(prime_bits, rounds, &mut thread_rng())
}

pub fn generate_keypair_with<R: Rng + ?Sized>(
    prime_bits: u32,
    rounds: u32,
    rng: &mut R,
) -> Result<RsaKeyPair> {
    if prime_bits < MIN_PRIME_BITS {
        return Err(CryptError::InvalidKeySize {
            requested: prime_bits.saturating_mul(2),
            minimum: MIN_PRIME_BITS * 2,
        });
    }

    generate_keypair_from(|| random_prime_with(prime_bits, rounds, rng))
}

/// Key pair search over primes supplied by `next_prime`: `q` is redrawn while it
/// equals `p`, and both are redrawn while e has no inverse mod phi(n), up to
/// `MAX_ATTEMPTS` times
pub fn generate_keypair_from<P>(mut next_prime: P) -> Result<RsaKeyPair>
where
    P: FnMut() -> RsaBigInt,
{
    let mut attempt = 1;
    loop {
        debug!(attempt, "searching for primes");
        let p = next_prime();
        let mut q = next_prime();
        while q == p {
            q = next_prime();
        }

        match derive_keypair(p, q) {
            Err(CryptError::ModularInverseUndefined) if attempt < MAX_ATTEMPTS => {
                warn!(attempt, "e is not coprime with phi(n), drawing fresh primes");
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::bigint::{is_probable_prime, mod_pow};
    use num_bigint::RandBigInt;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_resolve_key_size() {
        assert_eq!(resolve_key_size(None, 2048).unwrap(), 2048);
        assert_eq!(resolve_key_size(Some(128), 2048).unwrap(), 128);
        assert_eq!(resolve_key_size(Some(1000), 2048).unwrap(), 512);
        assert_eq!(resolve_key_size(Some(4096), 2048).unwrap(), 4096);
        assert_eq!(resolve_key_size(Some(4095), 2048).unwrap(), 2048);
    }

    #[test]
    fn test_resolve_key_size_too_small() {
        let err = resolve_key_size(Some(127), 2048).unwrap_err();
        assert!(matches!(err, CryptError::InvalidKeySize { requested: 127, minimum: 128 }));
    }

    #[test]
    fn test_degenerate_prime_size_rejected() {
        let err = generate_keypair(2, 10).unwrap_err();
        assert!(matches!(err, CryptError::InvalidKeySize { .. }));
    }

    #[test]
    fn test_derive_keypair_small_primes() {
        // 61 * 53 = 3233, phi = 3120, 65537 mod 3120 = 17
        let keypair = derive_keypair(from_u64(61), from_u64(53)).unwrap();
        assert_eq!(keypair.public_key.n, from_u64(3233));
        assert_eq!(keypair.private_key.d, from_u64(2753));
    }

    #[test]
    fn test_derive_keypair_without_inverse() {
        // p - 1 = 2 * 65537, so e divides phi
        let p = from_u64(131_075);
        let err = derive_keypair(p, from_u64(3)).unwrap_err();
        assert!(matches!(err, CryptError::ModularInverseUndefined));
    }

    #[test]
    fn test_key_generation() {
        let mut rng = StdRng::seed_from_u64(2024);
        let keypair = generate_keypair_with(128, 40, &mut rng).unwrap();

        let factors = keypair.factors.clone().unwrap();
        assert_ne!(factors.p, factors.q);
        assert_eq!(factors.p.bits(), 128);
        assert_eq!(factors.q.bits(), 128);
        assert!(is_probable_prime(&factors.p, 40));
        assert!(is_probable_prime(&factors.q, 40));

        let bits = keypair.bit_length();
        assert!(bits == 255 || bits == 256);
        assert_eq!(keypair.public_key.e, from_u64(65537));
    }

    #[test]
    fn test_key_properties() {
        let keypair = generate_keypair(128, 40).unwrap();
        let factors = keypair.factors.clone().unwrap();

        // Verify n = p * q
        assert_eq!(keypair.public_key.n, &factors.p * &factors.q);
        assert_eq!(keypair.public_key.n, keypair.private_key.n);

        // Verify e * d ≡ 1 (mod φ(n))
        let phi_n = (&factors.p - 1u8) * (&factors.q - 1u8);
        let product = &keypair.public_key.e * &keypair.private_key.d;
        assert_eq!(product % &phi_n, from_u64(1));
    }

    #[test]
    fn test_textbook_correctness() {
        let mut rng = StdRng::seed_from_u64(5);
        let keypair = generate_keypair_with(128, 40, &mut rng).unwrap();
        let n = &keypair.public_key.n;

        for _ in 0..25 {
            let m = rng.gen_biguint_below(n);
            let c = mod_pow(&m, &keypair.public_key.e, n);
            assert_eq!(mod_pow(&c, &keypair.private_key.d, n), m);
        }
    }

    #[test]
    fn test_fingerprint() {
        let keypair = derive_keypair(from_u64(61), from_u64(53)).unwrap();
        // 3233 = 0x0ca1
        assert_eq!(keypair.public_key.fingerprint(), "0ca1");
    }

    #[test]
    fn test_retries_then_reports_missing_inverse() {
        // Alternating 131075 and 3: e divides phi on every attempt
        let mut calls = 0u32;
        let err = generate_keypair_from(|| {
            calls += 1;
            if calls % 2 == 1 {
                from_u64(131_075)
            } else {
                from_u64(3)
            }
        })
        .unwrap_err();

        assert!(matches!(err, CryptError::ModularInverseUndefined));
        assert_eq!(calls, 2 * MAX_ATTEMPTS);
    }

    #[test]
    fn test_retry_recovers_with_fresh_primes() {
        let mut primes = vec![131_075u64, 3, 61, 53].into_iter();
        let keypair = generate_keypair_from(|| from_u64(primes.next().unwrap())).unwrap();
        assert_eq!(keypair.public_key.n, from_u64(3233));
        assert!(primes.next().is_none());
    }

    #[test]
    fn test_repeated_prime_draws_fresh_q() {
        let mut primes = vec![61u64, 61, 61, 53].into_iter();
        let keypair = generate_keypair_from(|| from_u64(primes.next().unwrap())).unwrap();

        let factors = keypair.factors.unwrap();
        assert_eq!(factors.p, from_u64(61));
        assert_eq!(factors.q, from_u64(53));
        assert_eq!(keypair.private_key.d, from_u64(2753));
        assert!(primes.next().is_none());
    }
}
