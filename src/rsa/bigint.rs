// RSA Big Integer Operations
// Modular arithmetic and primality testing on top of num-bigint

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{thread_rng, Rng};

/// RSA Big Integer type alias
pub type RsaBigInt = BigUint;

/// Create a big integer from u64
pub fn from_u64(n: u64) -> RsaBigInt {
    RsaBigInt::from(n)
}

/// Modular exponentiation: base^exp mod modulus
/// Uses square-and-multiply algorithm
pub fn mod_pow(base: &RsaBigInt, exp: &RsaBigInt, modulus: &RsaBigInt) -> RsaBigInt {
    if modulus.is_one() {
        return RsaBigInt::zero();
    }

    let mut result = RsaBigInt::one();
    let mut base = base % modulus;
    let mut exp = exp.clone();

    while !exp.is_zero() {
        if exp.is_odd() {
            result = (&result * &base) % modulus;
        }
        base = (&base * &base) % modulus;
        exp >>= 1;
    }

    result
}

/// Extended Euclidean Algorithm
/// Returns (g, x, y) such that a*x + b*y = g = gcd(a, b)
pub fn xgcd(a: &RsaBigInt, b: &RsaBigInt) -> (RsaBigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (BigInt::from(a.clone()), BigInt::from(b.clone()));
    let (mut old_x, mut x) = (BigInt::one(), BigInt::zero());
    let (mut old_y, mut y) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let q = &old_r / &r;

        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);

        let next_x = &old_x - &q * &x;
        old_x = std::mem::replace(&mut x, next_x);

        let next_y = &old_y - &q * &y;
        old_y = std::mem::replace(&mut y, next_y);
    }

    // Both inputs are non-negative, so the gcd is too
    let g = old_r.to_biguint().unwrap_or_default();
    (g, old_x, old_y)
}

/// Compute modular inverse: a^(-1) mod m
/// Returns None if inverse doesn't exist
pub fn mod_inverse(a: &RsaBigInt, m: &RsaBigInt) -> Option<RsaBigInt> {
    if m.is_zero() {
        return None;
    }

    let (g, x, _) = xgcd(a, m);
    if !g.is_one() {
        return None;
    }

    x.mod_floor(&BigInt::from(m.clone())).to_biguint()
}

/// Greatest common divisor
pub fn gcd(a: &RsaBigInt, b: &RsaBigInt) -> RsaBigInt {
    a.gcd(b)
}

/// Miller-Rabin primality test
/// Returns true if n is probably prime; a composite survives with
/// probability at most 4^-rounds
pub fn is_probable_prime(n: &RsaBigInt, rounds: u32) -> bool {
    is_probable_prime_with(n, rounds, &mut thread_rng())
}

/// Miller-Rabin primality test drawing witnesses from `rng`
pub fn is_probable_prime_with<R: Rng + ?Sized>(n: &RsaBigInt, rounds: u32, rng: &mut R) -> bool {
    let two = RsaBigInt::from(2u8);
    let three = RsaBigInt::from(3u8);

    if n == &two || n == &three {
        return true;
    }
    if n < &two || n.is_even() {
        return false;
    }

    // Write n-1 as r * 2^s with r odd
    let n_minus_one = n - 1u8;
    let mut r = n_minus_one.clone();
    let mut s = 0u32;
    while r.is_even() {
        r >>= 1;
        s += 1;
    }

    for _ in 0..rounds {
        // Witness a in [2, n-1)
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = mod_pow(&a, &r, n);

        if x.is_one() || x == n_minus_one {
            continue;
        }

        let mut squarings = 1;
        while squarings < s && x != n_minus_one {
            x = (&x * &x) % n;
            if x.is_one() {
                return false;
            }
            squarings += 1;
        }

        if x != n_minus_one {
            return false;
        }
    }

    true
}

/// Random odd number of exactly `bit_length` bits; `bit_length` must be at least 2
pub(crate) fn prime_candidate<R: Rng + ?Sized>(bit_length: u32, rng: &mut R) -> RsaBigInt {
    debug_assert!(bit_length >= 2, "prime candidates need at least 2 bits");
    let mut candidate = rng.gen_biguint(u64::from(bit_length));
    candidate |= (RsaBigInt::one() << (bit_length - 1)) | RsaBigInt::one();
    candidate
}

/// Generate a random prime of specified bit length (at least 2)
pub fn random_prime(bit_length: u32, rounds: u32) -> RsaBigInt {
    random_prime_with(bit_length, rounds, &mut thread_rng())
}

/// Generate a random prime of specified bit length from `rng`
pub fn random_prime_with<R: Rng + ?Sized>(bit_length: u32, rounds: u32, rng: &mut R) -> RsaBigInt {
    loop {
        let candidate = prime_candidate(bit_length, rng);
        if is_probable_prime_with(&candidate, rounds, rng) {
            return candidate;
        }
    }
}
