// RSA Decryption Implementation
// Reverses the per-character encoding produced by the encrypt module

use num_traits::ToPrimitive;

use super::bigint::{mod_pow, RsaBigInt};
use super::encrypt::EncodedUnit;
use super::keygen::RsaPrivateKey;
use crate::error::{CryptError, Result};

/// Decrypt a single value: value^d mod n
pub fn decode_unit(value: &RsaBigInt, private_key: &RsaPrivateKey) -> RsaBigInt {
    mod_pow(value, &private_key.d, &private_key.n)
}

/// Parse the whitespace-separated decimal tokens of one ciphertext line
pub fn parse_unit(line: &str) -> Result<EncodedUnit> {
    line.split_ascii_whitespace()
        .map(|token| {
            token
                .parse::<RsaBigInt>()
                .map_err(|_| CryptError::MalformedCiphertext(format!("invalid token {:?}", token)))
        })
        .collect()
}

/// Decrypt one ciphertext line back into its characters
pub fn decode_line(line: &str, private_key: &RsaPrivateKey) -> Result<String> {
    parse_unit(line)?
        .iter()
        .map(|value| {
            let plain = decode_unit(value, private_key);
            plain
                .to_u32()
                .and_then(char::from_u32)
                .ok_or_else(|| {
                    CryptError::MalformedCiphertext(format!("{} does not decode to a character", value))
                })
        })
        .collect()
}

/// Decrypt text produced by `encrypt_text`.
/// Every token is decoded, so single-line ciphertext that encrypts its own
/// newline characters is also accepted.
pub fn decrypt_text(ciphertext: &str, private_key: &RsaPrivateKey) -> Result<String> {
    let lines = ciphertext
        .split('\n')
        .map(|line| decode_line(line, private_key))
        .collect::<Result<Vec<_>>>()?;

    Ok(lines.join("\n"))
}
