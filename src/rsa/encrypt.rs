// RSA Encryption Implementation
// Textbook (unpadded) RSA applied to one character at a time

use super::bigint::{from_u64, mod_pow, RsaBigInt};
use super::keygen::RsaPublicKey;
use crate::error::{CryptError, Result};

/// Ciphertext for one line: one integer per character, in order
pub type EncodedUnit = Vec<RsaBigInt>;

/// Encrypt a single value: value^e mod n.
/// The caller keeps `value` below the modulus.
pub fn encode_unit(value: &RsaBigInt, public_key: &RsaPublicKey) -> RsaBigInt {
    mod_pow(value, &public_key.e, &public_key.n)
}

/// Encrypt every character of `line`
pub fn encode_line(line: &str, public_key: &RsaPublicKey) -> Result<EncodedUnit> {
    line.chars()
        .map(|c| {
            let code = u32::from(c);
            let value = from_u64(u64::from(code));
            if value >= public_key.n {
                return Err(CryptError::PlaintextOutOfRange { code });
            }
            Ok(encode_unit(&value, public_key))
        })
        .collect()
}

/// Space-separated decimal rendering of an encoded line
pub fn serialize_unit(unit: &EncodedUnit) -> String {
    unit.iter()
        .map(|value| value.to_str_radix(10))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Encrypt a string line by line.
/// Newlines stay as line separators; every other character becomes one token.
pub fn encrypt_text(plaintext: &str, public_key: &RsaPublicKey) -> Result<String> {
    let lines = plaintext
        .split('\n')
        .map(|line| encode_line(line, public_key).map(|unit| serialize_unit(&unit)))
        .collect::<Result<Vec<_>>>()?;

    Ok(lines.join("\n"))
}
