// Error Types
// Failure taxonomy shared by key generation, the key store and the file codec

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the RSA core
#[derive(Debug, Error)]
pub enum CryptError {
    #[error("key size in bits must be >= {minimum}, got {requested}")]
    InvalidKeySize { requested: u32, minimum: u32 },

    #[error("could not open key store {path}: {source}")]
    KeyStoreUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not write key store {path}: {source}")]
    KeyStoreWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("key record in {path} is malformed: {reason}")]
    MalformedKeyRecord { path: PathBuf, reason: String },

    #[error("modular inverse does not exist (gcd(e, phi) != 1)")]
    ModularInverseUndefined,

    #[error("{0} already encrypted")]
    AlreadyEncrypted(PathBuf),

    #[error("{0} not encrypted")]
    NotEncrypted(PathBuf),

    #[error("{0} already exists")]
    TargetExists(PathBuf),

    #[error("{0} is the key record")]
    KeyRecordProtected(PathBuf),

    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("character U+{code:04X} is not below the key modulus")]
    PlaintextOutOfRange { code: u32 },

    #[error("{0} is not valid UTF-8 text")]
    InvalidEncoding(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CryptError {
    /// True for the two file-state violations, which directory traversal
    /// reports as skips instead of aborting
    pub fn is_state_violation(&self) -> bool {
        matches!(self, CryptError::AlreadyEncrypted(_) | CryptError::NotEncrypted(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CryptError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for the RSA core
pub type Result<T> = std::result::Result<T, CryptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_violations() {
        assert!(CryptError::AlreadyEncrypted(PathBuf::from("a.enc")).is_state_violation());
        assert!(CryptError::NotEncrypted(PathBuf::from("a")).is_state_violation());
        assert!(!CryptError::ModularInverseUndefined.is_state_violation());
        assert!(!CryptError::TargetExists(PathBuf::from("a.enc")).is_state_violation());
        assert!(!CryptError::InvalidKeySize { requested: 64, minimum: 128 }.is_state_violation());
    }

    #[test]
    fn test_messages() {
        let err = CryptError::AlreadyEncrypted(PathBuf::from("notes.txt.enc"));
        assert_eq!(err.to_string(), "notes.txt.enc already encrypted");

        let err = CryptError::PlaintextOutOfRange { code: 0x41 };
        assert_eq!(err.to_string(), "character U+0041 is not below the key modulus");
    }
}
