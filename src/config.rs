// Configuration
// Settings passed explicitly into the key generator, key store and file codec

use std::path::PathBuf;

/// Public exponent used for every generated key (2^16 + 1)
pub const PUBLIC_EXPONENT: u64 = 65537;

/// Default total key size in bits
pub const DEFAULT_KEY_SIZE: u32 = 2048;

/// Smallest total key size accepted from the command line
pub const MIN_KEY_SIZE: u32 = 128;

/// Miller-Rabin rounds used when searching for key primes
pub const DEFAULT_PRIME_ROUNDS: u32 = 128;

/// Suffix marking a file as encrypted
pub const DEFAULT_MARKER: &str = ".enc";

/// Name of the key record inside the key directory
pub const KEY_FILE_NAME: &str = "keys.txt";

/// Configuration for key generation and file encryption/decryption
#[derive(Clone, Debug)]
pub struct Config {
    pub key_dir: PathBuf,
    pub marker: String,
    pub prime_rounds: u32,
    pub default_key_size: u32,
}

impl Config {
    pub fn new(key_dir: impl Into<PathBuf>) -> Self {
        Self {
            key_dir: key_dir.into(),
            marker: DEFAULT_MARKER.to_string(),
            prime_rounds: DEFAULT_PRIME_ROUNDS,
            default_key_size: DEFAULT_KEY_SIZE,
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn with_prime_rounds(mut self, rounds: u32) -> Self {
        self.prime_rounds = rounds;
        self
    }

    pub fn with_default_key_size(mut self, bits: u32) -> Self {
        self.default_key_size = bits;
        self
    }

    /// Full path of the key record
    pub fn key_file(&self) -> PathBuf {
        self.key_dir.join(KEY_FILE_NAME)
    }
}
