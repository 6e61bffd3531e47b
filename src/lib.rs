//! In-place textbook RSA encryption of files and directory trees.
//!
//! Keys are generated with Miller-Rabin prime search and stored as a single
//! plain-text record. Files are encrypted one character at a time, unpadded,
//! and marked encrypted by a filename suffix. The scheme is deterministic and
//! offers no real confidentiality.

pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
pub mod keystore;
pub mod rsa;
pub mod util;

pub use codec::{DirectoryWalker, FileCodec, FileOutcome, FileState, Mode, WalkReport};
pub use commands::Commands;
pub use config::Config;
pub use error::{CryptError, Result};
pub use keystore::{FileKeyStore, KeyStore};
