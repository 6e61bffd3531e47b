// Command Dispatch
// Entry points behind the keygen / encrypt / decrypt commands

use std::path::Path;

use tracing::info;

use crate::codec::{DirectoryWalker, FileCodec, Mode, WalkReport};
use crate::config::Config;
use crate::error::Result;
use crate::keystore::{FileKeyStore, KeyStore};
use crate::rsa::{decrypt_text, encrypt_text, resolve_key_size, KeyGenerator, RsaKeyPair};
use crate::util::{FileSystem, OsFileSystem};

/// Operations exposed to the command line, wired to the on-disk key store
pub struct Commands<F: FileSystem = OsFileSystem> {
    config: Config,
    store: FileKeyStore,
    fs: F,
}

impl Commands<OsFileSystem> {
    pub fn new(config: Config) -> Self {
        Self::with_file_system(config, OsFileSystem)
    }
}

impl<F: FileSystem> Commands<F> {
    pub fn with_file_system(config: Config, fs: F) -> Self {
        let store = FileKeyStore::new(&config);
        Self { config, store, fs }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generate and store a key pair. `size` is the total modulus size in
    /// bits, split evenly between the two primes.
    pub fn keygen(&self, size: Option<u32>) -> Result<RsaKeyPair> {
        let bits = resolve_key_size(size, self.config.default_key_size)?;
        info!(bits, "generating RSA keys");
        KeyGenerator::new(&self.config, &self.store).generate(bits / 2)
    }

    pub fn encrypt(&self, path: &Path) -> Result<WalkReport> {
        self.run(path, Mode::Encrypt)
    }

    pub fn decrypt(&self, path: &Path) -> Result<WalkReport> {
        self.run(path, Mode::Decrypt)
    }

    pub fn encrypt_text(&self, plaintext: &str) -> Result<String> {
        encrypt_text(plaintext, &self.store.load_public()?)
    }

    pub fn decrypt_text(&self, ciphertext: &str) -> Result<String> {
        decrypt_text(ciphertext, &self.store.load_private()?)
    }

    pub fn show_key(&self) -> Result<RsaKeyPair> {
        self.store.load_keypair()
    }

    /// A directory is walked with skips; a single file must be in the right state
    fn run(&self, path: &Path, mode: Mode) -> Result<WalkReport> {
        let codec = FileCodec::new(&self.config, &self.store, &self.fs);

        if self.fs.is_dir(path) {
            return DirectoryWalker::new(&codec).process_path(path, mode);
        }

        let to = match mode {
            Mode::Encrypt => codec.encrypt_file(path)?,
            Mode::Decrypt => codec.decrypt_file(path)?,
        };
        info!(from = %path.display(), to = %to.display(), "file processed");
        Ok(WalkReport {
            transformed: vec![to],
            ..WalkReport::default()
        })
    }
}
