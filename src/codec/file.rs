// File Codec
// Encrypts or decrypts one file in place and toggles its ciphertext marker

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::error::{CryptError, Result};
use crate::keystore::KeyStore;
use crate::rsa::{decrypt_text, encrypt_text};
use crate::util::FileSystem;

/// Whether a file holds plaintext or ciphertext, judged only by its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Plain,
    Encrypted,
}

impl FileState {
    pub fn of(path: &Path, marker: &str) -> Self {
        match path.file_name().and_then(|name| name.to_str()) {
            Some(name) if name.len() > marker.len() && name.ends_with(marker) => FileState::Encrypted,
            _ => FileState::Plain,
        }
    }
}

/// Direction of a transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Encrypt,
    Decrypt,
}

/// Result of applying a mode to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Content written to `to` and the source removed; `bytes` is the size read
    Transformed { to: PathBuf, bytes: u64 },
    AlreadyEncrypted,
    NotEncrypted,
    /// The renamed file would replace an existing one; nothing was touched
    TargetExists(PathBuf),
    /// The path is the key record itself
    KeyRecord,
}

/// Applies the cipher to whole files using keys from a key store
pub struct FileCodec<'a, S: KeyStore, F: FileSystem> {
    store: &'a S,
    fs: &'a F,
    marker: String,
    key_file: PathBuf,
}

impl<'a, S: KeyStore, F: FileSystem> FileCodec<'a, S, F> {
    pub fn new(config: &Config, store: &'a S, fs: &'a F) -> Self {
        Self {
            store,
            fs,
            marker: config.marker.clone(),
            key_file: config.key_file(),
        }
    }

    pub fn file_system(&self) -> &F {
        self.fs
    }

    pub fn state(&self, path: &Path) -> FileState {
        FileState::of(path, &self.marker)
    }

    /// `path` with the marker appended to its file name
    pub fn encrypted_path(&self, path: &Path) -> Result<PathBuf> {
        let name = path.file_name().ok_or_else(|| no_file_name(path))?;
        let mut name = OsString::from(name);
        name.push(&self.marker);
        Ok(path.with_file_name(name))
    }

    /// `path` with the marker stripped from its file name
    pub fn plain_path(&self, path: &Path) -> Result<PathBuf> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_suffix(self.marker.as_str()))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| CryptError::NotEncrypted(path.to_path_buf()))?;
        Ok(path.with_file_name(name))
    }

    /// Apply `mode` to one file, reporting a wrong starting state, a name
    /// collision or the key record as an outcome instead of an error
    pub fn apply(&self, path: &Path, mode: Mode) -> Result<FileOutcome> {
        let target = match (mode, self.state(path)) {
            (Mode::Encrypt, FileState::Encrypted) => return Ok(FileOutcome::AlreadyEncrypted),
            (Mode::Decrypt, FileState::Plain) => return Ok(FileOutcome::NotEncrypted),
            (Mode::Encrypt, FileState::Plain) => self.encrypted_path(path)?,
            (Mode::Decrypt, FileState::Encrypted) => self.plain_path(path)?,
        };

        if self.fs.same_file(path, &self.key_file) {
            return Ok(FileOutcome::KeyRecord);
        }
        if self.fs.exists(&target) {
            return Ok(FileOutcome::TargetExists(target));
        }

        match mode {
            Mode::Encrypt => {
                let key = self.store.load_public()?;
                self.rewrite(path, &target, |text| encrypt_text(text, &key))
            }
            Mode::Decrypt => {
                let key = self.store.load_private()?;
                self.rewrite(path, &target, |text| decrypt_text(text, &key))
            }
        }
    }

    /// Encrypt a plaintext file, returning its new path
    pub fn encrypt_file(&self, path: &Path) -> Result<PathBuf> {
        let outcome = self.apply(path, Mode::Encrypt)?;
        self.outcome_path(path, outcome)
    }

    /// Decrypt a ciphertext file, returning its new path
    pub fn decrypt_file(&self, path: &Path) -> Result<PathBuf> {
        let outcome = self.apply(path, Mode::Decrypt)?;
        self.outcome_path(path, outcome)
    }

    fn outcome_path(&self, path: &Path, outcome: FileOutcome) -> Result<PathBuf> {
        match outcome {
            FileOutcome::Transformed { to, .. } => Ok(to),
            FileOutcome::AlreadyEncrypted => Err(CryptError::AlreadyEncrypted(path.to_path_buf())),
            FileOutcome::NotEncrypted => Err(CryptError::NotEncrypted(path.to_path_buf())),
            FileOutcome::TargetExists(target) => Err(CryptError::TargetExists(target)),
            FileOutcome::KeyRecord => Err(CryptError::KeyRecordProtected(path.to_path_buf())),
        }
    }

    /// Write the transformed content to `target`, then remove `path`.
    /// If the removal fails both files remain, and a later run reports
    /// `TargetExists` instead of transforming the content twice.
    fn rewrite<T>(&self, path: &Path, target: &Path, transform: T) -> Result<FileOutcome>
    where
        T: FnOnce(&str) -> Result<String>,
    {
        let data = self.fs.read(path).map_err(|e| CryptError::io(path, e))?;
        let text =
            std::str::from_utf8(&data).map_err(|_| CryptError::InvalidEncoding(path.to_path_buf()))?;

        let output = transform(text)?;

        match self.fs.create_new(target, output.as_bytes()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Ok(FileOutcome::TargetExists(target.to_path_buf()));
            }
            Err(e) => return Err(CryptError::io(target, e)),
        }
        self.fs.remove_file(path).map_err(|e| CryptError::io(path, e))?;

        debug!(from = %path.display(), to = %target.display(), "file transformed");
        Ok(FileOutcome::Transformed {
            to: target.to_path_buf(),
            bytes: data.len() as u64,
        })
    }
}

fn no_file_name(path: &Path) -> CryptError {
    CryptError::io(
        path,
        io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
    )
}
