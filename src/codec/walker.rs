// Directory Walker
// Applies the file codec to every file under a path

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::file::{FileCodec, FileOutcome, Mode};
use crate::error::{CryptError, Result};
use crate::keystore::KeyStore;
use crate::util::{format_file_size, FileSystem};

/// What a traversal did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    /// New paths of the files that were transformed
    pub transformed: Vec<PathBuf>,
    /// Files left alone: already in the target state, blocked by an existing
    /// file under the new name, or the key record
    pub skipped: Vec<PathBuf>,
    /// Bytes read from transformed files
    pub bytes: u64,
}

impl WalkReport {
    pub fn skip_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Walks a file tree, transforming files and skipping those in the wrong state
pub struct DirectoryWalker<'c, 'a, S: KeyStore, F: FileSystem> {
    codec: &'c FileCodec<'a, S, F>,
}

impl<'c, 'a, S: KeyStore, F: FileSystem> DirectoryWalker<'c, 'a, S, F> {
    pub fn new(codec: &'c FileCodec<'a, S, F>) -> Self {
        Self { codec }
    }

    /// Process `path` and, if it is a directory, everything beneath it.
    /// Files already in the target state, files whose new name is taken and
    /// the key record are skipped; any other failure aborts the walk, leaving
    /// files processed so far transformed.
    pub fn process_path(&self, path: &Path, mode: Mode) -> Result<WalkReport> {
        let fs = self.codec.file_system();
        let mut report = WalkReport::default();
        let mut pending = vec![path.to_path_buf()];

        while let Some(current) = pending.pop() {
            if fs.is_dir(&current) {
                let children = fs
                    .list_children(&current)
                    .map_err(|e| CryptError::io(&current, e))?;
                pending.extend(children);
                continue;
            }

            match self.codec.apply(&current, mode)? {
                FileOutcome::Transformed { to, bytes } => {
                    report.bytes += bytes;
                    report.transformed.push(to);
                }
                FileOutcome::AlreadyEncrypted => {
                    warn!("{} is already encrypted", current.display());
                    report.skipped.push(current);
                }
                FileOutcome::NotEncrypted => {
                    warn!("{} is not encrypted", current.display());
                    report.skipped.push(current);
                }
                FileOutcome::TargetExists(target) => {
                    warn!(
                        "{} skipped, {} already exists",
                        current.display(),
                        target.display()
                    );
                    report.skipped.push(current);
                }
                FileOutcome::KeyRecord => {
                    warn!("{} is the key record, leaving it alone", current.display());
                    report.skipped.push(current);
                }
            }
        }

        info!(
            path = %path.display(),
            transformed = report.transformed.len(),
            skipped = report.skip_count(),
            size = %format_file_size(report.bytes),
            "{} finished",
            match mode {
                Mode::Encrypt => "encryption",
                Mode::Decrypt => "decryption",
            }
        );
        Ok(report)
    }
}
