// Key Store
// Persists the single key record as plain text in the key directory

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use tracing::debug;

use crate::config::Config;
use crate::error::{CryptError, Result};
use crate::rsa::bigint::RsaBigInt;
use crate::rsa::keygen::{RsaKeyPair, RsaPrivateKey, RsaPublicKey};

const PUBLIC_SPECIFIER: &str = "public key:";
const PRIVATE_SPECIFIER: &str = "private key:";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Read/write access to the stored key pair
pub trait KeyStore {
    /// Replace the stored record with `keypair`
    fn save(&self, keypair: &RsaKeyPair) -> Result<()>;

    fn load_keypair(&self) -> Result<RsaKeyPair>;

    fn load_public(&self) -> Result<RsaPublicKey>;

    fn load_private(&self) -> Result<RsaPrivateKey>;
}

/// Key store backed by `<key_dir>/keys.txt`
#[derive(Clone, Debug)]
pub struct FileKeyStore {
    dir: PathBuf,
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(config: &Config) -> Self {
        Self {
            dir: config.key_dir.clone(),
            path: config.key_file(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_record(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|source| CryptError::KeyStoreUnavailable {
            path: self.path.clone(),
            source,
        })
    }

    fn malformed(&self, reason: String) -> CryptError {
        CryptError::MalformedKeyRecord {
            path: self.path.clone(),
            reason,
        }
    }
}

impl KeyStore for FileKeyStore {
    fn save(&self, keypair: &RsaKeyPair) -> Result<()> {
        let write_failed = |source| CryptError::KeyStoreWriteFailed {
            path: self.path.clone(),
            source,
        };

        if !self.dir.is_dir() {
            debug!(dir = %self.dir.display(), "creating key directory");
            fs::create_dir_all(&self.dir).map_err(write_failed)?;
        }
        fs::write(&self.path, render_record(keypair)).map_err(write_failed)
    }

    fn load_keypair(&self) -> Result<RsaKeyPair> {
        let text = self.read_record()?;
        let created_at = parse_timestamp(&text).map_err(|reason| self.malformed(reason))?;
        let (e, n) = find_pair(&text, PUBLIC_SPECIFIER).map_err(|reason| self.malformed(reason))?;
        let (d, private_n) =
            find_pair(&text, PRIVATE_SPECIFIER).map_err(|reason| self.malformed(reason))?;

        if n != private_n {
            return Err(self.malformed("public and private moduli differ".to_string()));
        }

        Ok(RsaKeyPair {
            public_key: RsaPublicKey { n: n.clone(), e },
            private_key: RsaPrivateKey { n, d },
            created_at,
            factors: None,
        })
    }

    fn load_public(&self) -> Result<RsaPublicKey> {
        let text = self.read_record()?;
        let (e, n) = find_pair(&text, PUBLIC_SPECIFIER).map_err(|reason| self.malformed(reason))?;
        Ok(RsaPublicKey { n, e })
    }

    fn load_private(&self) -> Result<RsaPrivateKey> {
        let text = self.read_record()?;
        let (d, n) = find_pair(&text, PRIVATE_SPECIFIER).map_err(|reason| self.malformed(reason))?;
        Ok(RsaPrivateKey { n, d })
    }
}

/// Text form of a key record
pub fn render_record(keypair: &RsaKeyPair) -> String {
    format!(
        "[{}]\n{}\n{}, {}\n{}\n{}, {}\n",
        keypair.created_at.format(TIMESTAMP_FORMAT),
        PUBLIC_SPECIFIER,
        keypair.public_key.e,
        keypair.public_key.n,
        PRIVATE_SPECIFIER,
        keypair.private_key.d,
        keypair.private_key.n,
    )
}

/// Locate `specifier` and parse the `<int>, <int>` line after it
fn find_pair(text: &str, specifier: &str) -> std::result::Result<(RsaBigInt, RsaBigInt), String> {
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        if !line.contains(specifier) {
            continue;
        }

        let values = lines
            .next()
            .ok_or_else(|| format!("nothing follows {:?}", specifier))?;
        let (exponent, modulus) = values
            .split_once(',')
            .ok_or_else(|| format!("expected \"<int>, <int>\" after {:?}", specifier))?;

        let parse = |s: &str| {
            s.trim()
                .parse::<RsaBigInt>()
                .map_err(|_| format!("invalid integer {:?} after {:?}", s.trim(), specifier))
        };
        return Ok((parse(exponent)?, parse(modulus)?));
    }

    Err(format!("missing {:?} section", specifier))
}

fn parse_timestamp(text: &str) -> std::result::Result<DateTime<Local>, String> {
    let raw = text
        .lines()
        .next()
        .and_then(|line| line.trim().strip_prefix('['))
        .and_then(|line| line.strip_suffix(']'))
        .ok_or_else(|| "missing [timestamp] header".to_string())?;

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| format!("invalid timestamp {:?}: {}", raw, e))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("timestamp {:?} does not exist in local time", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::bigint::from_u64;
    use crate::rsa::keygen::derive_keypair;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> FileKeyStore {
        FileKeyStore::new(&Config::new(dir))
    }

    #[test]
    fn test_render_record_layout() {
        let keypair = derive_keypair(from_u64(61), from_u64(53)).unwrap();
        let record = render_record(&keypair);
        let lines: Vec<&str> = record.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with('[') && lines[0].ends_with(']'));
        assert_eq!(lines[1], "public key:");
        assert_eq!(lines[2], "65537, 3233");
        assert_eq!(lines[3], "private key:");
        assert_eq!(lines[4], "2753, 3233");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir.path().join("nested").join("keys"));
        let keypair = derive_keypair(from_u64(61), from_u64(53)).unwrap();

        store.save(&keypair).unwrap();
        assert!(store.path().is_file());

        assert_eq!(store.load_public().unwrap(), keypair.public_key);
        assert_eq!(store.load_private().unwrap(), keypair.private_key);

        let loaded = store.load_keypair().unwrap();
        assert_eq!(loaded.public_key, keypair.public_key);
        assert_eq!(loaded.private_key, keypair.private_key);
        assert_eq!(
            loaded.created_at.timestamp_micros(),
            keypair.created_at.timestamp_micros()
        );
        assert!(loaded.factors.is_none());
    }

    #[test]
    fn test_save_overwrites_previous_record() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.save(&derive_keypair(from_u64(61), from_u64(53)).unwrap()).unwrap();
        let second = derive_keypair(from_u64(101), from_u64(113)).unwrap();
        store.save(&second).unwrap();

        assert_eq!(store.load_public().unwrap(), second.public_key);
    }

    #[test]
    fn test_load_missing_store() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir.path().join("absent"));
        let err = store.load_public().unwrap_err();
        assert!(matches!(err, CryptError::KeyStoreUnavailable { .. }));
    }

    #[test]
    fn test_save_into_uncreatable_dir() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let store = store_in(&blocker.join("keys"));
        let keypair = derive_keypair(from_u64(61), from_u64(53)).unwrap();
        let err = store.save(&keypair).unwrap_err();
        assert!(matches!(err, CryptError::KeyStoreWriteFailed { .. }));
    }

    #[test]
    fn test_reads_record_written_elsewhere() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("keys.txt"),
            "[2023-04-01 09:15:02.123456]\npublic key:\n65537, 3233\nprivate key:\n2753, 3233\n",
        )
        .unwrap();
        let store = store_in(dir.path());

        let keypair = store.load_keypair().unwrap();
        assert_eq!(keypair.public_key.e, from_u64(65537));
        assert_eq!(keypair.private_key.d, from_u64(2753));
        assert_eq!(keypair.created_at.format("%Y-%m-%d").to_string(), "2023-04-01");
    }

    #[test]
    fn test_malformed_records() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        fs::write(store.path(), "[2023-04-01 09:15:02]\npublic key:\n65537 3233\n").unwrap();
        assert!(matches!(
            store.load_public().unwrap_err(),
            CryptError::MalformedKeyRecord { .. }
        ));
        assert!(matches!(
            store.load_private().unwrap_err(),
            CryptError::MalformedKeyRecord { .. }
        ));

        fs::write(store.path(), "public key:\n65537, 3233\nprivate key:\n2753, 3233\n").unwrap();
        assert!(store.load_public().is_ok());
        assert!(matches!(
            store.load_keypair().unwrap_err(),
            CryptError::MalformedKeyRecord { .. }
        ));
    }
}
