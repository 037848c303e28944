//! File-backed storage, one checksummed file per key.

use super::StorageBackend;
use crate::error::{Result, StateError};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Magic bytes for entry files.
const ENTRY_MAGIC: &[u8; 4] = b"FST\0";

/// Current entry format version.
const ENTRY_VERSION: u8 = 1;

/// Storage that survives the process: entries live under a directory,
/// sharded by the first byte of the key's SHA-256.
pub struct FileStorage {
    path: PathBuf,
    cache: Mutex<LruCache<String, String>>,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>, cache_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let cache_size = NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            path,
            cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key_hash(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let hash = Self::key_hash(key);
        self.path.join(&hash[0..2]).join(&hash)
    }

    fn write_entry(&self, key: &str, value: &str) -> Result<()> {
        let entry_path = self.entry_path(key);
        if let Some(shard) = entry_path.parent() {
            fs::create_dir_all(shard)?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&entry_path)?;

        file.write_all(ENTRY_MAGIC)?;
        file.write_all(&[ENTRY_VERSION])?;

        let key_bytes = key.as_bytes();
        file.write_all(&(key_bytes.len() as u32).to_le_bytes())?;
        file.write_all(key_bytes)?;

        let content = value.as_bytes();
        file.write_all(&(content.len() as u64).to_le_bytes())?;
        file.write_all(content)?;
        file.write_all(&crc32fast::hash(content).to_le_bytes())?;

        file.sync_all()?;
        Ok(())
    }

    fn read_entry(&self, key: &str) -> Result<Option<String>> {
        let mut file = match File::open(self.entry_path(key)) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let mut cursor = EntryCursor { bytes: &bytes, pos: 0 };

        if cursor.take(4)? != ENTRY_MAGIC {
            return Err(StateError::Corruption("invalid magic bytes".into()));
        }
        let version = cursor.take(1)?[0];
        if version != ENTRY_VERSION {
            return Err(StateError::Corruption(format!(
                "unsupported entry version {}",
                version
            )));
        }

        let key_len = u32::from_le_bytes(cursor.array()?) as usize;
        let stored_key = cursor.take(key_len)?;
        if stored_key != key.as_bytes() {
            return Err(StateError::Corruption("entry belongs to another key".into()));
        }

        let content_len = u64::from_le_bytes(cursor.array()?) as usize;
        let content = cursor.take(content_len)?;
        let expected = u32::from_le_bytes(cursor.array()?);
        let got = crc32fast::hash(content);
        if expected != got {
            return Err(StateError::ChecksumMismatch { expected, got });
        }

        String::from_utf8(content.to_vec())
            .map(Some)
            .map_err(|e| StateError::Corruption(e.to_string()))
    }
}

struct EntryCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> EntryCursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| StateError::Corruption("entry truncated".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        if let Some(cached) = self.cache.lock().get(key).cloned() {
            return Ok(Some(cached));
        }

        match self.read_entry(key) {
            Ok(Some(value)) => {
                self.cache.lock().put(key.to_string(), value.clone());
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(StateError::Io(e)) => Err(StateError::Io(e)),
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring corrupt storage entry");
                Ok(None)
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.write_entry(key, value)?;
        self.cache.lock().put(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.cache.lock().pop(key);
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
