//! File-based storage implementation for native platforms.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Longest escaped name used as-is, leaving room for the extension.
const MAX_NAME_LEN: usize = 200;
const HASHED_PREFIX_LEN: usize = 120;

/// 64-bit FNV-1a; stable across builds, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// On-disk record. The key travels with the value because long keys
/// cannot be recovered from their file names.
#[derive(Serialize, Deserialize)]
struct Entry {
    key: String,
    value: String,
}

fn read_entry(path: &Path) -> StorageResult<Option<Entry>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::Io(format!("Failed to read {}: {}", path.display(), e))),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| StorageError::Serialization(format!("{}: {}", path.display(), e)))
}

/// Stores each key as a JSON file in a directory.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::Io(format!("Failed to create storage directory: {}", e))
        })?;
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/marginalia/ink/`
    /// On Windows: `%LOCALAPPDATA%\marginalia\ink\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("marginalia").join("ink"))
    }

    /// File path for a key. Keys are page paths, so anything outside
    /// `[A-Za-z0-9_-]` is hex-escaped. Escaped names that would pass the
    /// usual 255-byte file name limit keep a prefix plus a hash of the key.
    fn key_path(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(byte as char);
            } else {
                name.push_str(&format!("~{:02x}", byte));
            }
        }
        if name.len() > MAX_NAME_LEN {
            // Escaped names are ASCII, so any byte index is a char boundary.
            name.truncate(HASHED_PREFIX_LEN);
            name.push_str(&format!("~~{:016x}", fnv1a(key.as_bytes())));
        }
        self.base_path.join(format!("{}.json", name))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> BoxFuture<'_, StorageResult<Option<String>>> {
        let path = self.key_path(key);
        let key = key.to_string();
        Box::pin(async move {
            // A hashed name can in principle be shared; only the owner's value counts.
            Ok(read_entry(&path)?
                .filter(|entry| entry.key == key)
                .map(|entry| entry.value))
        })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.key_path(key);
        let entry = Entry {
            key: key.to_string(),
            value,
        };
        Box::pin(async move {
            let text = serde_json::to_string(&entry)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            fs::write(&path, text).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
            })
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.key_path(key);
        Box::pin(async move {
            match fs::remove_file(&path) {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(StorageError::Io(format!(
                    "Failed to delete {}: {}",
                    path.display(),
                    e
                ))),
                _ => Ok(()),
            }
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();
        Box::pin(async move {
            let entries = fs::read_dir(&base).map_err(|e| {
                StorageError::Io(format!("Failed to read directory: {}", e))
            })?;

            let mut keys = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == "json") {
                    match read_entry(&path) {
                        Ok(Some(entry)) => keys.push(entry.key),
                        Ok(None) => {}
                        Err(e) => log::warn!("Skipping unreadable entry: {}", e),
                    }
                }
            }
            Ok(keys)
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.key_path(key);
        Box::pin(async move { Ok(path.exists()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::block_on;
    use tempfile::tempdir;

    #[test]
    fn test_file_storage_set_get() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        block_on(storage.set("page", r#"{"default":[]}"#.to_string())).unwrap();
        let value = block_on(storage.get("page")).unwrap();
        assert_eq!(value.as_deref(), Some(r#"{"default":[]}"#));
    }

    #[test]
    fn test_file_storage_missing() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(block_on(storage.get("nonexistent")).unwrap(), None);
    }

    #[test]
    fn test_file_storage_remove() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        block_on(storage.set("page", "[]".to_string())).unwrap();
        assert!(block_on(storage.exists("page")).unwrap());
        block_on(storage.remove("page")).unwrap();
        assert!(!block_on(storage.exists("page")).unwrap());
        block_on(storage.remove("page")).unwrap();
    }

    #[test]
    fn test_file_storage_escapes_page_paths() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let a = "marginalia:/lessons/a b.html";
        let b = "marginalia:/lessons/a_b.html";
        block_on(storage.set(a, "1".to_string())).unwrap();
        block_on(storage.set(b, "2".to_string())).unwrap();

        assert_eq!(block_on(storage.get(a)).unwrap().as_deref(), Some("1"));
        assert_eq!(block_on(storage.get(b)).unwrap().as_deref(), Some("2"));

        let mut keys = block_on(storage.list()).unwrap();
        keys.sort();
        assert_eq!(keys, vec![a.to_string(), b.to_string()]);
    }

    #[test]
    fn test_file_storage_non_ascii_key() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let key = "marginalia:/英検/準１級.html";
        block_on(storage.set(key, "[]".to_string())).unwrap();
        assert_eq!(block_on(storage.list()).unwrap(), vec![key.to_string()]);
    }

    #[test]
    fn test_file_storage_long_key() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        // Each of these characters escapes to nine bytes of file name.
        let long = format!("marginalia:/英検/{}.html", "準１級の語彙".repeat(10));
        let other = format!("marginalia:/英検/{}.html", "準１級の語彙".repeat(11));
        block_on(storage.set(&long, "1".to_string())).unwrap();
        block_on(storage.set(&other, "2".to_string())).unwrap();

        assert_eq!(block_on(storage.get(&long)).unwrap().as_deref(), Some("1"));
        assert_eq!(block_on(storage.get(&other)).unwrap().as_deref(), Some("2"));
        assert!(block_on(storage.exists(&long)).unwrap());

        for entry in fs::read_dir(dir.path()).unwrap() {
            assert!(entry.unwrap().file_name().len() <= 255);
        }
        let mut keys = block_on(storage.list()).unwrap();
        keys.sort();
        let mut expected = vec![long.clone(), other];
        expected.sort();
        assert_eq!(keys, expected);

        block_on(storage.remove(&long)).unwrap();
        assert_eq!(block_on(storage.get(&long)).unwrap(), None);
    }

    #[test]
    fn test_file_storage_ignores_foreign_entry() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        block_on(storage.set("page", "1".to_string())).unwrap();
        let path = storage.key_path("page");
        let foreign = serde_json::json!({ "key": "elsewhere", "value": "2" });
        fs::write(&path, foreign.to_string()).unwrap();
        assert_eq!(block_on(storage.get("page")).unwrap(), None);
    }
}
