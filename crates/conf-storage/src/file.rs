//! JSON file backend.

use crate::{ConfStore, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Store persisted as a flat JSON object of strings.
///
/// The whole map is held in memory and rewritten on every mutation, so a
/// reader never observes a half-written file.
pub struct FileConfStore {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl FileConfStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), entries = data.len(), "opened config store");
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(data)?;
        atomic_write(&self.path, &content)
    }
}

impl ConfStore for FileConfStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock();
        let previous = data.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist(&data) {
            // Keep memory in step with disk.
            match previous {
                Some(old) => data.insert(key.to_string(), old),
                None => data.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock();
        let Some(old) = data.remove(key) else {
            return Ok(false);
        };
        if let Err(err) = self.persist(&data) {
            data.insert(key.to_string(), old);
            return Err(err);
        }
        Ok(true)
    }
}

fn atomic_write(path: &Path, content: &str) -> StorageResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::Encoding(format!("no parent for {}", path.display())))?;
    fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("conf-store.json");
    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        file_name,
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));

    let write_result = (|| -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp_path, path)
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_persists_across_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf-store.json");

        let store = FileConfStore::open(&path).unwrap();
        store.set("rest_endpoint", "https://example.test").unwrap();
        store.set("other", "x").unwrap();
        assert!(store.delete("other").unwrap());
        drop(store);

        let reopened = FileConfStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("rest_endpoint").unwrap().as_deref(),
            Some("https://example.test")
        );
        assert!(!reopened.has("other").unwrap());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileConfStore::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf-store.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(matches!(
            FileConfStore::open(&path),
            Err(StorageError::Encoding(_))
        ));
    }

    #[test]
    fn test_file_store_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = FileConfStore::open(dir.path().join("conf-store.json")).unwrap();
        store.set("k", "v").unwrap();
        store.set("k", "w").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["conf-store.json".to_string()]);
    }
}
