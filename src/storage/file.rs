use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::{KeyValueStore, StoreKey};
use crate::errors::{CoasterError, Result};

/// One JSON document per key under a data directory
///
/// Writes go to a temporary sibling first and are renamed into place.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                error!("FileStore: failed to create data dir {}: {}", dir.display(), e);
                CoasterError::store_unavailable(format!(
                    "Failed to create data directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
            info!("FileStore: created data directory {}", dir.display());
        }
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, key: StoreKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_ref()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn load(&self, key: StoreKey) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => {
                debug!("FileStore: loaded {} bytes from {}", content.len(), path.display());
                Ok(Some(content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoasterError::store_unavailable(format!(
                "Failed to read '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    async fn save(&self, key: StoreKey, value: String) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        let _guard = self.write_lock.lock();
        fs::write(&tmp, value.as_bytes()).map_err(|e| {
            CoasterError::store_unavailable(format!("Failed to write '{}': {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            CoasterError::store_unavailable(format!(
                "Failed to replace '{}': {}",
                path.display(),
                e
            ))
        })?;
        debug!("FileStore: saved {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
