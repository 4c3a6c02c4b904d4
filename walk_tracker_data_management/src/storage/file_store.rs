use std::{io::ErrorKind, path::{Path, PathBuf}};

use crate::DataManagerError;

use super::{constants::TEMP_SUFFIX, KeyValueStore};

/// One file per key inside a data directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, DataManagerError> {
        let dir = dir.as_ref().to_path_buf();

        // Create dir if it doesn't exist
        if !dir.exists() {
            tokio::fs::create_dir_all(&dir).await
                .map_err(|_| DataManagerError::Storage(format!("Failed to create store directory: {:?}", dir)))?;
        }

        tracing::debug!("Opened file store at {:?}", dir);

        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, DataManagerError> {
        let legal = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !legal {
            return Err(DataManagerError::Storage(format!("Illegal key: {:?}", key)));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DataManagerError> {
        let path = self.key_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(DataManagerError::Storage(format!("Failed to read {:?}: {err}", path))),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), DataManagerError> {
        let path = self.key_path(key)?;
        let temp_path = self.dir.join(format!("{key}{TEMP_SUFFIX}"));

        tokio::fs::write(&temp_path, value.as_bytes()).await
            .map_err(|err| DataManagerError::Storage(format!("Failed to write {:?}: {err}", temp_path)))?;
        tokio::fs::rename(&temp_path, &path).await
            .map_err(|err| DataManagerError::Storage(format!("Failed to replace {:?}: {err}", path)))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DataManagerError> {
        let path = self.key_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DataManagerError::Storage(format!("Failed to remove {:?}: {err}", path))),
        }
    }
}
