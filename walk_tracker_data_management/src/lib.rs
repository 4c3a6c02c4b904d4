use std::path::{Path, PathBuf};

use const_format::concatcp;

pub mod storage;
mod data_manager;

pub use data_manager::*;
pub use storage::{file_store::FileStore, memory_store::MemoryStore, KeyValueStore};

pub const DATA_DIR: &str = "data/";
pub const STORE_DIR: &str = concatcp!(DATA_DIR, "store");

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataManagerError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Relative paths are taken from the project root, or the working directory when there is none.
pub fn resolve_data_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        return path.to_path_buf();
    }

    match project_root::get_project_root() {
        Ok(root) => root.join(path),
        Err(_) => path.to_path_buf(),
    }
}
