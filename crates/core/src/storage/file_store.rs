use std::path::Path;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use crate::errors::Result;

/// Trait defining the contract for reading and writing JSON documents.
///
/// Values cross the trait as [`serde_json::Value`] so the trait stays object
/// safe; callers deserialize into their own types.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Read a JSON document. Returns `Ok(None)` when the file does not exist
    /// or is empty.
    async fn read_json(&self, path: &Path) -> Result<Option<Value>>;

    /// Write a JSON document, replacing any previous content and creating
    /// missing parent directories.
    async fn write_json(&self, path: &Path, value: &Value) -> Result<()>;
}

/// [`FileStore`] backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFileStore;

impl JsonFileStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileStore for JsonFileStore {
    async fn read_json(&self, path: &Path) -> Result<Option<Value>> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("JSON file {} not found", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if raw.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&raw)?))
    }

    async fn write_json(&self, path: &Path, value: &Value) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(value)?;

        // Write next to the target, then rename over it.
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}
