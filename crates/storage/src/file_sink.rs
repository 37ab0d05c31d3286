use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use balance_watch_domain::storage::{RawEventSink, RawSnapshot, StorageError, StorageResult};
use tracing::debug;

/// Writes each snapshot to `<dir>/response_<label>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: Arc<PathBuf>,
}

impl JsonFileSink {
    /// Creates the target directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(StorageError::io)?;
        Ok(Self { dir: Arc::new(dir) })
    }

    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("response_{label}.json"))
    }
}

#[async_trait]
impl RawEventSink for JsonFileSink {
    async fn persist(&self, snapshot: RawSnapshot) -> StorageResult<()> {
        let bytes = serde_json::to_vec(&snapshot.body).map_err(StorageError::encode)?;
        let path = self.path_for(&snapshot.label);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(StorageError::io)?;
        debug!(path = %path.display(), "raw snapshot written");
        Ok(())
    }
}
