use std::sync::Arc;

use balance_watch_domain::storage::{RawEventSink, StorageResult};

use crate::{DiscardSink, JsonFileSink};

/// Picks the sink implementation from the optional snapshot directory.
#[derive(Default)]
pub struct SinkBuilder {
    snapshot_dir: Option<String>,
}

impl SinkBuilder {
    pub fn new() -> Self {
        Self { snapshot_dir: None }
    }

    pub fn snapshot_dir(mut self, dir: Option<impl Into<String>>) -> Self {
        self.snapshot_dir = dir.map(Into::into);
        self
    }

    pub async fn build(self) -> StorageResult<Arc<dyn RawEventSink>> {
        match self.snapshot_dir {
            Some(dir) => Ok(Arc::new(JsonFileSink::open(dir).await?)),
            None => Ok(Arc::new(DiscardSink)),
        }
    }
}
