//! Adapters for the domain `RawEventSink` contract: a JSON-file writer for
//! capturing raw transaction updates, and a sink that drops everything when
//! capture is disabled.

mod builder;
mod file_sink;

use async_trait::async_trait;
use balance_watch_domain::storage::{RawEventSink, RawSnapshot, StorageResult};

pub use builder::SinkBuilder;
pub use file_sink::JsonFileSink;

/// Sink used when no snapshot directory is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

#[async_trait]
impl RawEventSink for DiscardSink {
    async fn persist(&self, _snapshot: RawSnapshot) -> StorageResult<()> {
        Ok(())
    }
}
