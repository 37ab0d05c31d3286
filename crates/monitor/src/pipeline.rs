use std::sync::Arc;
use std::time::Instant;

use balance_watch_domain::analyze_balances;
use balance_watch_domain::model::{TransactionReport, WatchSet};
use balance_watch_domain::storage::{RawEventSink, RawSnapshot};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use tracing::{debug, info, warn};
use yellowstone_grpc_proto::prelude::SubscribeUpdate;

use crate::rpc::{render_update, StreamMessage};

const LABEL_FORMAT: &str = "%Y-%m-%d_%H-%M-%S%.6f";

/// Receives the analysis result of every transaction that carried balances.
pub trait BalanceObserver: Send + Sync {
    fn observe(&self, report: &TransactionReport);
}

/// Default observer: one log line per analyzed transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl BalanceObserver for TracingObserver {
    fn observe(&self, report: &TransactionReport) {
        if report.events.is_empty() {
            debug!(
                signature = %report.signature,
                slot = report.slot,
                elapsed_us = report.analysis_time.as_micros() as u64,
                "no watched balance changes"
            );
            return;
        }

        for event in &report.events {
            counter!("monitor_balance_events_total", "action" => event.action.as_str())
                .increment(1);
        }
        info!(
            signature = %report.signature,
            slot = report.slot,
            elapsed_us = report.analysis_time.as_micros() as u64,
            events = ?report.events,
            "watched balance changes"
        );
    }
}

/// Handles a single stream message: captures the raw update, diffs the
/// token balances and reports the result.
#[derive(Clone)]
pub struct UpdateDispatcher {
    sink: Arc<dyn RawEventSink>,
    observer: Arc<dyn BalanceObserver>,
}

impl UpdateDispatcher {
    pub fn new(sink: Arc<dyn RawEventSink>, observer: Arc<dyn BalanceObserver>) -> Self {
        Self { sink, observer }
    }

    /// Non-transaction messages and transactions without balance metadata
    /// are ignored. Must run inside a tokio runtime since the raw snapshot
    /// is written on a detached task.
    pub fn handle_update(&self, update: SubscribeUpdate, watched: &WatchSet) {
        self.handle_received(update, watched, Utc::now());
    }

    /// Same as [`Self::handle_update`] with the time the message came off
    /// the stream, which names the raw snapshot.
    pub fn handle_received(
        &self,
        update: SubscribeUpdate,
        watched: &WatchSet,
        received_at: DateTime<Utc>,
    ) {
        let update = Arc::new(update);

        let StreamMessage::Transaction(tx) = StreamMessage::classify(&update) else {
            counter!("monitor_updates_total", "kind" => "other").increment(1);
            return;
        };
        counter!("monitor_updates_total", "kind" => "transaction").increment(1);

        let signature = tx.signature();
        debug!(%signature, slot = tx.slot, "transaction received");

        let Some((pre, post)) = tx.balances() else {
            debug!(%signature, "transaction carries no token balances");
            return;
        };

        self.persist_raw(snapshot_label(received_at, &signature), Arc::clone(&update));

        let started = Instant::now();
        let events = analyze_balances(&pre, &post, watched);
        let analysis_time = started.elapsed();
        histogram!("monitor_analysis_seconds").record(analysis_time.as_secs_f64());

        self.observer.observe(&TransactionReport {
            signature,
            slot: tx.slot,
            analysis_time,
            events,
        });
    }

    fn persist_raw(&self, label: String, update: Arc<SubscribeUpdate>) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            let snapshot = RawSnapshot {
                label,
                body: render_update(&update),
            };
            match sink.persist(snapshot).await {
                Ok(()) => {
                    counter!("monitor_snapshots_total", "result" => "ok").increment(1);
                }
                Err(err) => {
                    counter!("monitor_snapshots_total", "result" => "error").increment(1);
                    warn!(%err, "failed to persist raw snapshot");
                }
            }
        });
    }
}

/// Receive time plus signature, so concurrent transactions never share a file.
fn snapshot_label(received_at: DateTime<Utc>, signature: &str) -> String {
    format!("{}_{signature}", received_at.format(LABEL_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::fixtures::{ping_update, token_balance, transaction_update};
    use async_trait::async_trait;
    use balance_watch_domain::model::{BalanceChangeEvent, TradeAction};
    use balance_watch_domain::storage::{StorageError, StorageResult};
    use chrono::TimeZone;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingObserver {
        reports: Mutex<Vec<TransactionReport>>,
    }

    impl BalanceObserver for RecordingObserver {
        fn observe(&self, report: &TransactionReport) {
            self.reports.lock().unwrap().push(report.clone());
        }
    }

    struct ChannelSink {
        tx: mpsc::UnboundedSender<RawSnapshot>,
    }

    #[async_trait]
    impl RawEventSink for ChannelSink {
        async fn persist(&self, snapshot: RawSnapshot) -> StorageResult<()> {
            let _ = self.tx.send(snapshot);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl RawEventSink for FailingSink {
        async fn persist(&self, _snapshot: RawSnapshot) -> StorageResult<()> {
            Err(StorageError::Io("disk full".to_string()))
        }
    }

    fn dispatcher_with(
        sink: Arc<dyn RawEventSink>,
    ) -> (UpdateDispatcher, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        (UpdateDispatcher::new(sink, observer.clone()), observer)
    }

    #[tokio::test]
    async fn transaction_with_balances_is_analyzed_and_captured() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (dispatcher, observer) = dispatcher_with(Arc::new(ChannelSink { tx }));
        let watched = WatchSet::new(["W"]);

        dispatcher.handle_update(
            transaction_update(
                &[7, 7, 7],
                vec![token_balance("W", "M1", 10.0), token_balance("X", "M9", 1.0)],
                vec![token_balance("W", "M1", 25.0), token_balance("X", "M9", 0.0)],
            ),
            &watched,
        );

        let reports = observer.reports.lock().unwrap().clone();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].slot, 77);
        assert_eq!(reports[0].signature, bs58::encode([7u8, 7, 7]).into_string());
        assert_eq!(
            reports[0].events,
            vec![BalanceChangeEvent {
                mint: "M1".to_string(),
                action: TradeAction::Buy,
                amount: 15.0,
            }]
        );

        let snapshot = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("snapshot arrives")
            .expect("sink alive");
        assert_eq!(snapshot.body["slot"], 77);
        assert!(!snapshot.label.is_empty());
    }

    #[tokio::test]
    async fn snapshots_received_together_get_distinct_labels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (dispatcher, _observer) = dispatcher_with(Arc::new(ChannelSink { tx }));
        let watched = WatchSet::new(["W"]);
        let received_at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

        for signature in [[1u8], [2u8]] {
            dispatcher.handle_received(
                transaction_update(
                    &signature,
                    vec![token_balance("W", "M1", 1.0)],
                    vec![token_balance("W", "M1", 2.0)],
                ),
                &watched,
                received_at,
            );
        }

        let mut labels = Vec::new();
        for _ in 0..2 {
            let snapshot = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("snapshot arrives")
                .expect("sink alive");
            labels.push(snapshot.label);
        }
        labels.sort();

        let stamp = "2024-05-06_07-08-09.000000";
        assert_eq!(
            labels,
            vec![
                format!("{stamp}_{}", bs58::encode([1u8]).into_string()),
                format!("{stamp}_{}", bs58::encode([2u8]).into_string()),
            ]
        );
    }

    #[tokio::test]
    async fn non_transaction_updates_are_ignored() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (dispatcher, observer) = dispatcher_with(Arc::new(ChannelSink { tx }));

        dispatcher.handle_update(ping_update(), &WatchSet::new(["W"]));

        assert!(observer.reports.lock().unwrap().is_empty());
        drop(dispatcher);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn transaction_without_balances_is_ignored() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (dispatcher, observer) = dispatcher_with(Arc::new(ChannelSink { tx }));

        dispatcher.handle_update(
            transaction_update(&[1], vec![], vec![token_balance("W", "M1", 3.0)]),
            &WatchSet::new(["W"]),
        );

        assert!(observer.reports.lock().unwrap().is_empty());
        drop(dispatcher);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn sink_failure_does_not_affect_analysis() {
        let (dispatcher, observer) = dispatcher_with(Arc::new(FailingSink));

        dispatcher.handle_update(
            transaction_update(
                &[2],
                vec![token_balance("W", "M1", 10.0)],
                vec![token_balance("W", "M1", 4.0)],
            ),
            &WatchSet::new(["W"]),
        );
        tokio::task::yield_now().await;

        let reports = observer.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].events[0].action, TradeAction::Sell);
        assert_eq!(reports[0].events[0].amount, 6.0);
    }
}
