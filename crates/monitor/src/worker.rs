use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::gauge;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};
use yellowstone_grpc_proto::prelude::SubscribeUpdate;

use balance_watch_domain::{
    config::{ConfigError, FilterConfig},
    model::WatchSet,
    services::telemetry::TelemetryError,
    storage::StorageError,
};

use crate::{
    pipeline::UpdateDispatcher,
    rpc::{build_subscribe_request, describe_request, UpdateChannel},
};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("failed to send subscription request: {0}")]
    Send(String),
    #[error("stream closed by server")]
    StreamClosed,
    #[error("stream receive failed: {0}")]
    Receive(String),
}

/// Lifecycle of a subscription session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    RequestSent,
    Streaming,
    Closed,
}

/// Owns one subscription stream: sends the request once, then reads updates
/// in order and hands each one to a pooled handler task.
pub struct SubscriptionSession<C> {
    channel: C,
    dispatcher: Arc<UpdateDispatcher>,
    handler_slots: Arc<Semaphore>,
    max_in_flight: usize,
    handlers: TaskTracker,
    shutdown: CancellationToken,
    state: SessionState,
}

impl<C: UpdateChannel> SubscriptionSession<C> {
    /// `max_in_flight` bounds how many handlers may run at once; the receive
    /// loop waits for a free slot before reading further.
    pub fn new(
        channel: C,
        dispatcher: Arc<UpdateDispatcher>,
        max_in_flight: usize,
        shutdown: CancellationToken,
    ) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            channel,
            dispatcher,
            handler_slots: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            handlers: TaskTracker::new(),
            shutdown,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs until the stream ends, fails, or `shutdown` is cancelled. Only
    /// cancellation returns `Ok`. Handlers still running are awaited before
    /// returning.
    pub async fn run(&mut self, config: &FilterConfig) -> Result<(), MonitorError> {
        let result = self.drive(config).await;
        self.transition(SessionState::Closed);

        self.handler_slots.close();
        self.handlers.close();
        self.handlers.wait().await;
        gauge!("monitor_handlers_in_flight").set(0.0);

        match &result {
            Ok(()) => info!("session stopped by shutdown signal"),
            Err(err) => error!(%err, "session terminated"),
        }
        result
    }

    async fn drive(&mut self, config: &FilterConfig) -> Result<(), MonitorError> {
        let request = build_subscribe_request(config);
        match describe_request(&request) {
            Ok(rendered) => info!(request = %rendered, "subscription request"),
            Err(err) => warn!(%err, "failed to render subscription request"),
        }

        self.channel.send_request(request).await?;
        self.transition(SessionState::RequestSent);

        let watched = Arc::new(config.watch_set());
        info!(watched_owners = watched.len(), "watch set ready");
        self.transition(SessionState::Streaming);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(()),
                next = self.channel.next_update() => next,
            };

            let update = match next {
                Some(Ok(update)) => update,
                Some(Err(err)) => return Err(err),
                None => return Err(MonitorError::StreamClosed),
            };
            let received_at = Utc::now();

            let acquired = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(()),
                acquired = Arc::clone(&self.handler_slots).acquire_owned() => acquired,
            };
            // The pool is only closed once the session is stopping.
            let Ok(permit) = acquired else {
                return Ok(());
            };

            self.spawn_handler(update, received_at, Arc::clone(&watched), permit);
        }
    }

    fn spawn_handler(
        &self,
        update: SubscribeUpdate,
        received_at: DateTime<Utc>,
        watched: Arc<WatchSet>,
        permit: OwnedSemaphorePermit,
    ) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let slots = Arc::clone(&self.handler_slots);
        let capacity = self.max_in_flight;
        self.handlers.spawn(async move {
            dispatcher.handle_received(update, &watched, received_at);
            drop(permit);
            gauge!("monitor_handlers_in_flight").set(in_flight(&slots, capacity));
        });
        gauge!("monitor_handlers_in_flight")
            .set(in_flight(&self.handler_slots, self.max_in_flight));
    }

    fn transition(&mut self, next: SessionState) {
        info!(from = ?self.state, to = ?next, "session state change");
        self.state = next;
    }
}

fn in_flight(slots: &Semaphore, capacity: usize) -> f64 {
    capacity.saturating_sub(slots.available_permits()) as f64
}

/// Convenience entrypoint: builds a session over `channel` and runs it.
pub async fn run_session<C: UpdateChannel>(
    channel: C,
    config: &FilterConfig,
    dispatcher: Arc<UpdateDispatcher>,
    max_in_flight: usize,
    shutdown: CancellationToken,
) -> Result<(), MonitorError> {
    SubscriptionSession::new(channel, dispatcher, max_in_flight, shutdown)
        .run(config)
        .await
}
