use std::fmt::Display;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tonic::Status;
use yellowstone_grpc_proto::prelude::{SubscribeRequest, SubscribeUpdate};

use crate::worker::MonitorError;

mod request;
mod types;

pub use request::{build_subscribe_request, describe_request, TRANSACTIONS_FILTER};
pub use types::{render_update, StreamMessage, TransactionUpdate};

#[cfg(test)]
pub(crate) use types::fixtures;

/// Bidirectional subscription stream: one request goes out, updates come
/// back until the server ends the stream or the transport fails.
#[async_trait]
pub trait UpdateChannel: Send {
    async fn send_request(&mut self, request: SubscribeRequest) -> Result<(), MonitorError>;

    /// `None` signals end-of-stream.
    async fn next_update(&mut self) -> Option<Result<SubscribeUpdate, MonitorError>>;
}

/// Adapts the request sink and update stream handed out by the Geyser
/// client.
pub struct GeyserChannel<Tx, Rx> {
    requests: Pin<Box<Tx>>,
    updates: Pin<Box<Rx>>,
}

impl<Tx, Rx> GeyserChannel<Tx, Rx> {
    pub fn new(requests: Tx, updates: Rx) -> Self {
        Self {
            requests: Box::pin(requests),
            updates: Box::pin(updates),
        }
    }
}

#[async_trait]
impl<Tx, Rx> UpdateChannel for GeyserChannel<Tx, Rx>
where
    Tx: Sink<SubscribeRequest> + Send,
    Tx::Error: Display,
    Rx: Stream<Item = Result<SubscribeUpdate, Status>> + Send,
{
    async fn send_request(&mut self, request: SubscribeRequest) -> Result<(), MonitorError> {
        self.requests
            .send(request)
            .await
            .map_err(|err| MonitorError::Send(err.to_string()))
    }

    async fn next_update(&mut self) -> Option<Result<SubscribeUpdate, MonitorError>> {
        self.updates
            .next()
            .await
            .map(|item| item.map_err(|status| MonitorError::Receive(status.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::ping_update;
    use super::*;
    use futures::channel::mpsc;

    #[tokio::test]
    async fn geyser_channel_forwards_requests_and_updates() {
        let (request_tx, mut request_rx) = mpsc::unbounded::<SubscribeRequest>();
        let updates = futures::stream::iter(vec![
            Ok(ping_update()),
            Err(Status::unavailable("node restarting")),
        ]);
        let mut channel = GeyserChannel::new(request_tx, updates);

        channel
            .send_request(SubscribeRequest::default())
            .await
            .expect("send succeeds");
        assert!(request_rx.next().await.is_some());

        assert!(matches!(channel.next_update().await, Some(Ok(_))));
        assert!(matches!(
            channel.next_update().await,
            Some(Err(MonitorError::Receive(_)))
        ));
        assert!(channel.next_update().await.is_none());
    }

    #[tokio::test]
    async fn closed_request_sink_is_a_send_error() {
        let (request_tx, request_rx) = mpsc::unbounded::<SubscribeRequest>();
        drop(request_rx);
        let mut channel = GeyserChannel::new(
            request_tx,
            futures::stream::empty::<Result<SubscribeUpdate, Status>>(),
        );

        let err = channel
            .send_request(SubscribeRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::Send(_)));
    }
}
