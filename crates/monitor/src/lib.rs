//! Library entrypoint for embedding the balance monitor in other binaries.
//! The binary in `main.rs` wires it to a live Geyser endpoint.

pub mod client;
pub mod pipeline;
pub mod rpc;
pub mod worker;

pub use client::connect_geyser;
pub use pipeline::{BalanceObserver, TracingObserver, UpdateDispatcher};
pub use rpc::{
    build_subscribe_request, describe_request, render_update, GeyserChannel, StreamMessage,
    TransactionUpdate, UpdateChannel, TRANSACTIONS_FILTER,
};
pub use worker::{run_session, MonitorError, SessionState, SubscriptionSession};
