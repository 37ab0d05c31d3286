//! Domain-level building blocks shared by the monitor and storage crates:
//! balance model types, the pre/post balance analyzer, environment
//! configuration, the raw snapshot sink contract and telemetry setup.

pub mod analyzer;
pub mod config;
pub mod model;
pub mod services;
pub mod storage;

pub use analyzer::analyze_balances;
pub use config::{ConfigError, FilterConfig, MonitorConfig};
pub use model::{
    BalanceChangeEvent, TokenBalanceSnapshot, TradeAction, TransactionReport, WatchSet,
};
pub use storage::{RawEventSink, RawSnapshot, StorageError, StorageResult};
