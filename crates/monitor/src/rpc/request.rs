use std::collections::{BTreeMap, HashMap};

use balance_watch_domain::config::FilterConfig;
use serde::Serialize;
use yellowstone_grpc_proto::prelude::{
    CommitmentLevel, SubscribeRequest, SubscribeRequestFilterTransactions,
};

/// Name under which the transaction filter is registered with the server.
pub const TRANSACTIONS_FILTER: &str = "transactions_sub";

/// Builds the single subscription request sent when a session starts.
///
/// Commitment is always `Processed`. The transaction filter is only present
/// when transactions are enabled; otherwise the server has nothing to stream.
pub fn build_subscribe_request(config: &FilterConfig) -> SubscribeRequest {
    let mut transactions = HashMap::new();
    if config.transactions_enabled() {
        transactions.insert(
            TRANSACTIONS_FILTER.to_string(),
            SubscribeRequestFilterTransactions {
                vote: Some(config.include_votes()),
                failed: Some(config.include_failed()),
                account_include: config.watched_owners().to_vec(),
                ..Default::default()
            },
        );
    }

    SubscribeRequest {
        transactions,
        commitment: Some(CommitmentLevel::Processed as i32),
        ..Default::default()
    }
}

#[derive(Serialize)]
struct RequestSummary<'a> {
    commitment: Option<&'a str>,
    transactions: BTreeMap<&'a str, TransactionFilterSummary<'a>>,
}

#[derive(Serialize)]
struct TransactionFilterSummary<'a> {
    vote: Option<bool>,
    failed: Option<bool>,
    account_include: &'a [String],
}

/// JSON rendering of the request for the startup log line.
pub fn describe_request(request: &SubscribeRequest) -> Result<String, serde_json::Error> {
    let summary = RequestSummary {
        commitment: request
            .commitment
            .and_then(|value| CommitmentLevel::try_from(value).ok())
            .map(|level| level.as_str_name()),
        transactions: request
            .transactions
            .iter()
            .map(|(name, filter)| {
                (
                    name.as_str(),
                    TransactionFilterSummary {
                        vote: filter.vote,
                        failed: filter.failed,
                        account_include: &filter.account_include,
                    },
                )
            })
            .collect(),
    };
    serde_json::to_string(&summary)
}
