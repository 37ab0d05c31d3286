use balance_watch_domain::model::TokenBalanceSnapshot;
use serde_json::{json, Value};
use yellowstone_grpc_proto::prelude::{
    subscribe_update::UpdateOneof, SubscribeUpdate, SubscribeUpdateTransactionInfo, TokenBalance,
    TransactionStatusMeta,
};

/// Inbound stream message, reduced to the cases the monitor acts on.
#[derive(Debug)]
pub enum StreamMessage<'a> {
    Transaction(TransactionUpdate<'a>),
    Other,
}

impl<'a> StreamMessage<'a> {
    pub fn classify(update: &'a SubscribeUpdate) -> Self {
        match &update.update_oneof {
            Some(UpdateOneof::Transaction(tx)) => Self::Transaction(TransactionUpdate {
                slot: tx.slot,
                info: tx.transaction.as_ref(),
            }),
            _ => Self::Other,
        }
    }
}

/// Borrowed view over a transaction update.
#[derive(Debug, Clone, Copy)]
pub struct TransactionUpdate<'a> {
    pub slot: u64,
    info: Option<&'a SubscribeUpdateTransactionInfo>,
}

impl<'a> TransactionUpdate<'a> {
    /// Base58 signature, empty when the server omitted transaction info.
    pub fn signature(&self) -> String {
        self.info
            .map(|info| bs58::encode(&info.signature).into_string())
            .unwrap_or_default()
    }

    fn meta(&self) -> Option<&'a TransactionStatusMeta> {
        self.info.and_then(|info| info.meta.as_ref())
    }

    /// Pre/post token balances, present only when the metadata carries both
    /// lists.
    pub fn balances(&self) -> Option<(Vec<TokenBalanceSnapshot>, Vec<TokenBalanceSnapshot>)> {
        let meta = self.meta()?;
        if meta.pre_token_balances.is_empty() || meta.post_token_balances.is_empty() {
            return None;
        }
        Some((
            to_snapshots(&meta.pre_token_balances),
            to_snapshots(&meta.post_token_balances),
        ))
    }
}

fn to_snapshots(balances: &[TokenBalance]) -> Vec<TokenBalanceSnapshot> {
    balances
        .iter()
        .map(|balance| {
            TokenBalanceSnapshot::new(
                balance.owner.clone(),
                balance.mint.clone(),
                balance
                    .ui_token_amount
                    .as_ref()
                    .map_or(0.0, |amount| amount.ui_amount),
            )
        })
        .collect()
}

/// JSON body persisted for a raw update.
pub fn render_update(update: &SubscribeUpdate) -> Value {
    let Some(UpdateOneof::Transaction(tx)) = &update.update_oneof else {
        return json!({ "filters": update.filters });
    };

    let info = tx.transaction.as_ref();
    let meta = info.and_then(|info| info.meta.as_ref());
    json!({
        "filters": update.filters,
        "slot": tx.slot,
        "signature": info.map(|info| bs58::encode(&info.signature).into_string()),
        "is_vote": info.map(|info| info.is_vote),
        "index": info.map(|info| info.index),
        "meta": meta.map(render_meta),
    })
}

fn render_meta(meta: &TransactionStatusMeta) -> Value {
    json!({
        "failed": meta.err.is_some(),
        "fee": meta.fee,
        "log_messages": meta.log_messages,
        "pre_token_balances": meta.pre_token_balances.iter().map(render_token_balance).collect::<Vec<_>>(),
        "post_token_balances": meta.post_token_balances.iter().map(render_token_balance).collect::<Vec<_>>(),
    })
}

fn render_token_balance(balance: &TokenBalance) -> Value {
    json!({
        "account_index": balance.account_index,
        "mint": balance.mint,
        "owner": balance.owner,
        "program_id": balance.program_id,
        "ui_token_amount": balance.ui_token_amount.as_ref().map(|amount| json!({
            "ui_amount": amount.ui_amount,
            "decimals": amount.decimals,
            "amount": amount.amount,
            "ui_amount_string": amount.ui_amount_string,
        })),
    })
}
