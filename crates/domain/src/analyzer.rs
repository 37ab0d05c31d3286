//! Turns the pre/post token balance snapshots of one transaction into
//! buy/sell events for the watched owners.

use std::collections::HashMap;

use crate::model::{BalanceChangeEvent, TokenBalanceSnapshot, TradeAction, WatchSet};

/// Diffs `post` against `pre` for every watched owner.
///
/// Events follow the order of `post`. A mint missing from `pre` is treated
/// as a zero prior balance. Duplicate (owner, mint) entries in `post` are
/// each compared against the latest value seen, not the original one.
pub fn analyze_balances(
    pre: &[TokenBalanceSnapshot],
    post: &[TokenBalanceSnapshot],
    watched: &WatchSet,
) -> Vec<BalanceChangeEvent> {
    if pre.is_empty() || post.is_empty() {
        return Vec::new();
    }

    // owner -> mint -> amount, only ever populated for watched owners.
    let mut working: HashMap<&str, HashMap<&str, f64>> = HashMap::new();

    for balance in pre.iter().filter(|b| watched.contains(&b.owner)) {
        working
            .entry(balance.owner.as_str())
            .or_default()
            .insert(balance.mint.as_str(), balance.ui_amount);
    }

    let mut events = Vec::new();
    for balance in post.iter().filter(|b| watched.contains(&b.owner)) {
        let mints = working.entry(balance.owner.as_str()).or_default();
        let previous = mints
            .insert(balance.mint.as_str(), balance.ui_amount)
            .unwrap_or(0.0);

        let delta = balance.ui_amount - previous;
        let action = if delta > 0.0 {
            TradeAction::Buy
        } else if delta < 0.0 {
            TradeAction::Sell
        } else {
            continue;
        };

        events.push(BalanceChangeEvent {
            mint: balance.mint.clone(),
            action,
            amount: delta.abs(),
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(owner: &str, mint: &str, amount: f64) -> TokenBalanceSnapshot {
        TokenBalanceSnapshot::new(owner, mint, amount)
    }

    fn event(mint: &str, action: TradeAction, amount: f64) -> BalanceChangeEvent {
        BalanceChangeEvent {
            mint: mint.to_string(),
            action,
            amount,
        }
    }

    fn watching(owner: &str) -> WatchSet {
        WatchSet::new([owner])
    }

    #[test]
    fn increase_is_reported_as_buy() {
        let events = analyze_balances(
            &[snap("W", "M1", 10.0)],
            &[snap("W", "M1", 25.0)],
            &watching("W"),
        );
        assert_eq!(events, vec![event("M1", TradeAction::Buy, 15.0)]);
    }

    #[test]
    fn decrease_is_reported_as_sell_with_positive_amount() {
        let events = analyze_balances(
            &[snap("W", "M1", 10.0)],
            &[snap("W", "M1", 4.0)],
            &watching("W"),
        );
        assert_eq!(events, vec![event("M1", TradeAction::Sell, 6.0)]);
    }

    #[test]
    fn empty_watch_set_yields_nothing() {
        let events = analyze_balances(
            &[snap("W", "M1", 10.0), snap("X", "M2", 1.0)],
            &[snap("W", "M1", 25.0), snap("X", "M2", 0.0)],
            &WatchSet::default(),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn mint_missing_before_counts_from_zero() {
        let events = analyze_balances(
            &[snap("W", "M1", 3.0)],
            &[snap("W", "M1", 3.0), snap("W", "M2", 5.0)],
            &watching("W"),
        );
        assert_eq!(events, vec![event("M2", TradeAction::Buy, 5.0)]);
    }

    #[test]
    fn owner_first_seen_after_counts_from_zero() {
        let events = analyze_balances(
            &[snap("other", "M1", 1.0)],
            &[snap("W", "M2", 5.0)],
            &watching("W"),
        );
        assert_eq!(events, vec![event("M2", TradeAction::Buy, 5.0)]);
    }

    #[test]
    fn empty_side_short_circuits() {
        let watched = watching("W");
        assert!(analyze_balances(&[], &[snap("W", "M1", 5.0)], &watched).is_empty());
        assert!(analyze_balances(&[snap("W", "M1", 5.0)], &[], &watched).is_empty());
    }

    #[test]
    fn unchanged_balances_emit_nothing() {
        let events = analyze_balances(
            &[snap("W", "M1", 7.5), snap("W", "M2", 1.0)],
            &[snap("W", "M1", 7.5), snap("W", "M2", 1.0)],
            &watching("W"),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn unwatched_owners_never_appear() {
        let events = analyze_balances(
            &[snap("W", "M1", 1.0), snap("X", "MX", 100.0)],
            &[snap("X", "MX", 0.0), snap("W", "M1", 2.0), snap("X", "MY", 9.0)],
            &watching("W"),
        );
        assert_eq!(events, vec![event("M1", TradeAction::Buy, 1.0)]);
    }

    #[test]
    fn duplicate_post_entries_chain_against_latest_value() {
        let events = analyze_balances(
            &[snap("W", "M1", 10.0)],
            &[snap("W", "M1", 12.0), snap("W", "M1", 9.0)],
            &watching("W"),
        );
        assert_eq!(
            events,
            vec![
                event("M1", TradeAction::Buy, 2.0),
                event("M1", TradeAction::Sell, 3.0),
            ]
        );
    }

    #[test]
    fn output_follows_post_order_across_owners() {
        let watched = WatchSet::new(["A", "B"]);
        let events = analyze_balances(
            &[snap("A", "M1", 1.0), snap("B", "M2", 4.0)],
            &[snap("B", "M2", 2.0), snap("A", "M1", 3.0)],
            &watched,
        );
        assert_eq!(
            events,
            vec![
                event("M2", TradeAction::Sell, 2.0),
                event("M1", TradeAction::Buy, 2.0),
            ]
        );
    }

    #[test]
    fn repeated_calls_are_identical() {
        let pre = [snap("W", "M1", 1.0), snap("W", "M2", 8.0)];
        let post = [snap("W", "M2", 2.0), snap("W", "M1", 4.0)];
        let watched = watching("W");
        let first = analyze_balances(&pre, &post, &watched);
        let second = analyze_balances(&pre, &post, &watched);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
