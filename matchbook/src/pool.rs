use fnv::FnvHashSet;
use indexmap::IndexMap;
use matchbook_trade::trade::{Trade, TradeId, TradeSource};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The records still eligible to match at the current pipeline step.
///
/// Two insertion-ordered sides plus the dual set of consumed identities. Exclusively owned by
/// the pipeline driver; [`UnmatchedPool::claim`] is the only path that removes records, which
/// is the sole invariant protecting "each trade participates in at most one match".
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct UnmatchedPool {
    trader: IndexMap<TradeId, Trade>,
    exchange: IndexMap<TradeId, Trade>,
    consumed: Vec<TradeId>,
    /// Claims rejected because a named id was no longer available. Under single-threaded
    /// operation a non-zero value signals a rule emitting overlapping candidate tuples.
    failed_claims: u64,
}

impl UnmatchedPool {
    /// Seed the pool with every ingested trade; all enter available, in ingest order.
    pub fn new(trader: Vec<Trade>, exchange: Vec<Trade>) -> Self {
        Self {
            trader: trader
                .into_iter()
                .map(|trade| (trade.id.clone(), trade))
                .collect(),
            exchange: exchange
                .into_iter()
                .map(|trade| (trade.id.clone(), trade))
                .collect(),
            consumed: Vec::default(),
            failed_claims: 0,
        }
    }

    fn side(&self, source: TradeSource) -> &IndexMap<TradeId, Trade> {
        match source {
            TradeSource::Trader => &self.trader,
            TradeSource::Exchange => &self.exchange,
        }
    }

    /// Iterate the records still available on one side, in deterministic ingest order.
    ///
    /// Rules snapshot this at the start of an invocation and rely on [`Self::is_available`] /
    /// [`Self::claim`] for anything consumed mid-scan.
    pub fn available(&self, source: TradeSource) -> impl Iterator<Item = &Trade> {
        self.side(source).values()
    }

    /// Number of records still available on one side.
    pub fn available_len(&self, source: TradeSource) -> usize {
        self.side(source).len()
    }

    pub fn is_available(&self, source: TradeSource, id: &TradeId) -> bool {
        self.side(source).contains_key(id)
    }

    /// Atomically consume the named ids from both sides.
    ///
    /// Succeeds iff every id is currently available and no id repeats within the request;
    /// otherwise rejects, leaves the pool unchanged, and counts the anomaly.
    pub fn claim(&mut self, trader_ids: &[TradeId], exchange_ids: &[TradeId]) -> bool {
        let mut seen = FnvHashSet::default();
        let all_available = trader_ids
            .iter()
            .all(|id| self.trader.contains_key(id) && seen.insert(id.clone()))
            && exchange_ids
                .iter()
                .all(|id| self.exchange.contains_key(id) && seen.insert(id.clone()));

        if !all_available {
            self.failed_claims += 1;
            warn!(
                ?trader_ids,
                ?exchange_ids,
                "pool claim rejected - id not available; skipping candidate"
            );
            return false;
        }

        for id in trader_ids {
            self.trader.shift_remove(id);
            self.consumed.push(id.clone());
        }
        for id in exchange_ids {
            self.exchange.shift_remove(id);
            self.consumed.push(id.clone());
        }

        true
    }

    /// Final read-out of one side's unmatched residue, in ingest order.
    pub fn residue(&self, source: TradeSource) -> Vec<Trade> {
        self.side(source).values().cloned().collect()
    }

    /// Identities consumed so far, in claim order.
    pub fn consumed(&self) -> &[TradeId] {
        &self.consumed
    }

    pub fn failed_claims(&self) -> u64 {
        self.failed_claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchbook_trade::{Side, Unit, test_utils::trade};

    fn pool() -> UnmatchedPool {
        UnmatchedPool::new(
            vec![
                trade("t-1", TradeSource::Trader, "380cst", "Jun-25", "2000", Unit::Mt, "425.50", Side::Sell),
                trade("t-2", TradeSource::Trader, "380cst", "Jul-25", "2000", Unit::Mt, "409.00", Side::Buy),
            ],
            vec![trade("e-1", TradeSource::Exchange, "380cst", "Jun-25", "2000", Unit::Mt, "425.50", Side::Sell)],
        )
    }

    #[test]
    fn test_claim_consumes_atomically() {
        let mut pool = pool();
        assert!(pool.claim(&["t-1".into()], &["e-1".into()]));
        assert!(!pool.is_available(TradeSource::Trader, &"t-1".into()));
        assert!(!pool.is_available(TradeSource::Exchange, &"e-1".into()));
        assert_eq!(pool.available_len(TradeSource::Trader), 1);
        assert_eq!(pool.consumed(), &["t-1".into(), "e-1".into()]);
    }

    #[test]
    fn test_claim_rejects_unavailable_and_leaves_state_unchanged() {
        let mut pool = pool();
        assert!(pool.claim(&["t-1".into()], &[]));

        // t-1 is consumed; claiming it again alongside t-2 must reject both.
        assert!(!pool.claim(&["t-1".into(), "t-2".into()], &["e-1".into()]));
        assert!(pool.is_available(TradeSource::Trader, &"t-2".into()));
        assert!(pool.is_available(TradeSource::Exchange, &"e-1".into()));
        assert_eq!(pool.failed_claims(), 1);
    }

    #[test]
    fn test_claim_rejects_duplicate_ids_within_request() {
        let mut pool = pool();
        assert!(!pool.claim(&["t-1".into(), "t-1".into()], &[]));
        assert!(pool.is_available(TradeSource::Trader, &"t-1".into()));
    }

    #[test]
    fn test_residue_preserves_ingest_order() {
        let mut pool = pool();
        assert!(pool.claim(&[], &["e-1".into()]));
        let residue = pool.residue(TradeSource::Trader);
        let ids: Vec<_> = residue.iter().map(|trade| trade.id.clone()).collect();
        assert_eq!(ids, vec!["t-1".into(), "t-2".into()]);
        assert!(pool.residue(TradeSource::Exchange).is_empty());
    }
}
