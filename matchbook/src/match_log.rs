use crate::{Sequence, config::Confidence, rule::RuleKind};
use derive_more::Display;
use indexmap::IndexMap;
use matchbook_trade::trade::TradeId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Audit keys recorded by rules so a reviewer can reproduce the decision.
pub mod audit {
    /// Sum of the aggregated many-side quantities.
    pub const AGGREGATED_SUM: &str = "aggregated_sum";
    /// MT quantity after conversion to BBL.
    pub const CONVERTED_BBL: &str = "converted_bbl";
    /// Price differential of the matched spread.
    pub const SPREAD_PRICE: &str = "spread_price";
    /// Crack price derived from base and brent legs.
    pub const CRACK_PRICE: &str = "crack_price";
    /// Crack price derived for the second month of a roll.
    pub const CRACK_PRICE_OTHER: &str = "crack_price_other";
    /// Algebraic fly prediction `(X-Y) + (Z-Y)`.
    pub const FLY_PRICE: &str = "fly_price";
}

/// Deterministic identifier of a [`MatchResult`], stamped at append time.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Default,
    Deserialize,
    Serialize,
    Display,
)]
#[display("match-{_0}")]
pub struct MatchId(pub u64);

/// One confirmed match: the rule that produced it, its confidence, every consumed record id on
/// both sides, the field names that had to agree, and the numeric audit trail.
///
/// Equality is by payload.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct MatchResult {
    pub match_id: MatchId,
    pub rule: RuleKind,
    pub confidence: Confidence,
    pub trader_ids: Vec<TradeId>,
    pub exchange_ids: Vec<TradeId>,
    pub matched_fields: Vec<SmolStr>,
    pub audit: IndexMap<SmolStr, Decimal>,
}

impl MatchResult {
    /// Construct an unstamped result; the [`MatchLog`] assigns the id on append.
    pub fn new(
        rule: RuleKind,
        confidence: Confidence,
        trader_ids: Vec<TradeId>,
        exchange_ids: Vec<TradeId>,
        matched_fields: Vec<SmolStr>,
    ) -> Self {
        Self {
            match_id: MatchId::default(),
            rule,
            confidence,
            trader_ids,
            exchange_ids,
            matched_fields,
            audit: IndexMap::default(),
        }
    }

    pub fn with_audit(mut self, key: &'static str, value: Decimal) -> Self {
        self.audit.insert(SmolStr::new_static(key), value);
        self
    }
}

/// Append-only log of every [`MatchResult`] of a run.
///
/// Order of appearance reflects the configured rule order and, within a rule, the
/// deterministic scan order of its probe side.
#[derive(Debug, Clone, Eq, PartialEq, Default, Deserialize, Serialize)]
pub struct MatchLog {
    sequence: Sequence,
    entries: Vec<MatchResult>,
}

impl MatchLog {
    /// Stamp `result` with the next [`MatchId`] and append it.
    pub fn append(&mut self, mut result: MatchResult) {
        result.match_id = MatchId(self.sequence.fetch_add().value());
        self.entries.push(result);
    }

    pub fn entries(&self) -> &[MatchResult] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<MatchResult> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of matches produced by one rule.
    pub fn count_for(&self, rule: RuleKind) -> usize {
        self.entries.iter().filter(|entry| entry.rule == rule).count()
    }
}
