use crate::{
    config::{Confidence, RuleSpec},
    match_log::MatchResult,
    pool::UnmatchedPool,
    rule::convert::ConversionTable,
};
use matchbook_trade::{
    exchange::ExchangeGroup,
    trade::{Trade, TradeSource},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{Display, Formatter};

/// Exact-quantity aggregation of records with identical key fields.
pub mod aggregate;

/// MT to BBL conversion table and tolerance comparison.
pub mod convert;

/// Signature tuples - the fundamental hash-indexed matching primitive.
pub mod signature;

/// Spread-leg-pair recognition shared by the calendar, fly, multileg and product-spread rules.
pub mod spread;

/// CME rule set.
pub mod cme;

/// EEX rule set.
pub mod eex;

/// ICE rule set (13 rules).
pub mod ice;

/// SGX rule set (3 rules).
pub mod sgx;

/// Identifies one rule processor of one exchange group's pipeline.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    IceExact,
    IceCalendarSpread,
    IceSimpleCrack,
    IceComplexCrack,
    IceProductSpread,
    IceFly,
    IceAggregation,
    IceAggregatedComplexCrack,
    IceAggregatedSpread,
    IceMultilegSpread,
    IceAggregatedCrack,
    IceComplexCrackRoll,
    IceAggregatedProductSpread,
    SgxExact,
    SgxCalendarSpread,
    SgxProductSpread,
    CmeExact,
    EexExact,
}

impl RuleKind {
    /// Short rule id used in logs and summaries.
    pub fn id(&self) -> &'static str {
        match self {
            RuleKind::IceExact => "R1",
            RuleKind::IceCalendarSpread => "R2",
            RuleKind::IceSimpleCrack => "R3",
            RuleKind::IceComplexCrack => "R4",
            RuleKind::IceProductSpread => "R5",
            RuleKind::IceFly => "R6",
            RuleKind::IceAggregation => "R7",
            RuleKind::IceAggregatedComplexCrack => "R8",
            RuleKind::IceAggregatedSpread => "R9",
            RuleKind::IceMultilegSpread => "R10",
            RuleKind::IceAggregatedCrack => "R11",
            RuleKind::IceComplexCrackRoll => "R12",
            RuleKind::IceAggregatedProductSpread => "R13",
            RuleKind::SgxExact => "S1",
            RuleKind::SgxCalendarSpread => "S2",
            RuleKind::SgxProductSpread => "S3",
            RuleKind::CmeExact => "CME1",
            RuleKind::EexExact => "EEX1",
        }
    }

    /// The exchange group whose pipeline this rule belongs to.
    pub fn group(&self) -> ExchangeGroup {
        match self {
            RuleKind::IceExact
            | RuleKind::IceCalendarSpread
            | RuleKind::IceSimpleCrack
            | RuleKind::IceComplexCrack
            | RuleKind::IceProductSpread
            | RuleKind::IceFly
            | RuleKind::IceAggregation
            | RuleKind::IceAggregatedComplexCrack
            | RuleKind::IceAggregatedSpread
            | RuleKind::IceMultilegSpread
            | RuleKind::IceAggregatedCrack
            | RuleKind::IceComplexCrackRoll
            | RuleKind::IceAggregatedProductSpread => ExchangeGroup::Ice,
            RuleKind::SgxExact | RuleKind::SgxCalendarSpread | RuleKind::SgxProductSpread => {
                ExchangeGroup::Sgx
            }
            RuleKind::CmeExact => ExchangeGroup::Cme,
            RuleKind::EexExact => ExchangeGroup::Eex,
        }
    }
}

impl Display for RuleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Matched-field names reported on a [`MatchResult`].
pub mod field {
    pub const PRODUCT: &str = "product";
    pub const CONTRACT_MONTH: &str = "contract_month";
    pub const QUANTITY: &str = "quantity";
    pub const PRICE: &str = "price";
    pub const BUY_SELL: &str = "buy_sell";
    pub const UNIT: &str = "unit";
    pub const STRIKE: &str = "strike";
    pub const PUT_CALL: &str = "put_call";
    pub const BROKER_GROUP_ID: &str = "broker_group_id";
    pub const CLEARING_ACCT_ID: &str = "clearing_acct_id";
}

/// Build the matched-field name list for a result: the rule's own fields followed by the
/// universal fields, which every rule validates.
pub fn matched_fields(fields: &[&'static str]) -> Vec<SmolStr> {
    fields
        .iter()
        .copied()
        .chain([field::BROKER_GROUP_ID, field::CLEARING_ACCT_ID])
        .map(SmolStr::new_static)
        .collect()
}

/// Read-only context handed to a rule invocation: its own [`RuleSpec`] plus the shared
/// conversion table.
#[derive(Debug, Copy, Clone)]
pub struct RuleContext<'a> {
    pub spec: &'a RuleSpec,
    pub conversion: &'a ConversionTable,
}

impl RuleContext<'_> {
    pub fn confidence(&self) -> Confidence {
        self.spec.confidence
    }

    /// Lower-tier confidence `n` (zero-based), falling back to the primary when the
    /// configuration declares fewer tiers.
    pub fn tier_confidence(&self, n: usize) -> Confidence {
        self.spec
            .tier_confidences
            .get(n)
            .copied()
            .unwrap_or(self.spec.confidence)
    }

    /// BBL tolerance for quantity comparison; zero (exact) unless configured.
    pub fn tolerance_bbl(&self) -> Decimal {
        self.spec.tolerance_bbl.unwrap_or(Decimal::ZERO)
    }

    /// MT tolerance for quantity comparison; zero (exact) unless configured.
    pub fn tolerance_mt(&self) -> Decimal {
        self.spec.tolerance_mt.unwrap_or(Decimal::ZERO)
    }
}

/// Owned snapshot of one side's available records, in deterministic ingest order.
///
/// Rules scan the snapshot and re-check availability at claim time, so consumption earlier in
/// the same invocation is honoured.
pub(crate) fn snapshot(pool: &UnmatchedPool, source: TradeSource) -> Vec<Trade> {
    pool.available(source).cloned().collect()
}

/// One confidence-ordered rule processor.
///
/// A rule scans the pool's available records, emits the matches satisfying its predicate and
/// consumes the records it claims. Per-candidate predicate failures are ordinary negative
/// outcomes; only structural errors propagate (by construction there are none at this layer -
/// malformed records never reach the pool).
pub trait RuleProcessor {
    fn kind(&self) -> RuleKind;

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult>;
}

/// Instantiate the processor for a configured rule.
pub fn build(kind: RuleKind) -> Box<dyn RuleProcessor> {
    match kind {
        RuleKind::IceExact => Box::new(ice::exact::Exact),
        RuleKind::IceCalendarSpread => Box::new(ice::calendar_spread::CalendarSpread),
        RuleKind::IceSimpleCrack => Box::new(ice::simple_crack::SimpleCrack),
        RuleKind::IceComplexCrack => Box::new(ice::complex_crack::ComplexCrack),
        RuleKind::IceProductSpread => Box::new(ice::product_spread::ProductSpread),
        RuleKind::IceFly => Box::new(ice::fly::Fly),
        RuleKind::IceAggregation => Box::new(ice::aggregation::Aggregation),
        RuleKind::IceAggregatedComplexCrack => {
            Box::new(ice::aggregated_complex_crack::AggregatedComplexCrack)
        }
        RuleKind::IceAggregatedSpread => Box::new(ice::aggregated_spread::AggregatedSpread),
        RuleKind::IceMultilegSpread => Box::new(ice::multileg_spread::MultilegSpread),
        RuleKind::IceAggregatedCrack => Box::new(ice::aggregated_crack::AggregatedCrack),
        RuleKind::IceComplexCrackRoll => Box::new(ice::complex_crack_roll::ComplexCrackRoll),
        RuleKind::IceAggregatedProductSpread => {
            Box::new(ice::aggregated_product_spread::AggregatedProductSpread)
        }
        RuleKind::SgxExact => Box::new(sgx::exact::Exact),
        RuleKind::SgxCalendarSpread => Box::new(sgx::calendar_spread::CalendarSpread),
        RuleKind::SgxProductSpread => Box::new(sgx::product_spread::ProductSpread),
        RuleKind::CmeExact => Box::new(cme::Exact),
        RuleKind::EexExact => Box::new(eex::Exact),
    }
}
