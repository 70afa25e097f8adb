use crate::{Side, Unit, month::ContractMonth, product::ProductName};
use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::hash::{Hash, Hasher};

/// Unique identifier for a [`Trade`] within one reconciliation run.
///
/// Opaque to the engine; it is the consumption key of the unmatched pool.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, From, Display,
)]
pub struct TradeId(pub SmolStr);

impl TradeId {
    pub fn new<S>(id: S) -> Self
    where
        S: Into<SmolStr>,
    {
        Self(id.into())
    }
}

impl From<&str> for TradeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Which reconciliation side a [`Trade`] was reported by.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum TradeSource {
    Trader,
    Exchange,
}

/// Put or call indicator of an SGX option record.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum OptionKind {
    #[serde(alias = "P", alias = "put")]
    Put,
    #[serde(alias = "C", alias = "call")]
    Call,
}

/// Universal record fields that must compare equal (null equals null) on every record of every
/// match, independent of rule.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
pub struct UniversalFields {
    pub broker_group_id: Option<i64>,
    pub clearing_acct_id: Option<SmolStr>,
}

impl From<&Trade> for UniversalFields {
    fn from(trade: &Trade) -> Self {
        Self {
            broker_group_id: trade.broker_group_id,
            clearing_acct_id: trade.clearing_acct_id.clone(),
        }
    }
}

/// One executed lot on one side of a reconciliation run.
///
/// Immutable after construction: the `base_product` derivation and the trader-side `unit`
/// default are applied at ingest and frozen. Equality and hashing are by `id` alone, so a
/// `Trade` can sit in hash-keyed candidate indexes without dragging its payload into the key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Trade {
    /// Unique within a run; the consumption key.
    pub id: TradeId,
    pub source: TradeSource,
    /// Canonical product name (lower-case, punctuation preserved).
    pub product: ProductName,
    /// For a `X crack` product, the tokens preceding `crack`; otherwise equals `product`.
    pub base_product: ProductName,
    pub contract_month: ContractMonth,
    /// Non-negative, in the record's native `unit`.
    pub quantity: Decimal,
    pub unit: Unit,
    /// Zero is a valid price and carries meaning on spread legs.
    pub price: Decimal,
    pub side: Side,
    pub broker_group_id: Option<i64>,
    pub clearing_acct_id: Option<SmolStr>,
    /// Exchange-side pairing hint grouping the legs of one dealt structure.
    pub deal_id: Option<SmolStr>,
    /// Exchange-side per-fill reference.
    pub trade_ref: Option<SmolStr>,
    pub strike: Option<Decimal>,
    pub put_call: Option<OptionKind>,
    /// Trader-side spread marker (eg/ `S`, `PS`) flagging the record as a spread leg.
    pub spread_flag: Option<SmolStr>,
    pub executed_at: Option<DateTime<Utc>>,
    /// Raw field values as received, kept verbatim for audit.
    pub raw: IndexMap<SmolStr, SmolStr>,
}

impl Trade {
    pub fn universal(&self) -> UniversalFields {
        UniversalFields::from(self)
    }

    /// `true` if this record and `other` agree on every universal field, null matching null.
    pub fn universal_agrees(&self, other: &Trade) -> bool {
        self.broker_group_id == other.broker_group_id
            && self.clearing_acct_id == other.clearing_acct_id
    }
}

impl PartialEq for Trade {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Trade {}

impl Hash for Trade {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}
