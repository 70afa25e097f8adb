use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use matchbook_trade::{
    Side, Unit,
    month::{ContractMonth, MonthParseError},
    product::ProductName,
    trade::{OptionKind, Trade, TradeId, TradeSource},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::str::FromStr;
use thiserror::Error;

/// Defines all possible errors produced while canonicalising one raw record.
///
/// Always fatal for the record (it is rejected at ingest), never for the run.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum NormalizationError {
    #[error("unknown buy/sell value: {value}")]
    UnknownSide { value: String },

    #[error("{0}")]
    MalformedMonth(#[from] MonthParseError),

    #[error("non-numeric {field}: {value}")]
    InvalidNumeric { field: String, value: String },

    #[error("unknown unit: {value}")]
    UnknownUnit { value: String },

    #[error("unknown put/call value: {value}")]
    UnknownOptionKind { value: String },

    #[error("missing required field: {field}")]
    MissingField { field: String },
}

/// One raw record as handed over by an external reader, all fields still in source form.
///
/// The reader is trusted to have mapped source columns onto these named fields; everything
/// else (case, quoting, separators, defaults) is this module's responsibility.
#[derive(Debug, Clone, Eq, PartialEq, Default, Deserialize, Serialize)]
pub struct RawRecord {
    /// Producer-assigned identity; the trade store assigns a sequential one when absent.
    #[serde(default)]
    pub id: Option<SmolStr>,
    pub product: SmolStr,
    pub contract_month: SmolStr,
    pub quantity: SmolStr,
    #[serde(default)]
    pub unit: Option<SmolStr>,
    pub price: SmolStr,
    pub buy_sell: SmolStr,
    #[serde(default)]
    pub broker_group_id: Option<SmolStr>,
    #[serde(default)]
    pub clearing_acct_id: Option<SmolStr>,
    #[serde(default)]
    pub deal_id: Option<SmolStr>,
    #[serde(default)]
    pub trade_ref: Option<SmolStr>,
    #[serde(default)]
    pub strike: Option<SmolStr>,
    #[serde(default)]
    pub put_call: Option<SmolStr>,
    #[serde(default)]
    pub spread_flag: Option<SmolStr>,
    #[serde(default)]
    pub executed_at: Option<DateTime<Utc>>,
}

/// Keyword-variation mapping: a record whose product contains every keyword canonicalises to
/// `canonical` (eg/ `{marine, 0.5, crack}` -> `marine 0.5% crack`).
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ProductVariation {
    pub keywords: Vec<SmolStr>,
    pub canonical: SmolStr,
}

/// Normalization tables for one exchange group.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct NormalizerConfig {
    /// Direct product mapping, keyed by the lower-cased source value
    /// (eg/ `380cst crack` -> `380cst crack`, `marine 0.5% cst crack` -> `marine 0.5% crack`).
    pub product_direct: IndexMap<SmolStr, SmolStr>,
    /// Keyword variations applied after the direct map misses.
    pub product_variations: Vec<ProductVariation>,
    /// Trader-side unit defaults per canonical product.
    pub trader_unit_defaults: IndexMap<SmolStr, Unit>,
    /// Trader-side unit when the product has no specific default.
    pub default_trader_unit: Unit,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            product_direct: IndexMap::default(),
            product_variations: Vec::default(),
            trader_unit_defaults: IndexMap::default(),
            default_trader_unit: Unit::Mt,
        }
    }
}

/// Transforms raw field values to canonical form so equivalent inputs compare equal without
/// losing information. Per-record and side-effect-free.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct Normalizer {
    pub config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Canonicalise one [`RawRecord`] into an immutable [`Trade`] carrying the provided id.
    pub fn normalize(
        &self,
        source: TradeSource,
        id: TradeId,
        record: &RawRecord,
    ) -> Result<Trade, NormalizationError> {
        let product = self.normalize_product(&record.product);
        let contract_month = ContractMonth::parse(&record.contract_month)?;
        let quantity = normalize_quantity(&record.quantity)?;
        let price = normalize_decimal("price", &record.price)?;
        let side = normalize_side(&record.buy_sell)?;
        let unit = self.normalize_unit(source, record.unit.as_deref(), &product)?;
        let broker_group_id = normalize_integer("broker_group_id", record.broker_group_id.as_deref())?;
        let strike = record
            .strike
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(|value| normalize_decimal("strike", value))
            .transpose()?;
        let put_call = record
            .put_call
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(normalize_put_call)
            .transpose()?;

        Ok(Trade {
            id,
            source,
            base_product: product.base(),
            product,
            contract_month,
            quantity,
            unit,
            price,
            side,
            broker_group_id,
            clearing_acct_id: non_empty(record.clearing_acct_id.as_deref()),
            deal_id: non_empty(record.deal_id.as_deref()),
            trade_ref: non_empty(record.trade_ref.as_deref()),
            strike,
            put_call,
            spread_flag: non_empty(record.spread_flag.as_deref()),
            executed_at: record.executed_at,
            raw: raw_fields(record),
        })
    }

    /// Lower-case, strip wrapping quotes/whitespace, then apply the direct map and the keyword
    /// variation table. Hyphens, percent signs and decimal points pass through verbatim.
    pub fn normalize_product(&self, value: &str) -> ProductName {
        let name = ProductName::new(value.trim().trim_matches(['"', '\'']).trim());

        if let Some(mapped) = self.config.product_direct.get(name.as_str()) {
            return ProductName::new(mapped.clone());
        }

        for variation in &self.config.product_variations {
            if variation
                .keywords
                .iter()
                .all(|keyword| name.as_str().contains(keyword.as_str()))
            {
                return ProductName::new(variation.canonical.clone());
            }
        }

        name
    }

    fn normalize_unit(
        &self,
        source: TradeSource,
        value: Option<&str>,
        product: &ProductName,
    ) -> Result<Unit, NormalizationError> {
        let declared = value.map(str::trim).filter(|value| !value.is_empty());
        match (source, declared) {
            (_, Some(value)) => parse_unit(value),
            (TradeSource::Trader, None) => Ok(self
                .config
                .trader_unit_defaults
                .get(product.as_str())
                .copied()
                .unwrap_or(self.config.default_trader_unit)),
            (TradeSource::Exchange, None) => Err(NormalizationError::MissingField {
                field: "unit".to_string(),
            }),
        }
    }
}

/// Case-insensitive buy/sell synonym table. Anything outside it is an error.
pub fn normalize_side(value: &str) -> Result<Side, NormalizationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "buy" | "bought" | "b" => Ok(Side::Buy),
        "sell" | "sold" | "s" => Ok(Side::Sell),
        _ => Err(NormalizationError::UnknownSide {
            value: value.to_string(),
        }),
    }
}

/// Strip quotes and thousands separators, parse as non-negative [`Decimal`].
pub fn normalize_quantity(value: &str) -> Result<Decimal, NormalizationError> {
    let quantity = normalize_decimal("quantity", value)?;
    if quantity.is_sign_negative() {
        return Err(NormalizationError::InvalidNumeric {
            field: "quantity".to_string(),
            value: value.to_string(),
        });
    }
    Ok(quantity)
}

fn normalize_decimal(field: &'static str, value: &str) -> Result<Decimal, NormalizationError> {
    let cleaned: String = value
        .trim()
        .trim_matches(['"', '\''])
        .chars()
        .filter(|c| *c != ',')
        .collect();

    Decimal::from_str(cleaned.trim()).map_err(|_| NormalizationError::InvalidNumeric {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn normalize_integer(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<i64>, NormalizationError> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| NormalizationError::InvalidNumeric {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn parse_unit(value: &str) -> Result<Unit, NormalizationError> {
    match value.to_ascii_uppercase().as_str() {
        "MT" => Ok(Unit::Mt),
        "BBL" => Ok(Unit::Bbl),
        "LOT" | "LOTS" | "UNIT" | "UNITS" => Ok(Unit::Lot),
        _ => Err(NormalizationError::UnknownUnit {
            value: value.to_string(),
        }),
    }
}

fn normalize_put_call(value: &str) -> Result<OptionKind, NormalizationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "p" | "put" => Ok(OptionKind::Put),
        "c" | "call" => Ok(OptionKind::Call),
        _ => Err(NormalizationError::UnknownOptionKind {
            value: value.to_string(),
        }),
    }
}

fn non_empty(value: Option<&str>) -> Option<SmolStr> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(SmolStr::new)
}

fn raw_fields(record: &RawRecord) -> IndexMap<SmolStr, SmolStr> {
    let mut raw = IndexMap::default();
    let mut insert = |key: &str, value: Option<&SmolStr>| {
        if let Some(value) = value {
            raw.insert(SmolStr::new(key), value.clone());
        }
    };

    insert("product", Some(&record.product));
    insert("contract_month", Some(&record.contract_month));
    insert("quantity", Some(&record.quantity));
    insert("unit", record.unit.as_ref());
    insert("price", Some(&record.price));
    insert("buy_sell", Some(&record.buy_sell));
    insert("broker_group_id", record.broker_group_id.as_ref());
    insert("clearing_acct_id", record.clearing_acct_id.as_ref());
    insert("deal_id", record.deal_id.as_ref());
    insert("trade_ref", record.trade_ref.as_ref());
    insert("strike", record.strike.as_ref());
    insert("put_call", record.put_call.as_ref());
    insert("spread_flag", record.spread_flag.as_ref());
    raw
}
