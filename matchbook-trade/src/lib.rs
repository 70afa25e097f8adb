#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Matchbook-Trade
//! Matchbook-Trade contains the core Trade, ContractMonth, ProductName and ExchangeGroup data
//! structures shared by the Matchbook reconciliation engine and its collaborators.
//!
//! A [`Trade`](trade::Trade) is an immutable record of one executed lot on one side of a
//! reconciliation run (trader book or exchange clearing feed). All matching attributes are
//! canonicalised before construction, so downstream code compares values directly and never
//! re-parses.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Defines the [`ExchangeGroup`](exchange::ExchangeGroup) enum covering all supported clearing
/// venues.
pub mod exchange;

/// [`ContractMonth`](month::ContractMonth) and its per-exchange string dialects.
pub mod month;

/// Canonical [`ProductName`](product::ProductName) with crack and product-spread derivations.
pub mod product;

/// [`Trade`](trade::Trade) record and associated identity types.
pub mod trade;

/// [`Side`] of a trade - Buy or Sell.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Side {
    #[serde(alias = "buy", alias = "BUY", alias = "b", alias = "B")]
    Buy,
    #[serde(alias = "sell", alias = "SELL", alias = "s", alias = "S")]
    Sell,
}

impl Side {
    /// Single-letter canonical code used in signatures and audit output.
    pub fn code(&self) -> &'static str {
        match self {
            Side::Buy => "B",
            Side::Sell => "S",
        }
    }

    /// The opposing [`Side`].
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Native quantity [`Unit`] of a trade record.
///
/// `Lot` covers CME lots and EEX units, which are counted rather than weighed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Unit {
    Mt,
    Bbl,
    Lot,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Mt => "MT",
            Unit::Bbl => "BBL",
            Unit::Lot => "LOT",
        }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Matchbook-Trade test utilities.
pub mod test_utils {
    use crate::{
        Side, Unit,
        month::ContractMonth,
        product::ProductName,
        trade::{Trade, TradeId, TradeSource},
    };
    use indexmap::IndexMap;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    /// Terse [`Trade`] constructor for tests.
    ///
    /// Universal fields default to `broker_group_id = Some(1)` and
    /// `clearing_acct_id = Some("A")`; mutate the returned value for scenarios that need
    /// anything richer.
    pub fn trade(
        id: &str,
        source: TradeSource,
        product: &str,
        month: &str,
        quantity: &str,
        unit: Unit,
        price: &str,
        side: Side,
    ) -> Trade {
        let product = ProductName::new(product);
        Trade {
            id: TradeId::new(id),
            source,
            base_product: product.base(),
            product,
            contract_month: ContractMonth::parse(month).unwrap(),
            quantity: Decimal::from_str(quantity).unwrap(),
            unit,
            price: Decimal::from_str(price).unwrap(),
            side,
            broker_group_id: Some(1),
            clearing_acct_id: Some("A".into()),
            deal_id: None,
            trade_ref: None,
            strike: None,
            put_call: None,
            spread_flag: None,
            executed_at: None,
            raw: IndexMap::default(),
        }
    }
}
