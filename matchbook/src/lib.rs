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

//! # Matchbook
//! Matchbook reconciles executed derivatives trades from two independent sources - a trader
//! book and an exchange clearing feed - producing confirmed matches plus the unmatched
//! residue of each side.
//! * **Exact**: all quantity and price arithmetic is `rust_decimal`; only configured
//!   tolerances permit deviation.
//! * **Deterministic**: identical inputs and configuration produce identical match sequences.
//! * **Confidence-ordered**: an exchange group's rules run strictly in configured order, each
//!   seeing the pool exactly as its predecessor left it.
//!
//! ## Overview
//! A run flows linearly through five components:
//! 1. [`Normalizer`](normalize::Normalizer) - canonicalises raw field values (product
//!    synonyms, month dialects, buy/sell alphabet, numeric cleanup, unit defaults).
//! 2. [`TradeStore`](store::TradeStore) - materialises immutable
//!    [`Trade`](matchbook_trade::trade::Trade) value objects, rejecting malformed records
//!    with warnings.
//! 3. [`UnmatchedPool`](pool::UnmatchedPool) - the records still eligible to match, consumed
//!    atomically and at most once.
//! 4. The rule pipeline ([`MatchPipeline`](pipeline::MatchPipeline)) - ordered
//!    [`RuleProcessor`](rule::RuleProcessor)s per exchange group (ICE, SGX, CME, EEX).
//! 5. [`MatchLog`](match_log::MatchLog) - the append-only list of
//!    [`MatchResult`](match_log::MatchResult)s with their audit trails.
//!
//! ## Getting Started
//! ```rust
//! use matchbook::{config::ExchangeGroupConfig, pipeline::MatchPipeline};
//! use matchbook_trade::{Side, Unit, test_utils::trade, trade::TradeSource};
//!
//! let pipeline = MatchPipeline::new(ExchangeGroupConfig::ice()).unwrap();
//! let trader = vec![trade(
//!     "t-1", TradeSource::Trader, "marine 0.5%", "Aug-25", "2000", Unit::Mt, "476.75",
//!     Side::Sell,
//! )];
//! let exchange = vec![trade(
//!     "e-1", TradeSource::Exchange, "marine 0.5%", "Aug-25", "2000", Unit::Mt, "476.75",
//!     Side::Sell,
//! )];
//!
//! let outcome = pipeline.run(trader, exchange);
//! assert_eq!(outcome.matches.len(), 1);
//! assert!(outcome.residue_trader.is_empty());
//! ```

use serde::{Deserialize, Serialize};

/// Per-exchange-group configuration: ordered rule lists, confidences, tolerances,
/// normalization tables and conversion ratios.
pub mod config;

/// Defines all possible errors in Matchbook.
pub mod error;

/// Provides default Matchbook Tracing logging initialisers.
pub mod logging;

/// The append-only match log and the [`MatchResult`](match_log::MatchResult) it accumulates.
pub mod match_log;

/// Canonicalisation of raw records into comparable field values.
pub mod normalize;

/// The rule pipeline driver and the [`Reconciliation`](pipeline::Reconciliation) output
/// value.
pub mod pipeline;

/// The unmatched pool - the sole owner of match eligibility.
pub mod pool;

/// Rule processors and their shared matching primitives (signatures, spreads, aggregation,
/// unit conversion).
pub mod rule;

/// Materialisation of raw record streams into immutable trades.
pub mod store;

/// Run summary statistics.
pub mod summary;

/// Monotonically increasing sequence stamping
/// [`MatchId`](match_log::MatchId)s in append order.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
pub struct Sequence(pub u64);

impl Sequence {
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn fetch_add(&mut self) -> Sequence {
        let sequence = *self;
        self.0 += 1;
        sequence
    }
}
