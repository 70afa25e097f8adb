use crate::pool::UnmatchedPool;
use fnv::FnvHashMap;
use matchbook_trade::{
    Side, Unit,
    month::ContractMonth,
    trade::{OptionKind, Trade, TradeId, TradeSource, UniversalFields},
};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::collections::VecDeque;

/// A hashable tuple over a subset of a trade's matching attributes plus the universal fields.
///
/// Equal signatures on opposite sides are the fundamental matching primitive: each rule builds
/// an index from signature to candidates on one side and probes with the other, keeping the
/// scan O(N+M). Unset fields compare equal, so a rule opts into exactly the attributes its
/// predicate names.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Signature {
    pub product: Option<SmolStr>,
    pub month: Option<ContractMonth>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub side: Option<Side>,
    pub unit: Option<Unit>,
    pub strike: Option<Decimal>,
    pub put_call: Option<OptionKind>,
    pub universal: UniversalFields,
}

impl Signature {
    /// Start from a trade's universal fields; every other attribute is opt-in.
    pub fn of(trade: &Trade) -> Self {
        Self {
            product: None,
            month: None,
            quantity: None,
            price: None,
            side: None,
            unit: None,
            strike: None,
            put_call: None,
            universal: trade.universal(),
        }
    }

    pub fn product(mut self, trade: &Trade) -> Self {
        self.product = Some(trade.product.0.clone());
        self
    }

    pub fn base_product(mut self, trade: &Trade) -> Self {
        self.product = Some(trade.base_product.0.clone());
        self
    }

    pub fn month(mut self, trade: &Trade) -> Self {
        self.month = Some(trade.contract_month);
        self
    }

    pub fn quantity(mut self, trade: &Trade) -> Self {
        self.quantity = Some(trade.quantity);
        self
    }

    pub fn price(mut self, trade: &Trade) -> Self {
        self.price = Some(trade.price);
        self
    }

    pub fn side(mut self, trade: &Trade) -> Self {
        self.side = Some(trade.side);
        self
    }

    /// The opposing side - used where trader and exchange record directions mirror each other
    /// (CME / EEX).
    pub fn opposite_side(mut self, trade: &Trade) -> Self {
        self.side = Some(trade.side.opposite());
        self
    }

    pub fn unit(mut self, trade: &Trade) -> Self {
        self.unit = Some(trade.unit);
        self
    }

    /// Strike and put/call join the signature when present (SGX options); futures records
    /// leave both unset and still compare equal.
    pub fn options(mut self, trade: &Trade) -> Self {
        self.strike = trade.strike;
        self.put_call = trade.put_call;
        self
    }
}

/// Exact signature of one record: product, month, quantity, price, side, unit and (when
/// present) option attributes.
fn exact_signature(trade: &Trade) -> Signature {
    Signature::of(trade)
        .product(trade)
        .month(trade)
        .quantity(trade)
        .price(trade)
        .side(trade)
        .unit(trade)
        .options(trade)
}

/// Scan for one-to-one exact matches: index the exchange side by signature, probe with each
/// trader record in ingest order, pair first-come.
///
/// `opposite_direction` flips the probe side for venues where a trader Sell pairs to an
/// exchange Buy.
pub fn exact_pairs(pool: &UnmatchedPool, opposite_direction: bool) -> Vec<(TradeId, TradeId)> {
    let mut index: FnvHashMap<Signature, VecDeque<TradeId>> = FnvHashMap::default();
    for exchange in pool.available(TradeSource::Exchange) {
        index
            .entry(exact_signature(exchange))
            .or_default()
            .push_back(exchange.id.clone());
    }

    let mut pairs = Vec::new();
    for trader in pool.available(TradeSource::Trader) {
        let mut signature = exact_signature(trader);
        if opposite_direction {
            signature.side = Some(trader.side.opposite());
        }

        if let Some(candidates) = index.get_mut(&signature)
            && let Some(exchange_id) = candidates.pop_front()
        {
            pairs.push((trader.id.clone(), exchange_id));
        }
    }

    pairs
}
