use indexmap::IndexMap;
use matchbook_trade::{Side, month::ContractMonth, product::ProductName, trade::Trade};
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// Two opposite-direction records of identical quantity forming one side of a spread, ordered
/// by contract month.
#[derive(Debug, Clone, Copy)]
pub struct LegPair<'a> {
    pub early: &'a Trade,
    pub late: &'a Trade,
}

impl<'a> LegPair<'a> {
    /// Order two records chronologically by contract month.
    pub fn new(a: &'a Trade, b: &'a Trade) -> Self {
        if a.contract_month <= b.contract_month {
            Self { early: a, late: b }
        } else {
            Self { early: b, late: a }
        }
    }

    pub fn months(&self) -> (ContractMonth, ContractMonth) {
        (self.early.contract_month, self.late.contract_month)
    }

    /// Outright price differential, early minus late.
    pub fn price_differential(&self) -> Decimal {
        self.early.price - self.late.price
    }

    /// The quoted spread price of a trader-side pair, if the `{non-zero, 0}` / `{0, 0}` price
    /// pattern holds.
    pub fn quoted_spread_price(&self) -> Option<Decimal> {
        price_pattern(self.early.price, self.late.price)
    }

    /// The leg carrying the non-zero quote; the early leg when both are zero.
    pub fn quoted_leg(&self) -> &'a Trade {
        if !self.late.price.is_zero() && self.early.price.is_zero() {
            self.late
        } else {
            self.early
        }
    }
}

/// `{non-zero, 0}` or `{0, 0}` spread price pattern; the value is the quoted spread price.
pub fn price_pattern(a: Decimal, b: Decimal) -> Option<Decimal> {
    match (a.is_zero(), b.is_zero()) {
        (false, true) => Some(a),
        (true, false) => Some(b),
        (true, true) => Some(Decimal::ZERO),
        (false, false) => None,
    }
}

/// Structural calendar-leg-pair predicate: same product, same quantity, different contract
/// months, opposite directions, universal fields agree. Prices are not inspected here.
pub fn is_leg_pair(a: &Trade, b: &Trade) -> bool {
    a.product == b.product
        && a.quantity == b.quantity
        && a.contract_month != b.contract_month
        && a.side == b.side.opposite()
        && a.universal_agrees(b)
}

/// Spread flags must appear on both legs or on neither; a half-flagged pair is not a spread.
pub fn flags_consistent(a: &Trade, b: &Trade) -> bool {
    a.spread_flag.is_some() == b.spread_flag.is_some()
}

/// Trader-side spread leg pairs: the structural predicate, the quoted price pattern, and
/// consistent spread flags. Enumerated in deterministic scan order.
pub fn trader_leg_pairs<'a>(trades: &[&'a Trade]) -> Vec<LegPair<'a>> {
    let mut pairs = Vec::new();
    for (at, &a) in trades.iter().enumerate() {
        for &b in &trades[at + 1..] {
            if is_leg_pair(a, b) && flags_consistent(a, b) {
                let pair = LegPair::new(a, b);
                if pair.quoted_spread_price().is_some() {
                    pairs.push(pair);
                }
            }
        }
    }
    pairs
}

/// Recognition tier of an exchange-side leg pair, strongest first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum PairTier {
    /// Legs share a `deal_id`.
    DealId,
    /// Legs share an execution timestamp.
    Timestamp,
    /// Product + quantity grouping fallback.
    Grouped,
}

/// Exchange-side calendar leg pairs, tiered by recognition strength.
///
/// Tier A pairs legs sharing a `deal_id`; tier B pairs deal-free legs sharing an execution
/// timestamp; tier C is the product + quantity grouping fallback over deal-free legs. A leg
/// carrying a `deal_id` is only ever paired within its own deal - legs of two different deals
/// are never a pair. Exchange legs carry outright prices, so no price pattern applies.
pub fn exchange_leg_pairs<'a>(trades: &[&'a Trade]) -> Vec<(PairTier, LegPair<'a>)> {
    let mut pairs = Vec::new();
    let mut emitted: Vec<(SmolStr, SmolStr)> = Vec::new();

    let mut push = |tier: PairTier,
                    a: &'a Trade,
                    b: &'a Trade,
                    emitted: &mut Vec<(SmolStr, SmolStr)>| {
        let pair = LegPair::new(a, b);
        let key = (pair.early.id.0.clone(), pair.late.id.0.clone());
        if !emitted.contains(&key) {
            emitted.push(key);
            pairs.push((tier, pair));
        }
    };

    // Tier A: legs dealt together.
    let mut by_deal: IndexMap<SmolStr, Vec<&'a Trade>> = IndexMap::default();
    for &trade in trades {
        if let Some(deal_id) = &trade.deal_id {
            by_deal.entry(deal_id.clone()).or_default().push(trade);
        }
    }
    for group in by_deal.values() {
        for (at, &a) in group.iter().enumerate() {
            for &b in &group[at + 1..] {
                if is_leg_pair(a, b) {
                    push(PairTier::DealId, a, b, &mut emitted);
                }
            }
        }
    }

    let deal_free = |a: &Trade, b: &Trade| a.deal_id.is_none() && b.deal_id.is_none();

    // Tier B: deal-free legs executed at the same instant.
    for (at, &a) in trades.iter().enumerate() {
        for &b in &trades[at + 1..] {
            if deal_free(a, b)
                && a.executed_at.is_some()
                && a.executed_at == b.executed_at
                && is_leg_pair(a, b)
            {
                push(PairTier::Timestamp, a, b, &mut emitted);
            }
        }
    }

    // Tier C: structural fallback over deal-free legs.
    for (at, &a) in trades.iter().enumerate() {
        for &b in &trades[at + 1..] {
            if deal_free(a, b) && is_leg_pair(a, b) {
                push(PairTier::Grouped, a, b, &mut emitted);
            }
        }
    }

    pairs
}

/// Trader-side product-spread candidate pairs: different products, same contract month, same
/// quantity, opposite directions, universal fields agree. Orientation against the hyphenated
/// components is the caller's concern.
pub fn trader_product_pairs<'a>(trades: &[&'a Trade]) -> Vec<(&'a Trade, &'a Trade)> {
    let mut pairs = Vec::new();
    for (at, &a) in trades.iter().enumerate() {
        for &b in &trades[at + 1..] {
            if a.product != b.product
                && a.contract_month == b.contract_month
                && a.quantity == b.quantity
                && a.side == b.side.opposite()
                && a.universal_agrees(b)
            {
                pairs.push((a, b));
            }
        }
    }
    pairs
}

/// Orient a candidate pair against hyphenated spread components: the first returned leg
/// carries the first component's product, the second the second's.
pub fn orient_to_components<'a>(
    a: &'a Trade,
    b: &'a Trade,
    first: &ProductName,
    second: &ProductName,
) -> Option<(&'a Trade, &'a Trade)> {
    if a.product == *first && b.product == *second {
        Some((a, b))
    } else if b.product == *first && a.product == *second {
        Some((b, a))
    } else {
        None
    }
}

/// Hyphenated-spread direction semantics: selling `A-B` sells A and buys B; buying `A-B`
/// buys A and sells B. Returns the required (first, second) component directions.
pub fn spread_directions(exchange_side: Side) -> (Side, Side) {
    (exchange_side, exchange_side.opposite())
}
