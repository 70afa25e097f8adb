use indexmap::IndexMap;
use matchbook_trade::{
    Side, Unit,
    month::ContractMonth,
    trade::{Trade, TradeId, UniversalFields},
};
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// Grouping key for aggregation: every matching attribute except quantity.
///
/// Records sharing a key are interchangeable fills of one position; their quantities sum
/// exactly in decimal.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct AggKey {
    pub product: SmolStr,
    pub month: ContractMonth,
    pub price: Decimal,
    pub side: Side,
    pub unit: Unit,
    pub universal: UniversalFields,
}

impl AggKey {
    pub fn of(trade: &Trade) -> Self {
        Self {
            product: trade.product.0.clone(),
            month: trade.contract_month,
            price: trade.price,
            side: trade.side,
            unit: trade.unit,
            universal: trade.universal(),
        }
    }
}

/// N records with identical key fields folded into a single virtual position, for matching
/// purposes only.
#[derive(Debug, Clone)]
pub struct AggregatedPosition<'a> {
    pub key: AggKey,
    pub quantity: Decimal,
    pub trades: Vec<&'a Trade>,
}

impl AggregatedPosition<'_> {
    pub fn ids(&self) -> Vec<TradeId> {
        self.trades.iter().map(|trade| trade.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

/// Fold records into aggregated positions, preserving first-seen order of both groups and
/// members.
pub fn aggregate<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Vec<AggregatedPosition<'a>> {
    let mut groups: IndexMap<AggKey, AggregatedPosition<'a>> = IndexMap::default();
    for trade in trades {
        let position = groups
            .entry(AggKey::of(trade))
            .or_insert_with_key(|key| AggregatedPosition {
                key: key.clone(),
                quantity: Decimal::ZERO,
                trades: Vec::new(),
            });
        position.quantity += trade.quantity;
        position.trades.push(trade);
    }
    groups.into_values().collect()
}
