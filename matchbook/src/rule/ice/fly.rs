use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{RuleContext, RuleKind, RuleProcessor, field, matched_fields, snapshot},
};
use indexmap::IndexMap;
use itertools::Itertools;
use matchbook_trade::trade::{Trade, TradeSource, UniversalFields};
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// R6 - fly / butterfly.
///
/// Three spread-flagged trader records whose chronologically ordered quantities are
/// (X, Y, Z) with X + Z = Y and directions (d, not-d, d), against three exchange records
/// sharing a `deal_id` and mirroring the month/quantity/direction slots. The algebraic
/// prediction `(price(X) - price(Y)) + (price(Z) - price(Y))` must equal the trader's fly
/// price exactly; trader legs conventionally quote `{fly, 0, 0}` on the earliest leg.
#[derive(Debug, Copy, Clone, Default)]
pub struct Fly;

impl RuleProcessor for Fly {
    fn kind(&self) -> RuleKind {
        RuleKind::IceFly
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let trader_snapshot = snapshot(pool, TradeSource::Trader);
        let exchange_snapshot = snapshot(pool, TradeSource::Exchange);

        // Exchange wings grouped by deal id.
        let mut by_deal: IndexMap<SmolStr, Vec<&Trade>> = IndexMap::default();
        for trade in &exchange_snapshot {
            if let Some(deal_id) = &trade.deal_id {
                by_deal.entry(deal_id.clone()).or_default().push(trade);
            }
        }

        let mut results = Vec::new();
        for (_, group) in trader_groups(&trader_snapshot) {
            for combo in group.iter().combinations(3) {
                let mut legs = [*combo[0], *combo[1], *combo[2]];
                legs.sort_by_key(|leg| leg.contract_month);
                let [first, middle, last] = legs;

                let Some(fly) = fly_shape(first, middle, last) else {
                    continue;
                };
                if legs.iter().any(|leg| !pool.is_available(TradeSource::Trader, &leg.id)) {
                    continue;
                }

                'deals: for wings in by_deal.values() {
                    for exchange_combo in wings.iter().combinations(3) {
                        let mut mirror = [*exchange_combo[0], *exchange_combo[1], *exchange_combo[2]];
                        mirror.sort_by_key(|leg| leg.contract_month);
                        let [e1, e2, e3] = mirror;

                        if !slots_mirror(&legs, &mirror) {
                            continue;
                        }
                        let prediction = (e1.price - e2.price) + (e3.price - e2.price);
                        if prediction != fly {
                            continue;
                        }
                        if mirror
                            .iter()
                            .any(|leg| !pool.is_available(TradeSource::Exchange, &leg.id))
                        {
                            continue;
                        }

                        let trader_ids =
                            vec![first.id.clone(), middle.id.clone(), last.id.clone()];
                        let exchange_ids = vec![e1.id.clone(), e2.id.clone(), e3.id.clone()];
                        if pool.claim(&trader_ids, &exchange_ids) {
                            results.push(
                                MatchResult::new(
                                    self.kind(),
                                    ctx.confidence(),
                                    trader_ids,
                                    exchange_ids,
                                    matched_fields(&[
                                        field::PRODUCT,
                                        field::CONTRACT_MONTH,
                                        field::QUANTITY,
                                        field::PRICE,
                                        field::BUY_SELL,
                                    ]),
                                )
                                .with_audit(audit::FLY_PRICE, prediction),
                            );
                            break 'deals;
                        }
                    }
                }
            }
        }
        results
    }
}

/// Spread-flagged trader records grouped by (product, universal fields), insertion-ordered.
fn trader_groups(trades: &[Trade]) -> IndexMap<(SmolStr, UniversalFields), Vec<&Trade>> {
    let mut groups: IndexMap<(SmolStr, UniversalFields), Vec<&Trade>> = IndexMap::default();
    for trade in trades {
        if trade.spread_flag.is_some() {
            groups
                .entry((trade.product.0.clone(), trade.universal()))
                .or_default()
                .push(trade);
        }
    }
    groups
}

/// Validate the month-ordered trader legs as a fly and return its quoted price.
///
/// Quantities (X, Y, Z) with X + Z = Y, directions (d, not-d, d), distinct months, and the
/// `{fly, 0, 0}` quote convention on the earliest leg.
fn fly_shape(first: &Trade, middle: &Trade, last: &Trade) -> Option<Decimal> {
    let distinct_months = first.contract_month != middle.contract_month
        && middle.contract_month != last.contract_month;
    let wings_balance = first.quantity + last.quantity == middle.quantity;
    let directions = first.side == last.side && middle.side == first.side.opposite();
    let quote_convention = middle.price.is_zero() && last.price.is_zero();

    (distinct_months && wings_balance && directions && quote_convention).then_some(first.price)
}

/// Slot-by-slot mirror: same product, month, quantity, direction and universal fields.
fn slots_mirror(trader: &[&Trade; 3], exchange: &[&Trade; 3]) -> bool {
    trader.iter().zip(exchange).all(|(t, e)| {
        t.product == e.product
            && t.contract_month == e.contract_month
            && t.quantity == e.quantity
            && t.side == e.side
            && t.universal_agrees(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeGroupConfig;
    use matchbook_trade::{Side, Unit, test_utils::trade};
    use rust_decimal_macros::dec;

    fn ctx(config: &ExchangeGroupConfig) -> RuleContext<'_> {
        RuleContext {
            spec: &config.rules[5],
            conversion: &config.conversion,
        }
    }

    fn trader_leg(id: &str, month: &str, quantity: &str, price: &str, side: Side) -> Trade {
        let mut leg = trade(id, TradeSource::Trader, "marine 0.5%", month, quantity, Unit::Mt, price, side);
        leg.spread_flag = Some("S".into());
        leg
    }

    fn exchange_leg(id: &str, month: &str, quantity: &str, price: &str, side: Side) -> Trade {
        let mut leg = trade(id, TradeSource::Exchange, "marine 0.5%", month, quantity, Unit::Mt, price, side);
        leg.deal_id = Some("D-1".into());
        leg
    }

    fn seed_pool() -> UnmatchedPool {
        UnmatchedPool::new(
            vec![
                trader_leg("t-1", "Oct-25", "5000", "0.00", Side::Buy),
                trader_leg("t-2", "Nov-25", "10000", "0.00", Side::Sell),
                trader_leg("t-3", "Dec-25", "5000", "0.00", Side::Buy),
            ],
            vec![
                exchange_leg("e-1", "Oct-25", "5000", "485.00", Side::Buy),
                exchange_leg("e-2", "Nov-25", "10000", "482.25", Side::Sell),
                exchange_leg("e-3", "Dec-25", "5000", "479.50", Side::Buy),
            ],
        )
    }

    #[test]
    fn test_fly_matches_three_plus_three() {
        let config = ExchangeGroupConfig::ice();
        let mut pool = seed_pool();
        let results = Fly.apply(&mut pool, &ctx(&config));

        // (485.00 - 482.25) + (479.50 - 482.25) = 0.00 = quoted fly.
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.trader_ids.len(), 3);
        assert_eq!(result.exchange_ids.len(), 3);
        assert_eq!(result.audit["fly_price"], dec!(0));
        assert_eq!(pool.available_len(TradeSource::Trader), 0);
        assert_eq!(pool.available_len(TradeSource::Exchange), 0);
    }

    #[test]
    fn test_fly_rejects_price_prediction_mismatch() {
        let config = ExchangeGroupConfig::ice();
        let pool = seed_pool();
        let mut exchange = snapshot(&pool, TradeSource::Exchange);
        // (485.00 - 482.25) + (479.75 - 482.25) = 0.25 != 0.00.
        exchange[2].price = dec!(479.75);
        let mut pool = UnmatchedPool::new(snapshot(&pool, TradeSource::Trader), exchange);

        assert!(Fly.apply(&mut pool, &ctx(&config)).is_empty());
    }

    #[test]
    fn test_fly_rejects_unbalanced_wings() {
        let config = ExchangeGroupConfig::ice();
        let pool = seed_pool();
        let mut trader = snapshot(&pool, TradeSource::Trader);
        trader[0].quantity = dec!(4000);
        let mut pool = UnmatchedPool::new(trader, snapshot(&pool, TradeSource::Exchange));

        assert!(Fly.apply(&mut pool, &ctx(&config)).is_empty());
    }

    #[test]
    fn test_fly_requires_spread_flags() {
        let config = ExchangeGroupConfig::ice();
        let pool = seed_pool();
        let mut trader = snapshot(&pool, TradeSource::Trader);
        trader[1].spread_flag = None;
        let mut pool = UnmatchedPool::new(trader, snapshot(&pool, TradeSource::Exchange));

        assert!(Fly.apply(&mut pool, &ctx(&config)).is_empty());
    }
}
