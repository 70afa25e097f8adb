use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{
        RuleContext, RuleKind, RuleProcessor, field, matched_fields, snapshot,
        spread::{LegPair, exchange_leg_pairs, trader_leg_pairs},
    },
};
use matchbook_trade::trade::{Trade, TradeSource};

/// R2 - calendar spread.
///
/// A trader leg pair (quoted spread price on one leg) against an exchange leg pair carrying
/// outright prices. Exchange pairs are recognised tier-wise: shared `deal_id`, shared
/// execution timestamp, then the product + quantity grouping fallback. The match predicate
/// aligns months and directions leg-by-leg and requires
/// `price(early) - price(late) == quoted` on the exchange side.
#[derive(Debug, Copy, Clone, Default)]
pub struct CalendarSpread;

impl RuleProcessor for CalendarSpread {
    fn kind(&self) -> RuleKind {
        RuleKind::IceCalendarSpread
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        scan(self.kind(), pool, ctx)
    }
}

/// Shared calendar-spread scan; SGX's S2 applies the same semantics under its own rule id.
pub(crate) fn scan(
    kind: RuleKind,
    pool: &mut UnmatchedPool,
    ctx: &RuleContext<'_>,
) -> Vec<MatchResult> {
    let trader_snapshot = snapshot(pool, TradeSource::Trader);
    let exchange_snapshot = snapshot(pool, TradeSource::Exchange);
    let trader_refs: Vec<&Trade> = trader_snapshot.iter().collect();
    let exchange_refs: Vec<&Trade> = exchange_snapshot.iter().collect();

    let exchange_pairs = exchange_leg_pairs(&exchange_refs);

    let mut results = Vec::new();
    for trader_pair in trader_leg_pairs(&trader_refs) {
        if !pair_available(pool, TradeSource::Trader, &trader_pair) {
            continue;
        }
        let Some(quoted) = trader_pair.quoted_spread_price() else {
            continue;
        };

        for (_, exchange_pair) in &exchange_pairs {
            if !pair_available(pool, TradeSource::Exchange, exchange_pair) {
                continue;
            }
            if !pairs_compatible(&trader_pair, exchange_pair) {
                continue;
            }
            if exchange_pair.price_differential() != quoted {
                continue;
            }

            let trader_ids = vec![trader_pair.early.id.clone(), trader_pair.late.id.clone()];
            let exchange_ids = vec![
                exchange_pair.early.id.clone(),
                exchange_pair.late.id.clone(),
            ];
            if pool.claim(&trader_ids, &exchange_ids) {
                results.push(
                    MatchResult::new(
                        kind,
                        ctx.confidence(),
                        trader_ids,
                        exchange_ids,
                        matched_fields(&[
                            field::PRODUCT,
                            field::CONTRACT_MONTH,
                            field::QUANTITY,
                            field::BUY_SELL,
                            field::PRICE,
                        ]),
                    )
                    .with_audit(audit::SPREAD_PRICE, quoted),
                );
                break;
            }
        }
    }
    results
}

fn pair_available(pool: &UnmatchedPool, source: TradeSource, pair: &LegPair<'_>) -> bool {
    pool.is_available(source, &pair.early.id) && pool.is_available(source, &pair.late.id)
}

/// Cross-side compatibility: same product, quantity and universal fields, months aligned
/// early-to-early, directions aligned leg-by-leg.
fn pairs_compatible(trader: &LegPair<'_>, exchange: &LegPair<'_>) -> bool {
    trader.early.product == exchange.early.product
        && trader.early.quantity == exchange.early.quantity
        && trader.early.universal_agrees(exchange.early)
        && trader.months() == exchange.months()
        && trader.early.side == exchange.early.side
        && trader.late.side == exchange.late.side
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ExchangeGroupConfig, rule::RuleContext};
    use matchbook_trade::{Side, Unit, test_utils::trade};
    use rust_decimal_macros::dec;

    fn ctx(config: &ExchangeGroupConfig) -> RuleContext<'_> {
        RuleContext {
            spec: &config.rules[1],
            conversion: &config.conversion,
        }
    }

    fn seed_pool() -> UnmatchedPool {
        let t1 = trade("t-1", TradeSource::Trader, "380cst", "Jun-25", "20000", Unit::Mt, "16.50", Side::Sell);
        let t2 = trade("t-2", TradeSource::Trader, "380cst", "Jul-25", "20000", Unit::Mt, "0.00", Side::Buy);
        let mut e1 = trade("e-1", TradeSource::Exchange, "380cst", "Jun-25", "20000", Unit::Mt, "425.50", Side::Sell);
        let mut e2 = trade("e-2", TradeSource::Exchange, "380cst", "Jul-25", "20000", Unit::Mt, "409.00", Side::Buy);
        e1.deal_id = Some("X".into());
        e2.deal_id = Some("X".into());
        UnmatchedPool::new(vec![t1, t2], vec![e1, e2])
    }

    #[test]
    fn test_calendar_spread_matches_deal_linked_legs() {
        let config = ExchangeGroupConfig::ice();
        let mut pool = seed_pool();
        let results = scan(RuleKind::IceCalendarSpread, &mut pool, &ctx(&config));

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.trader_ids, vec!["t-1".into(), "t-2".into()]);
        assert_eq!(result.exchange_ids, vec!["e-1".into(), "e-2".into()]);
        assert_eq!(result.audit["spread_price"], dec!(16.50));
        assert_eq!(pool.available_len(TradeSource::Trader), 0);
        assert_eq!(pool.available_len(TradeSource::Exchange), 0);
    }

    #[test]
    fn test_calendar_spread_rejects_wrong_differential() {
        let config = ExchangeGroupConfig::ice();
        let pool = seed_pool();
        // 425.50 - 410.00 = 15.50 != 16.50.
        let mut exchange = snapshot(&pool, TradeSource::Exchange);
        exchange[1].price = dec!(410.00);
        let mut pool = UnmatchedPool::new(snapshot(&pool, TradeSource::Trader), exchange);

        assert!(scan(RuleKind::IceCalendarSpread, &mut pool, &ctx(&config)).is_empty());
        assert_eq!(pool.available_len(TradeSource::Trader), 2);
    }

    #[test]
    fn test_zero_priced_spread_requires_zero_differential() {
        let config = ExchangeGroupConfig::ice();
        let t1 = trade("t-1", TradeSource::Trader, "380cst", "Jun-25", "20000", Unit::Mt, "0.00", Side::Sell);
        let t2 = trade("t-2", TradeSource::Trader, "380cst", "Jul-25", "20000", Unit::Mt, "0.00", Side::Buy);
        let mut e1 = trade("e-1", TradeSource::Exchange, "380cst", "Jun-25", "20000", Unit::Mt, "410.00", Side::Sell);
        let mut e2 = trade("e-2", TradeSource::Exchange, "380cst", "Jul-25", "20000", Unit::Mt, "409.00", Side::Buy);
        e1.deal_id = Some("X".into());
        e2.deal_id = Some("X".into());

        let mut pool = UnmatchedPool::new(vec![t1.clone(), t2.clone()], vec![e1.clone(), e2.clone()]);
        assert!(scan(RuleKind::IceCalendarSpread, &mut pool, &ctx(&config)).is_empty());

        // Flat exchange legs: differential zero, spread matches.
        e1.price = dec!(409.00);
        let mut pool = UnmatchedPool::new(vec![t1, t2], vec![e1, e2]);
        let results = scan(RuleKind::IceCalendarSpread, &mut pool, &ctx(&config));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].audit["spread_price"], dec!(0));
    }
}
