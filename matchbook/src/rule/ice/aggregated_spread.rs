use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{
        RuleContext, RuleKind, RuleProcessor,
        aggregate::{AggregatedPosition, aggregate},
        field, matched_fields, snapshot,
        spread::trader_leg_pairs,
    },
};
use matchbook_trade::trade::{Trade, TradeSource};

/// R9 - aggregated calendar spread.
///
/// Phase 1 folds the exchange side into aggregated positions per (product, contract month,
/// price, buy/sell) plus universal fields; phase 2 applies the calendar-spread predicate to
/// those positions against a trader leg pair. At least one leg must aggregate two or more
/// fills - a plain pair is R2 territory.
#[derive(Debug, Copy, Clone, Default)]
pub struct AggregatedSpread;

impl RuleProcessor for AggregatedSpread {
    fn kind(&self) -> RuleKind {
        RuleKind::IceAggregatedSpread
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let trader_snapshot = snapshot(pool, TradeSource::Trader);
        let exchange_snapshot = snapshot(pool, TradeSource::Exchange);
        let trader_refs: Vec<&Trade> = trader_snapshot.iter().collect();

        let positions = aggregate(exchange_snapshot.iter());

        let mut results = Vec::new();
        for trader_pair in trader_leg_pairs(&trader_refs) {
            if !pool.is_available(TradeSource::Trader, &trader_pair.early.id)
                || !pool.is_available(TradeSource::Trader, &trader_pair.late.id)
            {
                continue;
            }
            let Some(quoted) = trader_pair.quoted_spread_price() else {
                continue;
            };

            'legs: for (at, early) in positions.iter().enumerate() {
                for late in &positions[at + 1..] {
                    let Some((early, late)) = orient_legs(early, late) else {
                        continue;
                    };
                    if early.len() + late.len() <= 2 {
                        continue;
                    }
                    if !legs_form_spread(early, late) {
                        continue;
                    }
                    if !legs_match_trader(early, late, &trader_pair.early, &trader_pair.late) {
                        continue;
                    }
                    if early.key.price - late.key.price != quoted {
                        continue;
                    }
                    let exchange_ids: Vec<_> =
                        early.ids().into_iter().chain(late.ids()).collect();
                    if exchange_ids
                        .iter()
                        .any(|id| !pool.is_available(TradeSource::Exchange, id))
                    {
                        continue;
                    }

                    let trader_ids =
                        vec![trader_pair.early.id.clone(), trader_pair.late.id.clone()];
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
                                    field::BUY_SELL,
                                    field::PRICE,
                                ]),
                            )
                            .with_audit(audit::SPREAD_PRICE, quoted)
                            .with_audit(audit::AGGREGATED_SUM, early.quantity),
                        );
                        break 'legs;
                    }
                }
            }
        }
        results
    }
}

/// Order two aggregated positions chronologically, rejecting equal months.
fn orient_legs<'a, 'b>(
    a: &'b AggregatedPosition<'a>,
    b: &'b AggregatedPosition<'a>,
) -> Option<(&'b AggregatedPosition<'a>, &'b AggregatedPosition<'a>)> {
    if a.key.month < b.key.month {
        Some((a, b))
    } else if b.key.month < a.key.month {
        Some((b, a))
    } else {
        None
    }
}

/// Aggregated positions form a spread when they agree on product, quantity and universal
/// fields with opposite directions.
fn legs_form_spread(early: &AggregatedPosition<'_>, late: &AggregatedPosition<'_>) -> bool {
    early.key.product == late.key.product
        && early.quantity == late.quantity
        && early.key.side == late.key.side.opposite()
        && early.key.universal == late.key.universal
}

fn legs_match_trader(
    early: &AggregatedPosition<'_>,
    late: &AggregatedPosition<'_>,
    trader_early: &Trade,
    trader_late: &Trade,
) -> bool {
    early.key.product == trader_early.product.0
        && early.quantity == trader_early.quantity
        && early.key.universal == trader_early.universal()
        && early.key.month == trader_early.contract_month
        && late.key.month == trader_late.contract_month
        && early.key.side == trader_early.side
        && late.key.side == trader_late.side
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeGroupConfig;
    use matchbook_trade::{Side, Unit, test_utils::trade};
    use rust_decimal_macros::dec;

    fn ctx(config: &ExchangeGroupConfig) -> RuleContext<'_> {
        RuleContext {
            spec: &config.rules[7],
            conversion: &config.conversion,
        }
    }

    #[test]
    fn test_aggregated_spread_matches_split_near_leg() {
        let config = ExchangeGroupConfig::ice();
        let t1 = trade("t-1", TradeSource::Trader, "380cst", "Jun-25", "20000", Unit::Mt, "16.50", Side::Sell);
        let t2 = trade("t-2", TradeSource::Trader, "380cst", "Jul-25", "20000", Unit::Mt, "0.00", Side::Buy);
        // The near leg arrives as two clearing fills at one price.
        let fills = vec![
            trade("e-1", TradeSource::Exchange, "380cst", "Jun-25", "12000", Unit::Mt, "425.50", Side::Sell),
            trade("e-2", TradeSource::Exchange, "380cst", "Jun-25", "8000", Unit::Mt, "425.50", Side::Sell),
            trade("e-3", TradeSource::Exchange, "380cst", "Jul-25", "20000", Unit::Mt, "409.00", Side::Buy),
        ];

        let mut pool = UnmatchedPool::new(vec![t1, t2], fills);
        let results = AggregatedSpread.apply(&mut pool, &ctx(&config));

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.trader_ids.len(), 2);
        assert_eq!(result.exchange_ids.len(), 3);
        assert_eq!(result.audit["spread_price"], dec!(16.50));
        assert_eq!(result.audit["aggregated_sum"], dec!(20000));
        assert_eq!(pool.available_len(TradeSource::Exchange), 0);
    }

    #[test]
    fn test_aggregated_spread_leaves_plain_pairs_to_calendar_rule() {
        let config = ExchangeGroupConfig::ice();
        let t1 = trade("t-1", TradeSource::Trader, "380cst", "Jun-25", "20000", Unit::Mt, "16.50", Side::Sell);
        let t2 = trade("t-2", TradeSource::Trader, "380cst", "Jul-25", "20000", Unit::Mt, "0.00", Side::Buy);
        let e1 = trade("e-1", TradeSource::Exchange, "380cst", "Jun-25", "20000", Unit::Mt, "425.50", Side::Sell);
        let e2 = trade("e-2", TradeSource::Exchange, "380cst", "Jul-25", "20000", Unit::Mt, "409.00", Side::Buy);

        let mut pool = UnmatchedPool::new(vec![t1, t2], vec![e1, e2]);
        assert!(AggregatedSpread.apply(&mut pool, &ctx(&config)).is_empty());
        assert_eq!(pool.available_len(TradeSource::Exchange), 2);
    }

    #[test]
    fn test_aggregated_spread_requires_exact_differential() {
        let config = ExchangeGroupConfig::ice();
        let t1 = trade("t-1", TradeSource::Trader, "380cst", "Jun-25", "20000", Unit::Mt, "16.00", Side::Sell);
        let t2 = trade("t-2", TradeSource::Trader, "380cst", "Jul-25", "20000", Unit::Mt, "0.00", Side::Buy);
        let fills = vec![
            trade("e-1", TradeSource::Exchange, "380cst", "Jun-25", "12000", Unit::Mt, "425.50", Side::Sell),
            trade("e-2", TradeSource::Exchange, "380cst", "Jun-25", "8000", Unit::Mt, "425.50", Side::Sell),
            trade("e-3", TradeSource::Exchange, "380cst", "Jul-25", "20000", Unit::Mt, "409.00", Side::Buy),
        ];

        let mut pool = UnmatchedPool::new(vec![t1, t2], fills);
        assert!(AggregatedSpread.apply(&mut pool, &ctx(&config)).is_empty());
    }
}
