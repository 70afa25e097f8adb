use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{
        RuleContext, RuleKind, RuleProcessor,
        aggregate::aggregate,
        field, ice::BRENT_SWAP, matched_fields, snapshot,
    },
};
use matchbook_trade::{
    Unit,
    trade::{Trade, TradeSource},
};

/// R8 - aggregated complex crack.
///
/// R4 with the base-product side replaced by an aggregated group: several exchange base fills
/// with identical price, direction, month and universal fields stand in for the single base
/// leg, their exact sum playing the base quantity in R4's predicate. The brent leg stays
/// singular.
#[derive(Debug, Copy, Clone, Default)]
pub struct AggregatedComplexCrack;

impl RuleProcessor for AggregatedComplexCrack {
    fn kind(&self) -> RuleKind {
        RuleKind::IceAggregatedComplexCrack
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let trader_snapshot = snapshot(pool, TradeSource::Trader);
        let exchange_snapshot = snapshot(pool, TradeSource::Exchange);

        let mut results = Vec::new();
        for trader in trader_snapshot
            .iter()
            .filter(|t| t.product.is_crack() && t.unit == Unit::Mt)
        {
            if !pool.is_available(TradeSource::Trader, &trader.id) {
                continue;
            }

            let ratio = ctx.conversion.ratio(&trader.product);
            let base_fills = exchange_snapshot.iter().filter(|e| {
                e.product == trader.base_product
                    && e.contract_month == trader.contract_month
                    && e.unit == Unit::Mt
                    && e.side == trader.side
                    && e.universal_agrees(trader)
            });
            let brents: Vec<&Trade> = exchange_snapshot
                .iter()
                .filter(|e| {
                    e.product.as_str() == BRENT_SWAP
                        && e.contract_month == trader.contract_month
                        && e.unit == Unit::Bbl
                        && e.side == trader.side.opposite()
                        && e.universal_agrees(trader)
                        && ctx.conversion.quantities_match(
                            trader.quantity,
                            e.quantity,
                            &trader.product,
                            ctx.tolerance_bbl(),
                        )
                })
                .collect();

            'positions: for position in aggregate(base_fills) {
                if position.len() < 2 {
                    continue;
                }
                if (position.quantity - trader.quantity).abs() > ctx.tolerance_mt() {
                    continue;
                }
                if position
                    .trades
                    .iter()
                    .any(|fill| !pool.is_available(TradeSource::Exchange, &fill.id))
                {
                    continue;
                }

                for brent in &brents {
                    if position.key.price != ratio * (brent.price + trader.price) {
                        continue;
                    }
                    if !pool.is_available(TradeSource::Exchange, &brent.id) {
                        continue;
                    }

                    let trader_ids = vec![trader.id.clone()];
                    let mut exchange_ids = position.ids();
                    exchange_ids.push(brent.id.clone());
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
                            .with_audit(audit::AGGREGATED_SUM, position.quantity)
                            .with_audit(
                                audit::CRACK_PRICE,
                                position.key.price / ratio - brent.price,
                            ),
                        );
                        break 'positions;
                    }
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeGroupConfig;
    use matchbook_trade::{Side, test_utils::trade};
    use rust_decimal_macros::dec;

    fn ctx(config: &ExchangeGroupConfig) -> RuleContext<'_> {
        RuleContext {
            spec: &config.rules[10],
            conversion: &config.conversion,
        }
    }

    fn seed_pool() -> UnmatchedPool {
        let crack = trade("t-1", TradeSource::Trader, "380cst crack", "Jun-25", "2000", Unit::Mt, "3.35", Side::Sell);
        let fills = vec![
            trade("e-1", TradeSource::Exchange, "380cst", "Jun-25", "1200", Unit::Mt, "427.99", Side::Sell),
            trade("e-2", TradeSource::Exchange, "380cst", "Jun-25", "800", Unit::Mt, "427.99", Side::Sell),
            trade("e-3", TradeSource::Exchange, "brent swap", "Jun-25", "13000", Unit::Bbl, "64.05", Side::Buy),
        ];
        UnmatchedPool::new(vec![crack], fills)
    }

    #[test]
    fn test_aggregated_complex_crack_matches_one_plus_three() {
        let config = ExchangeGroupConfig::ice();
        let mut pool = seed_pool();
        let results = AggregatedComplexCrack.apply(&mut pool, &ctx(&config));

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.trader_ids, vec!["t-1".into()]);
        assert_eq!(
            result.exchange_ids,
            vec!["e-1".into(), "e-2".into(), "e-3".into()]
        );
        assert_eq!(result.audit["aggregated_sum"], dec!(2000));
        assert_eq!(result.audit["crack_price"], dec!(3.35));
        assert_eq!(pool.available_len(TradeSource::Exchange), 0);
    }

    #[test]
    fn test_aggregated_complex_crack_requires_uniform_fill_price() {
        let config = ExchangeGroupConfig::ice();
        let pool = seed_pool();
        let mut exchange = snapshot(&pool, TradeSource::Exchange);
        // A fill at a different price splits the aggregate; neither group reaches the
        // trader quantity.
        exchange[1].price = dec!(428.00);
        let mut pool = UnmatchedPool::new(snapshot(&pool, TradeSource::Trader), exchange);

        assert!(AggregatedComplexCrack.apply(&mut pool, &ctx(&config)).is_empty());
    }
}
