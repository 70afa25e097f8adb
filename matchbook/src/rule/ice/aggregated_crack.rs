use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{
        RuleContext, RuleKind, RuleProcessor,
        aggregate::aggregate,
        field, matched_fields, snapshot,
    },
};
use matchbook_trade::{
    Unit,
    trade::{Trade, TradeSource},
};

/// R11 - aggregated crack.
///
/// R3 with the many side aggregated: a single MT crack record on one side against two or more
/// BBL fills on the other (or the mirror), accepted when the aggregated BBL sum sits within
/// the configured tolerance of the converted MT quantity. Key fields (product, month, price,
/// buy/sell, universal) must agree exactly, as in R3.
#[derive(Debug, Copy, Clone, Default)]
pub struct AggregatedCrack;

impl RuleProcessor for AggregatedCrack {
    fn kind(&self) -> RuleKind {
        RuleKind::IceAggregatedCrack
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let mut results = Vec::new();
        scan_direction(self.kind(), pool, ctx, TradeSource::Exchange, &mut results);
        scan_direction(self.kind(), pool, ctx, TradeSource::Trader, &mut results);
        results
    }
}

/// One direction of the bidirectional scan: `many_side` holds the aggregated BBL fills, the
/// other side the single MT record.
fn scan_direction(
    kind: RuleKind,
    pool: &mut UnmatchedPool,
    ctx: &RuleContext<'_>,
    many_side: TradeSource,
    results: &mut Vec<MatchResult>,
) {
    let single_side = match many_side {
        TradeSource::Trader => TradeSource::Exchange,
        TradeSource::Exchange => TradeSource::Trader,
    };
    let many_snapshot = snapshot(pool, many_side);
    let single_snapshot = snapshot(pool, single_side);

    for single in single_snapshot
        .iter()
        .filter(|t| t.product.is_crack() && t.unit == Unit::Mt)
    {
        if !pool.is_available(single_side, &single.id) {
            continue;
        }

        let fills = many_snapshot
            .iter()
            .filter(|f| f.unit == Unit::Bbl && crack_key_agrees(single, f));
        for position in aggregate(fills) {
            if position.len() < 2 {
                continue;
            }
            if !ctx.conversion.quantities_match(
                single.quantity,
                position.quantity,
                &single.product,
                ctx.tolerance_bbl(),
            ) {
                continue;
            }
            if position
                .trades
                .iter()
                .any(|fill| !pool.is_available(many_side, &fill.id))
            {
                continue;
            }

            let single_ids = vec![single.id.clone()];
            let many_ids = position.ids();
            let (trader_ids, exchange_ids) = match many_side {
                TradeSource::Trader => (many_ids, single_ids),
                TradeSource::Exchange => (single_ids, many_ids),
            };

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
                            field::PRICE,
                            field::BUY_SELL,
                        ]),
                    )
                    .with_audit(audit::AGGREGATED_SUM, position.quantity)
                    .with_audit(
                        audit::CONVERTED_BBL,
                        ctx.conversion.to_bbl(single.quantity, Unit::Mt, &single.product),
                    ),
                );
                break;
            }
        }
    }
}

fn crack_key_agrees(single: &Trade, fill: &Trade) -> bool {
    single.product == fill.product
        && single.contract_month == fill.contract_month
        && single.side == fill.side
        && single.price == fill.price
        && single.universal_agrees(fill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeGroupConfig;
    use matchbook_trade::{Side, test_utils::trade};
    use rust_decimal_macros::dec;

    fn ctx(config: &ExchangeGroupConfig) -> RuleContext<'_> {
        RuleContext {
            spec: &config.rules[8],
            conversion: &config.conversion,
        }
    }

    #[test]
    fn test_aggregated_crack_sums_exchange_fills() {
        let config = ExchangeGroupConfig::ice();
        // 2520 MT x 6.35 = 16002 BBL; fills sum to 16000, within the 500 BBL tolerance.
        let trader = trade("t-1", TradeSource::Trader, "marine 0.5% crack", "Jul-25", "2520", Unit::Mt, "11.95", Side::Sell);
        let fills = vec![
            trade("e-1", TradeSource::Exchange, "marine 0.5% crack", "Jul-25", "10000", Unit::Bbl, "11.95", Side::Sell),
            trade("e-2", TradeSource::Exchange, "marine 0.5% crack", "Jul-25", "6000", Unit::Bbl, "11.95", Side::Sell),
        ];

        let mut pool = UnmatchedPool::new(vec![trader], fills);
        let results = AggregatedCrack.apply(&mut pool, &ctx(&config));

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.trader_ids, vec!["t-1".into()]);
        assert_eq!(result.exchange_ids.len(), 2);
        assert_eq!(result.audit["aggregated_sum"], dec!(16000));
        assert_eq!(result.audit["converted_bbl"], dec!(16002.00));
    }

    #[test]
    fn test_aggregated_crack_mirror_direction() {
        let config = ExchangeGroupConfig::ice();
        let clips = vec![
            trade("t-1", TradeSource::Trader, "380cst crack", "Jun-25", "8000", Unit::Bbl, "3.35", Side::Buy),
            trade("t-2", TradeSource::Trader, "380cst crack", "Jun-25", "4700", Unit::Bbl, "3.35", Side::Buy),
        ];
        // 2000 MT x 6.35 = 12700 BBL, matching the 12700 BBL trader sum exactly.
        let exchange = trade("e-1", TradeSource::Exchange, "380cst crack", "Jun-25", "2000", Unit::Mt, "3.35", Side::Buy);

        let mut pool = UnmatchedPool::new(clips, vec![exchange]);
        let results = AggregatedCrack.apply(&mut pool, &ctx(&config));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].trader_ids.len(), 2);
        assert_eq!(results[0].exchange_ids, vec!["e-1".into()]);
    }

    #[test]
    fn test_aggregated_crack_rejects_outside_tolerance() {
        let config = ExchangeGroupConfig::ice();
        let trader = trade("t-1", TradeSource::Trader, "marine 0.5% crack", "Jul-25", "2520", Unit::Mt, "11.95", Side::Sell);
        // Sum 15000 is 1002 BBL short of the converted 16002.
        let fills = vec![
            trade("e-1", TradeSource::Exchange, "marine 0.5% crack", "Jul-25", "10000", Unit::Bbl, "11.95", Side::Sell),
            trade("e-2", TradeSource::Exchange, "marine 0.5% crack", "Jul-25", "5000", Unit::Bbl, "11.95", Side::Sell),
        ];

        let mut pool = UnmatchedPool::new(vec![trader], fills);
        assert!(AggregatedCrack.apply(&mut pool, &ctx(&config)).is_empty());
    }
}
