use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{
        RuleContext, RuleKind, RuleProcessor,
        aggregate::{AggKey, aggregate},
        field, matched_fields, snapshot,
    },
};
use matchbook_trade::trade::{TradeId, TradeSource};

/// R7 - quantity aggregation, bidirectional.
///
/// Groups one side by (product, contract month, price, buy/sell, unit) plus the universal
/// fields; a group of two or more records whose quantities sum exactly to a single record on
/// the other side with equal key fields matches many-to-one. Trader-side groups probe first,
/// then exchange-side groups.
#[derive(Debug, Copy, Clone, Default)]
pub struct Aggregation;

impl RuleProcessor for Aggregation {
    fn kind(&self) -> RuleKind {
        RuleKind::IceAggregation
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let mut results = Vec::new();
        scan_direction(self.kind(), pool, ctx, TradeSource::Trader, &mut results);
        scan_direction(self.kind(), pool, ctx, TradeSource::Exchange, &mut results);
        results
    }
}

fn scan_direction(
    kind: RuleKind,
    pool: &mut UnmatchedPool,
    ctx: &RuleContext<'_>,
    many_side: TradeSource,
    results: &mut Vec<MatchResult>,
) {
    let one_side = match many_side {
        TradeSource::Trader => TradeSource::Exchange,
        TradeSource::Exchange => TradeSource::Trader,
    };
    let many_snapshot = snapshot(pool, many_side);
    let one_snapshot = snapshot(pool, one_side);

    for position in aggregate(many_snapshot.iter()) {
        if position.len() < 2 {
            continue;
        }
        if position
            .trades
            .iter()
            .any(|member| !pool.is_available(many_side, &member.id))
        {
            continue;
        }

        for single in &one_snapshot {
            if AggKey::of(single) != position.key || single.quantity != position.quantity {
                continue;
            }
            if !pool.is_available(one_side, &single.id) {
                continue;
            }

            let many_ids = position.ids();
            let single_ids = vec![single.id.clone()];
            let (trader_ids, exchange_ids): (Vec<TradeId>, Vec<TradeId>) = match many_side {
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
                            field::UNIT,
                        ]),
                    )
                    .with_audit(audit::AGGREGATED_SUM, position.quantity),
                );
                break;
            }
        }
    }
}
