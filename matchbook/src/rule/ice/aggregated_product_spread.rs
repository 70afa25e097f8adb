use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{
        RuleContext, RuleKind, RuleProcessor,
        aggregate::{AggregatedPosition, aggregate},
        field, matched_fields, snapshot,
        spread::{orient_to_components, spread_directions, trader_product_pairs},
    },
};
use matchbook_trade::{
    product::ProductName,
    trade::{Trade, TradeId, TradeSource},
};
use rust_decimal::Decimal;

/// R13 - aggregated product spread.
///
/// Four tiers, all with exact aggregated sums and R5's direction semantics:
/// * T1 - exchange component fills aggregate per component against one trader leg pair;
/// * T2 - one hyphenated exchange spread against trader fills aggregating per component;
/// * T3 - trader leg pairs aggregating across pairs against individual exchange component
///   records;
/// * T4 - identical hyphenated exchange spreads aggregating against one trader leg pair.
#[derive(Debug, Copy, Clone, Default)]
pub struct AggregatedProductSpread;

impl RuleProcessor for AggregatedProductSpread {
    fn kind(&self) -> RuleKind {
        RuleKind::IceAggregatedProductSpread
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let mut results = Vec::new();
        scan_tier1(self.kind(), pool, ctx, &mut results);
        scan_tier2(self.kind(), pool, ctx, &mut results);
        scan_tier3(self.kind(), pool, ctx, &mut results);
        scan_tier4(self.kind(), pool, ctx, &mut results);
        results
    }
}

fn result(
    kind: RuleKind,
    ctx: &RuleContext<'_>,
    trader_ids: Vec<TradeId>,
    exchange_ids: Vec<TradeId>,
    spread_price: Decimal,
    aggregated_sum: Decimal,
) -> MatchResult {
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
    .with_audit(audit::SPREAD_PRICE, spread_price)
    .with_audit(audit::AGGREGATED_SUM, aggregated_sum)
}

/// A component aggregate standing in for one leg: same product, month, direction and
/// universal fields, exact quantity.
fn component_position<'a, 'b>(
    positions: &'b [AggregatedPosition<'a>],
    leg: &Trade,
) -> Option<&'b AggregatedPosition<'a>> {
    positions.iter().find(|position| {
        position.key.product == leg.product.0
            && position.key.month == leg.contract_month
            && position.key.side == leg.side
            && position.key.universal == leg.universal()
            && position.quantity == leg.quantity
    })
}

fn position_available(pool: &UnmatchedPool, source: TradeSource, position: &AggregatedPosition<'_>) -> bool {
    position
        .trades
        .iter()
        .all(|member| pool.is_available(source, &member.id))
}

/// T1: exchange component fills aggregate per component to match a trader leg pair of two
/// different products.
fn scan_tier1(
    kind: RuleKind,
    pool: &mut UnmatchedPool,
    ctx: &RuleContext<'_>,
    results: &mut Vec<MatchResult>,
) {
    let trader_snapshot = snapshot(pool, TradeSource::Trader);
    let exchange_snapshot = snapshot(pool, TradeSource::Exchange);
    let trader_refs: Vec<&Trade> = trader_snapshot.iter().collect();
    let positions = aggregate(exchange_snapshot.iter());

    for (a, b) in trader_product_pairs(&trader_refs) {
        if !pool.is_available(TradeSource::Trader, &a.id)
            || !pool.is_available(TradeSource::Trader, &b.id)
        {
            continue;
        }
        let (Some(pos_a), Some(pos_b)) = (
            component_position(&positions, a),
            component_position(&positions, b),
        ) else {
            continue;
        };
        if pos_a.len() + pos_b.len() <= 2 {
            continue;
        }
        if a.price - b.price != pos_a.key.price - pos_b.key.price {
            continue;
        }
        if !position_available(pool, TradeSource::Exchange, pos_a)
            || !position_available(pool, TradeSource::Exchange, pos_b)
        {
            continue;
        }

        let trader_ids = vec![a.id.clone(), b.id.clone()];
        let exchange_ids: Vec<_> = pos_a.ids().into_iter().chain(pos_b.ids()).collect();
        if pool.claim(&trader_ids, &exchange_ids) {
            results.push(result(
                kind,
                ctx,
                trader_ids,
                exchange_ids,
                pos_a.key.price - pos_b.key.price,
                pos_a.quantity,
            ));
        }
    }
}

/// T2: one hyphenated exchange spread against trader fills aggregating to each component.
fn scan_tier2(
    kind: RuleKind,
    pool: &mut UnmatchedPool,
    ctx: &RuleContext<'_>,
    results: &mut Vec<MatchResult>,
) {
    let trader_snapshot = snapshot(pool, TradeSource::Trader);
    let exchange_snapshot = snapshot(pool, TradeSource::Exchange);
    let positions = aggregate(trader_snapshot.iter());

    for exchange in &exchange_snapshot {
        let Some((first, second)) = exchange.product.spread_components() else {
            continue;
        };
        if !pool.is_available(TradeSource::Exchange, &exchange.id) {
            continue;
        }
        let (first_side, second_side) = spread_directions(exchange.side);

        let find = |product: &str, side| {
            positions.iter().find(|position| {
                position.key.product == product
                    && position.key.month == exchange.contract_month
                    && position.key.side == side
                    && position.key.universal == exchange.universal()
                    && position.quantity == exchange.quantity
            })
        };
        let (Some(pos1), Some(pos2)) = (
            find(first.as_str(), first_side),
            find(second.as_str(), second_side),
        ) else {
            continue;
        };
        if pos1.len() + pos2.len() <= 2 {
            continue;
        }
        if pos1.key.price - pos2.key.price != exchange.price {
            continue;
        }
        if !position_available(pool, TradeSource::Trader, pos1)
            || !position_available(pool, TradeSource::Trader, pos2)
        {
            continue;
        }

        let trader_ids: Vec<_> = pos1.ids().into_iter().chain(pos2.ids()).collect();
        let exchange_ids = vec![exchange.id.clone()];
        if pool.claim(&trader_ids, &exchange_ids) {
            results.push(result(
                kind,
                ctx,
                trader_ids,
                exchange_ids,
                exchange.price,
                pos1.quantity,
            ));
        }
    }
}

/// T3: trader leg pairs aggregating across pairs per component against individual exchange
/// component records.
fn scan_tier3(
    kind: RuleKind,
    pool: &mut UnmatchedPool,
    ctx: &RuleContext<'_>,
    results: &mut Vec<MatchResult>,
) {
    let trader_snapshot = snapshot(pool, TradeSource::Trader);
    let exchange_snapshot = snapshot(pool, TradeSource::Exchange);
    let positions = aggregate(trader_snapshot.iter());

    for (at, pos1) in positions.iter().enumerate() {
        for pos2 in &positions[at + 1..] {
            // The pair-of-aggregates shape: different products, same month and quantity,
            // opposite directions, shared universal fields, genuinely aggregated.
            if pos1.key.product == pos2.key.product
                || pos1.key.month != pos2.key.month
                || pos1.quantity != pos2.quantity
                || pos1.key.side != pos2.key.side.opposite()
                || pos1.key.universal != pos2.key.universal
                || pos1.len() + pos2.len() <= 2
            {
                continue;
            }
            if !position_available(pool, TradeSource::Trader, pos1)
                || !position_available(pool, TradeSource::Trader, pos2)
            {
                continue;
            }

            // Match each component aggregate to a single exchange record, then check the
            // spread-price equality across the two.
            let component_record = |position: &AggregatedPosition<'_>| {
                exchange_snapshot.iter().find(|e| {
                    e.product.0 == position.key.product
                        && e.contract_month == position.key.month
                        && e.side == position.key.side
                        && e.universal() == position.key.universal
                        && e.quantity == position.quantity
                        && pool.is_available(TradeSource::Exchange, &e.id)
                })
            };
            let (Some(e1), Some(e2)) = (component_record(pos1), component_record(pos2)) else {
                continue;
            };
            if pos1.key.price - pos2.key.price != e1.price - e2.price {
                continue;
            }

            let trader_ids: Vec<_> = pos1.ids().into_iter().chain(pos2.ids()).collect();
            let exchange_ids = vec![e1.id.clone(), e2.id.clone()];
            if pool.claim(&trader_ids, &exchange_ids) {
                results.push(result(
                    kind,
                    ctx,
                    trader_ids,
                    exchange_ids,
                    e1.price - e2.price,
                    pos1.quantity,
                ));
            }
        }
    }
}

/// T4: multiple identical hyphenated exchange spreads aggregating to a single trader leg
/// pair.
fn scan_tier4(
    kind: RuleKind,
    pool: &mut UnmatchedPool,
    ctx: &RuleContext<'_>,
    results: &mut Vec<MatchResult>,
) {
    let trader_snapshot = snapshot(pool, TradeSource::Trader);
    let exchange_snapshot = snapshot(pool, TradeSource::Exchange);
    let trader_refs: Vec<&Trade> = trader_snapshot.iter().collect();
    let candidate_pairs = trader_product_pairs(&trader_refs);

    let hyphenated = exchange_snapshot
        .iter()
        .filter(|e| e.product.spread_components().is_some());
    for position in aggregate(hyphenated) {
        if position.len() < 2 {
            continue;
        }
        let product = ProductName::new(position.key.product.clone());
        let Some((first, second)) = product.spread_components() else {
            continue;
        };
        if !position_available(pool, TradeSource::Exchange, &position) {
            continue;
        }
        let (first_side, second_side) = spread_directions(position.key.side);

        for (a, b) in &candidate_pairs {
            let Some((leg1, leg2)) = orient_to_components(a, b, &first, &second) else {
                continue;
            };
            if leg1.contract_month != position.key.month
                || leg1.quantity != position.quantity
                || leg1.universal() != position.key.universal
            {
                continue;
            }
            if leg1.side != first_side || leg2.side != second_side {
                continue;
            }
            if leg1.price - leg2.price != position.key.price {
                continue;
            }
            if !pool.is_available(TradeSource::Trader, &leg1.id)
                || !pool.is_available(TradeSource::Trader, &leg2.id)
            {
                continue;
            }

            let trader_ids = vec![leg1.id.clone(), leg2.id.clone()];
            let exchange_ids = position.ids();
            if pool.claim(&trader_ids, &exchange_ids) {
                results.push(result(
                    kind,
                    ctx,
                    trader_ids,
                    exchange_ids,
                    position.key.price,
                    position.quantity,
                ));
                break;
            }
        }
    }
}
