use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{
        RuleContext, RuleKind, RuleProcessor, field, matched_fields, snapshot,
        spread::{LegPair, exchange_leg_pairs, trader_leg_pairs},
    },
};
use matchbook_trade::trade::{Trade, TradeId, TradeSource};
use rust_decimal::Decimal;

/// R10 - multileg spread.
///
/// A trader A/C (or A/D) spread executed on the exchange as a chain of adjacent calendar
/// spreads. Tier 1 takes two spread pairs A/B + B/C whose middle legs net exactly (same
/// product, quantity and price, opposite directions); tier 2 takes three consecutive pairs
/// A/B + B/C + C/D with no per-leg netting requirement. Either way the algebraic sum of the
/// individual spread prices must equal the trader spread price.
#[derive(Debug, Copy, Clone, Default)]
pub struct MultilegSpread;

impl RuleProcessor for MultilegSpread {
    fn kind(&self) -> RuleKind {
        RuleKind::IceMultilegSpread
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let trader_snapshot = snapshot(pool, TradeSource::Trader);
        let exchange_snapshot = snapshot(pool, TradeSource::Exchange);
        let trader_refs: Vec<&Trade> = trader_snapshot.iter().collect();
        let exchange_refs: Vec<&Trade> = exchange_snapshot.iter().collect();

        let spreads: Vec<LegPair<'_>> = exchange_leg_pairs(&exchange_refs)
            .into_iter()
            .map(|(_, pair)| pair)
            .collect();

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

            if let Some(result) = scan_two_pair_chains(
                self.kind(),
                pool,
                ctx,
                &trader_pair,
                quoted,
                &spreads,
            ) {
                results.push(result);
                continue;
            }
            if let Some(result) = scan_three_pair_chains(
                self.kind(),
                pool,
                ctx,
                &trader_pair,
                quoted,
                &spreads,
            ) {
                results.push(result);
            }
        }
        results
    }
}

/// Tier 1: A/B + B/C with the B legs netting exactly.
fn scan_two_pair_chains(
    kind: RuleKind,
    pool: &mut UnmatchedPool,
    ctx: &RuleContext<'_>,
    trader_pair: &LegPair<'_>,
    quoted: Decimal,
    spreads: &[LegPair<'_>],
) -> Option<MatchResult> {
    for (first_at, s1) in spreads.iter().enumerate() {
        if !outer_leg_matches(s1.early, trader_pair.early) {
            continue;
        }
        for (second_at, s2) in spreads.iter().enumerate() {
            if second_at == first_at {
                continue;
            }
            if !outer_leg_matches(s2.late, trader_pair.late) {
                continue;
            }
            if !middle_legs_net(s1.late, s2.early) {
                continue;
            }
            if s1.price_differential() + s2.price_differential() != quoted {
                continue;
            }
            let Some(exchange_ids) = distinct_ids(&[s1.early, s1.late, s2.early, s2.late])
            else {
                continue;
            };
            if !all_available(pool, &exchange_ids) {
                continue;
            }

            let trader_ids = vec![trader_pair.early.id.clone(), trader_pair.late.id.clone()];
            if pool.claim(&trader_ids, &exchange_ids) {
                return Some(spread_result(kind, ctx, trader_ids, exchange_ids, quoted));
            }
        }
    }
    None
}

/// Tier 2: A/B + B/C + C/D chained by month, no per-leg netting required.
fn scan_three_pair_chains(
    kind: RuleKind,
    pool: &mut UnmatchedPool,
    ctx: &RuleContext<'_>,
    trader_pair: &LegPair<'_>,
    quoted: Decimal,
    spreads: &[LegPair<'_>],
) -> Option<MatchResult> {
    for (first_at, s1) in spreads.iter().enumerate() {
        if !outer_leg_matches(s1.early, trader_pair.early) {
            continue;
        }
        for (second_at, s2) in spreads.iter().enumerate() {
            if second_at == first_at || !legs_chain(s1.late, s2.early) {
                continue;
            }
            for (third_at, s3) in spreads.iter().enumerate() {
                if third_at == first_at || third_at == second_at {
                    continue;
                }
                if !outer_leg_matches(s3.late, trader_pair.late) {
                    continue;
                }
                if !legs_chain(s2.late, s3.early) {
                    continue;
                }
                let total = s1.price_differential()
                    + s2.price_differential()
                    + s3.price_differential();
                if total != quoted {
                    continue;
                }
                let Some(exchange_ids) = distinct_ids(&[
                    s1.early, s1.late, s2.early, s2.late, s3.early, s3.late,
                ]) else {
                    continue;
                };
                if !all_available(pool, &exchange_ids) {
                    continue;
                }

                let trader_ids =
                    vec![trader_pair.early.id.clone(), trader_pair.late.id.clone()];
                if pool.claim(&trader_ids, &exchange_ids) {
                    return Some(spread_result(kind, ctx, trader_ids, exchange_ids, quoted));
                }
            }
        }
    }
    None
}

fn spread_result(
    kind: RuleKind,
    ctx: &RuleContext<'_>,
    trader_ids: Vec<TradeId>,
    exchange_ids: Vec<TradeId>,
    quoted: Decimal,
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
            field::BUY_SELL,
            field::PRICE,
        ]),
    )
    .with_audit(audit::SPREAD_PRICE, quoted)
}

/// An outer exchange leg standing in for one trader leg: same product, month, quantity,
/// direction and universal fields.
fn outer_leg_matches(exchange: &Trade, trader: &Trade) -> bool {
    exchange.product == trader.product
        && exchange.contract_month == trader.contract_month
        && exchange.quantity == trader.quantity
        && exchange.side == trader.side
        && exchange.universal_agrees(trader)
}

/// Exact net: identical product, month, quantity and price with opposite directions.
fn middle_legs_net(a: &Trade, b: &Trade) -> bool {
    legs_chain(a, b) && a.price == b.price
}

/// Chaining without the price requirement: the touching legs share month, product and
/// quantity with opposite directions.
fn legs_chain(a: &Trade, b: &Trade) -> bool {
    a.product == b.product
        && a.contract_month == b.contract_month
        && a.quantity == b.quantity
        && a.side == b.side.opposite()
        && a.universal_agrees(b)
}

fn distinct_ids(legs: &[&Trade]) -> Option<Vec<TradeId>> {
    let ids: Vec<TradeId> = legs.iter().map(|leg| leg.id.clone()).collect();
    let distinct = ids
        .iter()
        .enumerate()
        .all(|(at, id)| !ids[..at].contains(id));
    distinct.then_some(ids)
}

fn all_available(pool: &UnmatchedPool, ids: &[TradeId]) -> bool {
    ids.iter().all(|id| pool.is_available(TradeSource::Exchange, id))
}
