use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{
        RuleContext, RuleKind, RuleProcessor, field, ice::BRENT_SWAP, matched_fields, snapshot,
        spread::price_pattern,
    },
};
use indexmap::IndexMap;
use matchbook_trade::{
    Unit,
    trade::{Trade, TradeSource, UniversalFields},
};
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// R12 - complex crack roll.
///
/// Two consecutive-in-time trader crack records with the `{non-zero, 0}` price pattern,
/// opposite directions and different months roll a crack position between months. The
/// exchange shows a complete (base, brent) pair per month; the per-month crack prices derive
/// via R4's formula and the non-zero trader price must equal the crack of the non-zero-priced
/// month minus that of the other. Quantity tolerances are the relaxed roll values.
#[derive(Debug, Copy, Clone, Default)]
pub struct ComplexCrackRoll;

impl RuleProcessor for ComplexCrackRoll {
    fn kind(&self) -> RuleKind {
        RuleKind::IceComplexCrackRoll
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let trader_snapshot = snapshot(pool, TradeSource::Trader);
        let exchange_snapshot = snapshot(pool, TradeSource::Exchange);

        let mut results = Vec::new();
        for group in roll_groups(&trader_snapshot).values() {
            // Adjacent in execution-time order; records without timestamps keep ingest order.
            let mut ordered = group.clone();
            ordered.sort_by_key(|leg| leg.executed_at);

            for window in ordered.windows(2) {
                let [a, b] = window else { continue };
                let Some(roll) = roll_shape(a, b) else {
                    continue;
                };
                if !pool.is_available(TradeSource::Trader, &a.id)
                    || !pool.is_available(TradeSource::Trader, &b.id)
                {
                    continue;
                }

                if let Some(result) =
                    match_roll(self.kind(), pool, ctx, &roll, &exchange_snapshot)
                {
                    results.push(result);
                }
            }
        }
        results
    }
}

/// Trader crack records grouped by (base product, quantity, universal fields).
fn roll_groups(trades: &[Trade]) -> IndexMap<(SmolStr, Decimal, UniversalFields), Vec<&Trade>> {
    let mut groups: IndexMap<(SmolStr, Decimal, UniversalFields), Vec<&Trade>> =
        IndexMap::default();
    for trade in trades {
        if trade.product.is_crack() && trade.unit == Unit::Mt {
            groups
                .entry((trade.base_product.0.clone(), trade.quantity, trade.universal()))
                .or_default()
                .push(trade);
        }
    }
    groups
}

#[derive(Debug, Clone, Copy)]
struct Roll<'a> {
    /// Leg quoting the roll price.
    quoted: &'a Trade,
    /// The flat leg.
    flat: &'a Trade,
    price: Decimal,
}

/// Opposite directions, different months, `{non-zero, 0}` quote pattern. Both-zero pairs are
/// not rolls.
fn roll_shape<'a>(a: &'a Trade, b: &'a Trade) -> Option<Roll<'a>> {
    if a.contract_month == b.contract_month || a.side != b.side.opposite() {
        return None;
    }
    let price = price_pattern(a.price, b.price)?;
    if price.is_zero() {
        return None;
    }
    let (quoted, flat) = if a.price.is_zero() { (b, a) } else { (a, b) };
    Some(Roll { quoted, flat, price })
}

fn match_roll(
    kind: RuleKind,
    pool: &mut UnmatchedPool,
    ctx: &RuleContext<'_>,
    roll: &Roll<'_>,
    exchange: &[Trade],
) -> Option<MatchResult> {
    let ratio = ctx.conversion.ratio(&roll.quoted.product);
    let tolerance_mt = ctx.tolerance_mt();
    let tolerance_bbl = tolerance_mt * ratio;

    let legs_for = |leg: &Trade| -> (Vec<&Trade>, Vec<&Trade>) {
        let bases = exchange
            .iter()
            .filter(|e| {
                e.product == leg.base_product
                    && e.contract_month == leg.contract_month
                    && e.unit == Unit::Mt
                    && e.side == leg.side
                    && e.universal_agrees(leg)
                    && (e.quantity - leg.quantity).abs() <= tolerance_mt
            })
            .collect();
        let brents = exchange
            .iter()
            .filter(|e| {
                e.product.as_str() == BRENT_SWAP
                    && e.contract_month == leg.contract_month
                    && e.unit == Unit::Bbl
                    && e.side == leg.side.opposite()
                    && e.universal_agrees(leg)
                    && (ctx.conversion.to_bbl(leg.quantity, Unit::Mt, &leg.product) - e.quantity)
                        .abs()
                        <= tolerance_bbl
            })
            .collect();
        (bases, brents)
    };

    let (quoted_bases, quoted_brents) = legs_for(roll.quoted);
    let (flat_bases, flat_brents) = legs_for(roll.flat);

    for quoted_base in &quoted_bases {
        for quoted_brent in &quoted_brents {
            for flat_base in &flat_bases {
                for flat_brent in &flat_brents {
                    // crack(quoted month) - crack(flat month) == roll price, in the exact
                    // multiplication form:
                    // base_q - base_f == ratio * (price + brent_q - brent_f)
                    if quoted_base.price - flat_base.price
                        != ratio * (roll.price + quoted_brent.price - flat_brent.price)
                    {
                        continue;
                    }

                    let exchange_ids = vec![
                        quoted_base.id.clone(),
                        quoted_brent.id.clone(),
                        flat_base.id.clone(),
                        flat_brent.id.clone(),
                    ];
                    if exchange_ids
                        .iter()
                        .enumerate()
                        .any(|(at, id)| exchange_ids[..at].contains(id))
                    {
                        continue;
                    }
                    if exchange_ids
                        .iter()
                        .any(|id| !pool.is_available(TradeSource::Exchange, id))
                    {
                        continue;
                    }

                    let trader_ids = vec![roll.quoted.id.clone(), roll.flat.id.clone()];
                    if pool.claim(&trader_ids, &exchange_ids) {
                        let crack_quoted = quoted_base.price / ratio - quoted_brent.price;
                        let crack_flat = flat_base.price / ratio - flat_brent.price;
                        return Some(
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
                            .with_audit(audit::CRACK_PRICE, crack_quoted)
                            .with_audit(audit::CRACK_PRICE_OTHER, crack_flat)
                            .with_audit(audit::SPREAD_PRICE, roll.price),
                        );
                    }
                }
            }
        }
    }
    None
}
