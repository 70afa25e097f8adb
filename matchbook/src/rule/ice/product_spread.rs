use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{
        RuleContext, RuleKind, RuleProcessor, field, matched_fields, snapshot,
        spread::{orient_to_components, spread_directions, trader_product_pairs},
    },
};
use matchbook_trade::trade::{Trade, TradeSource};

/// R5 - product spread.
///
/// One hyphenated exchange record (eg/ `380cst-180cst`) against a trader leg pair whose
/// products are the split components. Directions follow the hyphenated semantics (selling
/// `A-B` sells A and buys B) and the component price differential must equal the exchange
/// spread price exactly.
#[derive(Debug, Copy, Clone, Default)]
pub struct ProductSpread;

impl RuleProcessor for ProductSpread {
    fn kind(&self) -> RuleKind {
        RuleKind::IceProductSpread
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let trader_snapshot = snapshot(pool, TradeSource::Trader);
        let exchange_snapshot = snapshot(pool, TradeSource::Exchange);
        let trader_refs: Vec<&Trade> = trader_snapshot.iter().collect();
        let candidate_pairs = trader_product_pairs(&trader_refs);

        let mut results = Vec::new();
        for exchange in &exchange_snapshot {
            let Some((first, second)) = exchange.product.spread_components() else {
                continue;
            };
            if !pool.is_available(TradeSource::Exchange, &exchange.id) {
                continue;
            }
            let (first_side, second_side) = spread_directions(exchange.side);

            for (a, b) in &candidate_pairs {
                let Some((leg1, leg2)) = orient_to_components(a, b, &first, &second) else {
                    continue;
                };
                if leg1.contract_month != exchange.contract_month
                    || leg1.quantity != exchange.quantity
                    || !leg1.universal_agrees(exchange)
                {
                    continue;
                }
                if leg1.side != first_side || leg2.side != second_side {
                    continue;
                }
                if leg1.price - leg2.price != exchange.price {
                    continue;
                }
                if !pool.is_available(TradeSource::Trader, &leg1.id)
                    || !pool.is_available(TradeSource::Trader, &leg2.id)
                {
                    continue;
                }

                let trader_ids = vec![leg1.id.clone(), leg2.id.clone()];
                let exchange_ids = vec![exchange.id.clone()];
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
                        .with_audit(audit::SPREAD_PRICE, exchange.price),
                    );
                    break;
                }
            }
        }
        results
    }
}
