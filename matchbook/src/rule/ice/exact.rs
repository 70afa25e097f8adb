use crate::{
    match_log::MatchResult,
    pool::UnmatchedPool,
    rule::{RuleContext, RuleKind, RuleProcessor, field, matched_fields, signature},
};

/// R1 - exact match.
///
/// Signature = (product, quantity, price, contract month, buy/sell, unit) plus the universal
/// fields. Probes trader against exchange; on a signature hit, claims one trader + one
/// exchange record.
#[derive(Debug, Copy, Clone, Default)]
pub struct Exact;

impl RuleProcessor for Exact {
    fn kind(&self) -> RuleKind {
        RuleKind::IceExact
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let mut results = Vec::new();
        for (trader_id, exchange_id) in signature::exact_pairs(pool, false) {
            let trader_ids = vec![trader_id];
            let exchange_ids = vec![exchange_id];
            if pool.claim(&trader_ids, &exchange_ids) {
                results.push(MatchResult::new(
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
                        field::UNIT,
                    ]),
                ));
            }
        }
        results
    }
}
