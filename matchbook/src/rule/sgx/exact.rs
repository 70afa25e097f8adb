use crate::{
    match_log::MatchResult,
    pool::UnmatchedPool,
    rule::{RuleContext, RuleKind, RuleProcessor, field, matched_fields, signature},
};

/// S1 - exact match.
///
/// R1 semantics over SGX fields. Products cover futures and options; strike and put/call
/// join the signature when present, so an option never pairs with a future of the same
/// product and month.
#[derive(Debug, Copy, Clone, Default)]
pub struct Exact;

impl RuleProcessor for Exact {
    fn kind(&self) -> RuleKind {
        RuleKind::SgxExact
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
                        field::STRIKE,
                        field::PUT_CALL,
                    ]),
                ));
            }
        }
        results
    }
}
