use crate::{
    match_log::MatchResult,
    pool::UnmatchedPool,
    rule::{RuleContext, RuleKind, RuleProcessor, field, matched_fields, signature},
};

/// EEX exact match over (product, contract month, units, price, buy/sell) plus the universal
/// fields, with opposite directions between the sides.
#[derive(Debug, Copy, Clone, Default)]
pub struct Exact;

impl RuleProcessor for Exact {
    fn kind(&self) -> RuleKind {
        RuleKind::EexExact
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let mut results = Vec::new();
        for (trader_id, exchange_id) in signature::exact_pairs(pool, true) {
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
                    ]),
                ));
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeGroupConfig;
    use matchbook_trade::{Side, Unit, test_utils::trade, trade::TradeSource};

    #[test]
    fn test_eex_exact_pairs_opposite_directions() {
        let config = ExchangeGroupConfig::eex();
        let ctx = RuleContext {
            spec: &config.rules[0],
            conversion: &config.conversion,
        };

        let trader = trade("t-1", TradeSource::Trader, "phelix base", "Oct25", "10", Unit::Lot, "86.40", Side::Buy);
        let mut exchange = trader.clone();
        exchange.id = "e-1".into();
        exchange.source = TradeSource::Exchange;
        exchange.side = Side::Sell;

        let mut pool = UnmatchedPool::new(vec![trader], vec![exchange]);
        let results = Exact.apply(&mut pool, &ctx);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule, RuleKind::EexExact);
        assert_eq!(pool.available_len(TradeSource::Exchange), 0);
    }
}
