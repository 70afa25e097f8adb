use crate::{
    match_log::MatchResult,
    pool::UnmatchedPool,
    rule::{RuleContext, RuleKind, RuleProcessor, field, matched_fields, signature},
};

/// CME exact match over (product, contract month, lots, price, buy/sell) plus the universal
/// fields. Directions are opposite between the sides: a trader Sell pairs to an exchange Buy.
#[derive(Debug, Copy, Clone, Default)]
pub struct Exact;

impl RuleProcessor for Exact {
    fn kind(&self) -> RuleKind {
        RuleKind::CmeExact
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
    fn test_cme_exact_requires_opposite_directions() {
        let config = ExchangeGroupConfig::cme();
        let ctx = RuleContext {
            spec: &config.rules[0],
            conversion: &config.conversion,
        };

        let trader = trade("t-1", TradeSource::Trader, "rbob gasoline", "Sep25", "25", Unit::Lot, "2.1450", Side::Sell);
        let mut exchange = trader.clone();
        exchange.id = "e-1".into();
        exchange.source = TradeSource::Exchange;
        exchange.side = Side::Buy;

        let mut pool = UnmatchedPool::new(vec![trader.clone()], vec![exchange.clone()]);
        let results = Exact.apply(&mut pool, &ctx);
        assert_eq!(results.len(), 1);
        assert_eq!(pool.available_len(TradeSource::Trader), 0);

        // Same directions do not pair on CME.
        let mut same_side = exchange;
        same_side.side = Side::Sell;
        let mut pool = UnmatchedPool::new(vec![trader], vec![same_side]);
        assert!(Exact.apply(&mut pool, &ctx).is_empty());
    }
}
