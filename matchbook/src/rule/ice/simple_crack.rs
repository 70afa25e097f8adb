use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{RuleContext, RuleKind, RuleProcessor, field, matched_fields, snapshot},
};
use matchbook_trade::{
    Unit,
    trade::{Trade, TradeSource},
};

/// R3 - simple crack.
///
/// Among trades whose product expresses a crack, probes trader against exchange on
/// (product, contract month, buy/sell, price) plus the universal fields. Same-unit equal
/// quantities match at the primary confidence; a trader MT quantity converting into the
/// exchange BBL quantity within the configured tolerance matches at the converted tier.
#[derive(Debug, Copy, Clone, Default)]
pub struct SimpleCrack;

impl RuleProcessor for SimpleCrack {
    fn kind(&self) -> RuleKind {
        RuleKind::IceSimpleCrack
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let trader_snapshot = snapshot(pool, TradeSource::Trader);
        let exchange_snapshot = snapshot(pool, TradeSource::Exchange);

        let mut results = Vec::new();
        for trader in trader_snapshot.iter().filter(|t| t.product.is_crack()) {
            if !pool.is_available(TradeSource::Trader, &trader.id) {
                continue;
            }

            for exchange in exchange_snapshot.iter().filter(|e| key_fields_agree(trader, e)) {
                if !pool.is_available(TradeSource::Exchange, &exchange.id) {
                    continue;
                }

                let outcome = match (trader.unit, exchange.unit) {
                    (a, b) if a == b && trader.quantity == exchange.quantity => {
                        Some((ctx.confidence(), None))
                    }
                    (Unit::Mt, Unit::Bbl)
                        if ctx.conversion.quantities_match(
                            trader.quantity,
                            exchange.quantity,
                            &trader.product,
                            ctx.tolerance_bbl(),
                        ) =>
                    {
                        let converted = ctx.conversion.to_bbl(
                            trader.quantity,
                            Unit::Mt,
                            &trader.product,
                        );
                        Some((ctx.tier_confidence(0), Some(converted)))
                    }
                    _ => None,
                };
                let Some((confidence, converted)) = outcome else {
                    continue;
                };

                let trader_ids = vec![trader.id.clone()];
                let exchange_ids = vec![exchange.id.clone()];
                if pool.claim(&trader_ids, &exchange_ids) {
                    let mut result = MatchResult::new(
                        self.kind(),
                        confidence,
                        trader_ids,
                        exchange_ids,
                        matched_fields(&[
                            field::PRODUCT,
                            field::CONTRACT_MONTH,
                            field::QUANTITY,
                            field::PRICE,
                            field::BUY_SELL,
                        ]),
                    );
                    if let Some(converted) = converted {
                        result = result.with_audit(audit::CONVERTED_BBL, converted);
                    }
                    results.push(result);
                    break;
                }
            }
        }
        results
    }
}

fn key_fields_agree(trader: &Trade, exchange: &Trade) -> bool {
    trader.product == exchange.product
        && trader.contract_month == exchange.contract_month
        && trader.side == exchange.side
        && trader.price == exchange.price
        && trader.universal_agrees(exchange)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeGroupConfig;
    use matchbook_trade::{Side, test_utils::trade};
    use rust_decimal_macros::dec;

    fn ctx(config: &ExchangeGroupConfig) -> RuleContext<'_> {
        RuleContext {
            spec: &config.rules[2],
            conversion: &config.conversion,
        }
    }

    #[test]
    fn test_simple_crack_converts_within_tolerance() {
        let config = ExchangeGroupConfig::ice();
        // 2520 MT x 6.35 = 16002 BBL, within 100 BBL of 16000.
        let trader = trade("t-1", TradeSource::Trader, "marine 0.5% crack", "Jul-25", "2520", Unit::Mt, "11.95", Side::Sell);
        let exchange = trade("e-1", TradeSource::Exchange, "marine 0.5% crack", "Jul-25", "16000", Unit::Bbl, "11.95", Side::Sell);

        let mut pool = UnmatchedPool::new(vec![trader], vec![exchange]);
        let results = SimpleCrack.apply(&mut pool, &ctx(&config));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence.value(), 88);
        assert_eq!(results[0].audit["converted_bbl"], dec!(16002.00));
        assert_eq!(pool.available_len(TradeSource::Trader), 0);
    }

    #[test]
    fn test_simple_crack_same_unit_uses_primary_confidence() {
        let config = ExchangeGroupConfig::ice();
        let trader = trade("t-1", TradeSource::Trader, "380cst crack", "Jun-25", "16000", Unit::Bbl, "3.35", Side::Sell);
        let exchange = trade("e-1", TradeSource::Exchange, "380cst crack", "Jun-25", "16000", Unit::Bbl, "3.35", Side::Sell);

        let mut pool = UnmatchedPool::new(vec![trader], vec![exchange]);
        let results = SimpleCrack.apply(&mut pool, &ctx(&config));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence.value(), 90);
        assert!(results[0].audit.is_empty());
    }

    #[test]
    fn test_simple_crack_rejects_outside_tolerance_and_non_crack() {
        let config = ExchangeGroupConfig::ice();
        // 2520 x 6.35 = 16002; 16200 is 198 BBL away, outside the 100 BBL tolerance.
        let trader = trade("t-1", TradeSource::Trader, "marine 0.5% crack", "Jul-25", "2520", Unit::Mt, "11.95", Side::Sell);
        let exchange = trade("e-1", TradeSource::Exchange, "marine 0.5% crack", "Jul-25", "16200", Unit::Bbl, "11.95", Side::Sell);
        let mut pool = UnmatchedPool::new(vec![trader], vec![exchange]);
        assert!(SimpleCrack.apply(&mut pool, &ctx(&config)).is_empty());

        // Non-crack products are out of scope for this rule even when they would convert.
        let trader = trade("t-1", TradeSource::Trader, "marine 0.5%", "Jul-25", "2520", Unit::Mt, "11.95", Side::Sell);
        let exchange = trade("e-1", TradeSource::Exchange, "marine 0.5%", "Jul-25", "16002", Unit::Bbl, "11.95", Side::Sell);
        let mut pool = UnmatchedPool::new(vec![trader], vec![exchange]);
        assert!(SimpleCrack.apply(&mut pool, &ctx(&config)).is_empty());
    }
}
