use crate::{
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{
        RuleContext, RuleKind, RuleProcessor, field, ice::BRENT_SWAP, matched_fields, snapshot,
    },
};
use matchbook_trade::{
    Unit,
    trade::{Trade, TradeSource},
};

/// R4 - complex crack.
///
/// One trader crack record decomposes into two exchange records: the base product and a brent
/// swap, both in the trader's contract month. Directions follow
/// `sell crack = sell base + buy brent` (and mirrored for buys). The price invariant
/// `price(base) / ratio - price(brent) == price(crack)` is checked in the exact
/// multiplication form, so the predicate never rounds.
#[derive(Debug, Copy, Clone, Default)]
pub struct ComplexCrack;

impl RuleProcessor for ComplexCrack {
    fn kind(&self) -> RuleKind {
        RuleKind::IceComplexCrack
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        let trader_snapshot = snapshot(pool, TradeSource::Trader);
        let exchange_snapshot = snapshot(pool, TradeSource::Exchange);

        let mut results = Vec::new();
        for trader in trader_snapshot
            .iter()
            .filter(|t| t.product.is_crack() && t.unit == Unit::Mt)
        {
            if !pool.is_available(TradeSource::Trader, &trader.id) {
                continue;
            }

            let ratio = ctx.conversion.ratio(&trader.product);
            let bases: Vec<&Trade> = exchange_snapshot
                .iter()
                .filter(|e| {
                    e.product == trader.base_product
                        && e.contract_month == trader.contract_month
                        && e.unit == Unit::Mt
                        && e.side == trader.side
                        && e.universal_agrees(trader)
                        && (e.quantity - trader.quantity).abs() <= ctx.tolerance_mt()
                })
                .collect();
            let brents: Vec<&Trade> = exchange_snapshot
                .iter()
                .filter(|e| {
                    e.product.as_str() == BRENT_SWAP
                        && e.contract_month == trader.contract_month
                        && e.unit == Unit::Bbl
                        && e.side == trader.side.opposite()
                        && e.universal_agrees(trader)
                        && ctx.conversion.quantities_match(
                            trader.quantity,
                            e.quantity,
                            &trader.product,
                            ctx.tolerance_bbl(),
                        )
                })
                .collect();

            'candidates: for base in &bases {
                for brent in &brents {
                    // price(base) == ratio * (price(brent) + price(crack))
                    if base.price != ratio * (brent.price + trader.price) {
                        continue;
                    }
                    if !pool.is_available(TradeSource::Exchange, &base.id)
                        || !pool.is_available(TradeSource::Exchange, &brent.id)
                    {
                        continue;
                    }

                    let trader_ids = vec![trader.id.clone()];
                    let exchange_ids = vec![base.id.clone(), brent.id.clone()];
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
                            .with_audit(audit::CRACK_PRICE, base.price / ratio - brent.price)
                            .with_audit(
                                audit::CONVERTED_BBL,
                                ctx.conversion.to_bbl(trader.quantity, Unit::Mt, &trader.product),
                            ),
                        );
                        break 'candidates;
                    }
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeGroupConfig;
    use matchbook_trade::{Side, test_utils::trade};
    use rust_decimal_macros::dec;

    fn ctx(config: &ExchangeGroupConfig) -> RuleContext<'_> {
        RuleContext {
            spec: &config.rules[3],
            conversion: &config.conversion,
        }
    }

    fn seed_pool() -> UnmatchedPool {
        // 427.99 / 6.35 - 64.05 = 67.40 - 64.05 = 3.35.
        let crack = trade("t-1", TradeSource::Trader, "380cst crack", "Jun-25", "2000", Unit::Mt, "3.35", Side::Sell);
        let base = trade("e-1", TradeSource::Exchange, "380cst", "Jun-25", "2000", Unit::Mt, "427.99", Side::Sell);
        let brent = trade("e-2", TradeSource::Exchange, "brent swap", "Jun-25", "13000", Unit::Bbl, "64.05", Side::Buy);
        UnmatchedPool::new(vec![crack], vec![base, brent])
    }

    #[test]
    fn test_complex_crack_decomposition() {
        let config = ExchangeGroupConfig::ice();
        let mut pool = seed_pool();
        let results = ComplexCrack.apply(&mut pool, &ctx(&config));

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.trader_ids, vec!["t-1".into()]);
        assert_eq!(result.exchange_ids, vec!["e-1".into(), "e-2".into()]);
        assert_eq!(result.audit["crack_price"], dec!(3.35));
        assert_eq!(result.audit["converted_bbl"], dec!(12700.00));
        assert_eq!(pool.available_len(TradeSource::Exchange), 0);
    }

    #[test]
    fn test_complex_crack_rejects_broken_price_invariant() {
        let config = ExchangeGroupConfig::ice();
        let pool = seed_pool();
        let mut exchange = snapshot(&pool, TradeSource::Exchange);
        exchange[1].price = dec!(64.00);
        let mut pool = UnmatchedPool::new(snapshot(&pool, TradeSource::Trader), exchange);

        assert!(ComplexCrack.apply(&mut pool, &ctx(&config)).is_empty());
        assert_eq!(pool.available_len(TradeSource::Exchange), 2);
    }

    #[test]
    fn test_complex_crack_rejects_misdirected_brent() {
        let config = ExchangeGroupConfig::ice();
        let pool = seed_pool();
        let mut exchange = snapshot(&pool, TradeSource::Exchange);
        // Sell crack needs a bought brent leg.
        exchange[1].side = Side::Sell;
        let mut pool = UnmatchedPool::new(snapshot(&pool, TradeSource::Trader), exchange);

        assert!(ComplexCrack.apply(&mut pool, &ctx(&config)).is_empty());
    }
}
