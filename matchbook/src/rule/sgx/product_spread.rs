use crate::{
    config::Confidence,
    match_log::{MatchResult, audit},
    pool::UnmatchedPool,
    rule::{
        RuleContext, RuleKind, RuleProcessor, field, matched_fields,
        sgx::PS_MARKER,
        snapshot,
        spread::{orient_to_components, price_pattern, spread_directions, trader_product_pairs},
    },
};
use matchbook_trade::trade::{Trade, TradeSource};
use rust_decimal::Decimal;

/// S3 - product spread, three confidence tiers.
///
/// R5 semantics - a hyphenated exchange record against a trader leg pair - with the tier
/// decided by how the trader book flagged the structure:
/// * T1: both legs carry the `PS` spread indicator;
/// * T2: no indicator, but the `{spread, 0}` price pattern quotes the spread on one leg;
/// * T3: no indicator, both legs priced outright as plain components.
#[derive(Debug, Copy, Clone, Default)]
pub struct ProductSpread;

impl RuleProcessor for ProductSpread {
    fn kind(&self) -> RuleKind {
        RuleKind::SgxProductSpread
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
                let Some(confidence) = tier_confidence(ctx, leg1, leg2, exchange.price) else {
                    continue;
                };
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

fn has_ps_marker(leg: &Trade) -> bool {
    leg.spread_flag
        .as_deref()
        .is_some_and(|flag| flag.eq_ignore_ascii_case(PS_MARKER))
}

/// Decide the tier and validate its price predicate; `None` rejects the candidate.
fn tier_confidence(
    ctx: &RuleContext<'_>,
    leg1: &Trade,
    leg2: &Trade,
    spread_price: Decimal,
) -> Option<Confidence> {
    let pattern = price_pattern(leg1.price, leg2.price);
    if has_ps_marker(leg1) && has_ps_marker(leg2) {
        // T1: the book flagged the structure; either quote style is accepted.
        let priced = match pattern {
            Some(quoted) => quoted == spread_price,
            None => leg1.price - leg2.price == spread_price,
        };
        return priced.then(|| ctx.confidence());
    }

    match pattern {
        // T2: unflagged, but quoted as a spread.
        Some(quoted) => (quoted == spread_price).then(|| ctx.tier_confidence(0)),
        // T3: unflagged plain component prices.
        None => (leg1.price - leg2.price == spread_price).then(|| ctx.tier_confidence(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeGroupConfig;
    use matchbook_trade::{Side, Unit, test_utils::trade};
    use rust_decimal_macros::dec;

    fn ctx(config: &ExchangeGroupConfig) -> RuleContext<'_> {
        RuleContext {
            spec: &config.rules[2],
            conversion: &config.conversion,
        }
    }

    fn spread_record() -> Trade {
        trade("e-1", TradeSource::Exchange, "380cst-180cst", "Jun25", "5000", Unit::Mt, "12.25", Side::Sell)
    }

    #[test]
    fn test_tier1_ps_marker() {
        let config = ExchangeGroupConfig::sgx();
        let mut leg1 = trade("t-1", TradeSource::Trader, "380cst", "Jun25", "5000", Unit::Mt, "12.25", Side::Sell);
        let mut leg2 = trade("t-2", TradeSource::Trader, "180cst", "Jun25", "5000", Unit::Mt, "0.00", Side::Buy);
        leg1.spread_flag = Some("PS".into());
        leg2.spread_flag = Some("ps".into());

        let mut pool = UnmatchedPool::new(vec![leg1, leg2], vec![spread_record()]);
        let results = ProductSpread.apply(&mut pool, &ctx(&config));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence.value(), 95);
        assert_eq!(results[0].audit["spread_price"], dec!(12.25));
    }

    #[test]
    fn test_tier2_price_pattern_without_marker() {
        let config = ExchangeGroupConfig::sgx();
        let leg1 = trade("t-1", TradeSource::Trader, "380cst", "Jun25", "5000", Unit::Mt, "12.25", Side::Sell);
        let leg2 = trade("t-2", TradeSource::Trader, "180cst", "Jun25", "5000", Unit::Mt, "0.00", Side::Buy);

        let mut pool = UnmatchedPool::new(vec![leg1, leg2], vec![spread_record()]);
        let results = ProductSpread.apply(&mut pool, &ctx(&config));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence.value(), 92);
    }

    #[test]
    fn test_tier3_plain_component_prices() {
        let config = ExchangeGroupConfig::sgx();
        let leg1 = trade("t-1", TradeSource::Trader, "380cst", "Jun25", "5000", Unit::Mt, "420.25", Side::Sell);
        let leg2 = trade("t-2", TradeSource::Trader, "180cst", "Jun25", "5000", Unit::Mt, "408.00", Side::Buy);

        let mut pool = UnmatchedPool::new(vec![leg1, leg2], vec![spread_record()]);
        let results = ProductSpread.apply(&mut pool, &ctx(&config));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence.value(), 90);
    }

    #[test]
    fn test_rejects_price_disagreement_in_every_tier() {
        let config = ExchangeGroupConfig::sgx();
        let leg1 = trade("t-1", TradeSource::Trader, "380cst", "Jun25", "5000", Unit::Mt, "420.25", Side::Sell);
        let leg2 = trade("t-2", TradeSource::Trader, "180cst", "Jun25", "5000", Unit::Mt, "408.01", Side::Buy);

        let mut pool = UnmatchedPool::new(vec![leg1, leg2], vec![spread_record()]);
        assert!(ProductSpread.apply(&mut pool, &ctx(&config)).is_empty());
    }
}
