use matchbook::{
    config::ExchangeGroupConfig,
    pipeline::MatchPipeline,
    pool::UnmatchedPool,
    rule::{RuleContext, build},
};
use matchbook_trade::{
    Side, Unit,
    test_utils::trade,
    trade::{Trade, TradeId, TradeSource},
};
use std::collections::HashSet;

fn ice_pipeline() -> MatchPipeline {
    MatchPipeline::new(ExchangeGroupConfig::ice()).unwrap()
}

/// A mixed book exercising several rules in one run: an exact fill, a calendar spread, a
/// converted crack, and records that match nothing.
fn mixed_book() -> (Vec<Trade>, Vec<Trade>) {
    let trader = vec![
        trade("t-1", TradeSource::Trader, "marine 0.5%", "Aug-25", "2000", Unit::Mt, "476.75", Side::Sell),
        trade("t-2", TradeSource::Trader, "380cst", "Jun-25", "20000", Unit::Mt, "16.50", Side::Sell),
        trade("t-3", TradeSource::Trader, "380cst", "Jul-25", "20000", Unit::Mt, "0.00", Side::Buy),
        trade("t-4", TradeSource::Trader, "marine 0.5% crack", "Jul-25", "2520", Unit::Mt, "11.95", Side::Sell),
        trade("t-5", TradeSource::Trader, "gasoil", "Sep-25", "1000", Unit::Mt, "700.00", Side::Buy),
    ];
    let mut exchange = vec![
        trade("e-1", TradeSource::Exchange, "marine 0.5%", "Aug-25", "2000", Unit::Mt, "476.75", Side::Sell),
        trade("e-2", TradeSource::Exchange, "380cst", "Jun-25", "20000", Unit::Mt, "425.50", Side::Sell),
        trade("e-3", TradeSource::Exchange, "380cst", "Jul-25", "20000", Unit::Mt, "409.00", Side::Buy),
        trade("e-4", TradeSource::Exchange, "marine 0.5% crack", "Jul-25", "16000", Unit::Bbl, "11.95", Side::Sell),
        trade("e-5", TradeSource::Exchange, "naphtha japan", "Oct-25", "3000", Unit::Mt, "655.00", Side::Sell),
    ];
    exchange[1].deal_id = Some("X".into());
    exchange[2].deal_id = Some("X".into());
    (trader, exchange)
}

#[test]
fn test_disjointness_every_id_consumed_at_most_once() {
    let (trader, exchange) = mixed_book();
    let outcome = ice_pipeline().run(trader, exchange);

    let mut seen: HashSet<TradeId> = HashSet::new();
    for result in &outcome.matches {
        for id in result.trader_ids.iter().chain(&result.exchange_ids) {
            assert!(seen.insert(id.clone()), "id consumed twice: {id}");
        }
    }
}

#[test]
fn test_conservation_matched_plus_residue_equals_input() {
    let (trader, exchange) = mixed_book();
    let (input_trader, input_exchange) = (trader.len(), exchange.len());
    let outcome = ice_pipeline().run(trader, exchange);

    let matched_trader: usize = outcome.matches.iter().map(|m| m.trader_ids.len()).sum();
    let matched_exchange: usize = outcome.matches.iter().map(|m| m.exchange_ids.len()).sum();

    assert_eq!(matched_trader + outcome.residue_trader.len(), input_trader);
    assert_eq!(matched_exchange + outcome.residue_exchange.len(), input_exchange);
    assert_eq!(outcome.summary.matched_trader, matched_trader);
    assert_eq!(outcome.summary.unmatched_trader, outcome.residue_trader.len());
}

#[test]
fn test_determinism_identical_inputs_identical_outputs() {
    let (trader, exchange) = mixed_book();
    let pipeline = ice_pipeline();

    let first = pipeline.run(trader.clone(), exchange.clone());
    let second = pipeline.run(trader, exchange);

    assert_eq!(first, second);
}

#[test]
fn test_universal_field_agreement_within_every_match() {
    let (trader, exchange) = mixed_book();
    let outcome = ice_pipeline().run(trader.clone(), exchange.clone());

    let lookup: Vec<&Trade> = trader.iter().chain(&exchange).collect();
    for result in &outcome.matches {
        let members: Vec<&&Trade> = lookup
            .iter()
            .filter(|t| {
                result.trader_ids.contains(&t.id) || result.exchange_ids.contains(&t.id)
            })
            .collect();
        assert!(!members.is_empty());
        assert!(
            members
                .windows(2)
                .all(|pair| pair[0].universal_agrees(pair[1]))
        );
    }
}

#[test]
fn test_monotonicity_pool_never_grows_across_rules() {
    let (trader, exchange) = mixed_book();
    let config = ExchangeGroupConfig::ice();
    let mut pool = UnmatchedPool::new(trader, exchange);

    let mut previous = (
        pool.available_len(TradeSource::Trader),
        pool.available_len(TradeSource::Exchange),
    );
    for spec in &config.rules {
        let rule = build(spec.kind);
        let ctx = RuleContext {
            spec,
            conversion: &config.conversion,
        };
        rule.apply(&mut pool, &ctx);

        let current = (
            pool.available_len(TradeSource::Trader),
            pool.available_len(TradeSource::Exchange),
        );
        assert!(current.0 <= previous.0 && current.1 <= previous.1);
        previous = current;
    }
}

#[test]
fn test_null_universal_fields_match_only_null() {
    let mut trader = trade("t-1", TradeSource::Trader, "380cst", "Jun-25", "2000", Unit::Mt, "427.99", Side::Sell);
    trader.broker_group_id = None;
    trader.clearing_acct_id = None;
    let mut exchange = trader.clone();
    exchange.id = "e-1".into();
    exchange.source = TradeSource::Exchange;

    // Null against null: matches.
    let outcome = ice_pipeline().run(vec![trader.clone()], vec![exchange.clone()]);
    assert_eq!(outcome.matches.len(), 1);

    // Null against a populated field: no match.
    exchange.broker_group_id = Some(1);
    let outcome = ice_pipeline().run(vec![trader], vec![exchange]);
    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.residue_trader.len(), 1);
    assert_eq!(outcome.residue_exchange.len(), 1);
}

#[test]
fn test_empty_inputs_produce_empty_outputs() {
    let outcome = ice_pipeline().run(vec![], vec![]);
    assert!(outcome.matches.is_empty());
    assert!(outcome.residue_trader.is_empty());
    assert!(outcome.residue_exchange.is_empty());
    assert_eq!(outcome.summary.match_rate_trader, rust_decimal::Decimal::ZERO);
}
