use crate::{
    config::{ConfigError, ExchangeGroupConfig},
    match_log::{MatchLog, MatchResult},
    normalize::{Normalizer, RawRecord},
    pool::UnmatchedPool,
    rule::{RuleContext, build},
    store::{RejectedRecord, TradeStore},
    summary::ReconSummary,
};
use matchbook_trade::trade::{Trade, TradeSource};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

/// The complete output of one reconciliation run: the ordered match log, the unmatched
/// residue of both sides, and the summary statistics. This is the single boundary value
/// handed to the external presenter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Reconciliation {
    pub matches: Vec<MatchResult>,
    pub residue_trader: Vec<Trade>,
    pub residue_exchange: Vec<Trade>,
    pub summary: ReconSummary,
}

/// The confidence-ordered rule pipeline of one exchange group.
///
/// Construction validates the configuration; a run is pure - normalized records in, matches
/// and residue out. Rules execute strictly in configured order, each seeing the pool exactly
/// as its predecessor left it, and every record leaves the pool at most once.
#[derive(Debug, Clone)]
pub struct MatchPipeline {
    config: ExchangeGroupConfig,
}

impl MatchPipeline {
    pub fn new(config: ExchangeGroupConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExchangeGroupConfig {
        &self.config
    }

    /// Run the pipeline over canonical trades.
    pub fn run(&self, trader: Vec<Trade>, exchange: Vec<Trade>) -> Reconciliation {
        let mut pool = UnmatchedPool::new(trader, exchange);
        let mut log = MatchLog::default();

        for spec in &self.config.rules {
            let span = info_span!("rule", id = %spec.kind, confidence = %spec.confidence);
            let _guard = span.enter();

            let rule = build(spec.kind);
            let ctx = RuleContext {
                spec,
                conversion: &self.config.conversion,
            };
            let results = rule.apply(&mut pool, &ctx);

            info!(
                matches = results.len(),
                trader_remaining = pool.available_len(TradeSource::Trader),
                exchange_remaining = pool.available_len(TradeSource::Exchange),
                "rule applied"
            );
            for result in results {
                log.append(result);
            }
        }

        let residue_trader = pool.residue(TradeSource::Trader);
        let residue_exchange = pool.residue(TradeSource::Exchange);
        let summary = ReconSummary::generate(
            self.config.rules.iter().map(|spec| spec.kind),
            &log,
            residue_trader.len(),
            residue_exchange.len(),
        );

        Reconciliation {
            matches: log.into_entries(),
            residue_trader,
            residue_exchange,
            summary,
        }
    }

    /// Normalize raw record streams with this group's tables, then run the pipeline.
    ///
    /// Records the normalizer rejects are returned alongside; they never enter the pool.
    pub fn run_records(
        &self,
        trader: Vec<RawRecord>,
        exchange: Vec<RawRecord>,
    ) -> (Reconciliation, Vec<RejectedRecord>) {
        let normalizer = Normalizer::new(self.config.normalizer.clone());
        let store = TradeStore::ingest(&normalizer, trader, exchange);
        (self.run(store.trader, store.exchange), store.rejects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleKind;
    use matchbook_trade::{Side, Unit, test_utils::trade};

    #[test]
    fn test_pipeline_rejects_invalid_config() {
        let mut config = ExchangeGroupConfig::ice();
        config.rules.clear();
        assert!(MatchPipeline::new(config).is_err());
    }

    #[test]
    fn test_empty_inputs_produce_empty_outputs() {
        let pipeline = MatchPipeline::new(ExchangeGroupConfig::ice()).unwrap();
        let outcome = pipeline.run(vec![], vec![]);

        assert!(outcome.matches.is_empty());
        assert!(outcome.residue_trader.is_empty());
        assert!(outcome.residue_exchange.is_empty());
        assert_eq!(outcome.summary.total_matches, 0);
    }

    #[test]
    fn test_pipeline_stamps_sequential_match_ids() {
        let pipeline = MatchPipeline::new(ExchangeGroupConfig::ice()).unwrap();
        let trader = vec![
            trade("t-1", TradeSource::Trader, "380cst", "Jun-25", "2000", Unit::Mt, "427.99", Side::Sell),
            trade("t-2", TradeSource::Trader, "180cst", "Jul-25", "1000", Unit::Mt, "401.00", Side::Buy),
        ];
        let exchange = vec![
            trade("e-1", TradeSource::Exchange, "380cst", "Jun-25", "2000", Unit::Mt, "427.99", Side::Sell),
            trade("e-2", TradeSource::Exchange, "180cst", "Jul-25", "1000", Unit::Mt, "401.00", Side::Buy),
        ];

        let outcome = pipeline.run(trader, exchange);
        assert_eq!(outcome.matches.len(), 2);
        assert!(outcome.matches[0].match_id < outcome.matches[1].match_id);
        assert!(outcome.matches.iter().all(|m| m.rule == RuleKind::IceExact));
    }
}
