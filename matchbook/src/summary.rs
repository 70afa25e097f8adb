use crate::{match_log::MatchLog, rule::RuleKind};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Summary statistics of one reconciliation run: counts per rule, totals, and per-side match
/// rates.
#[derive(Debug, Clone, Eq, PartialEq, Default, Deserialize, Serialize)]
pub struct ReconSummary {
    /// Matches per rule, in configured rule order. Rules that produced nothing still appear
    /// with a zero count.
    pub matches_per_rule: IndexMap<RuleKind, usize>,
    pub total_matches: usize,
    pub matched_trader: usize,
    pub matched_exchange: usize,
    pub unmatched_trader: usize,
    pub unmatched_exchange: usize,
    /// Matched share of each side's input, rounded to four decimal places.
    pub match_rate_trader: Decimal,
    pub match_rate_exchange: Decimal,
}

impl ReconSummary {
    pub fn generate(
        rule_order: impl IntoIterator<Item = RuleKind>,
        log: &MatchLog,
        unmatched_trader: usize,
        unmatched_exchange: usize,
    ) -> Self {
        let mut matches_per_rule: IndexMap<RuleKind, usize> =
            rule_order.into_iter().map(|rule| (rule, 0)).collect();
        let mut matched_trader = 0;
        let mut matched_exchange = 0;
        for entry in log.entries() {
            *matches_per_rule.entry(entry.rule).or_default() += 1;
            matched_trader += entry.trader_ids.len();
            matched_exchange += entry.exchange_ids.len();
        }

        Self {
            matches_per_rule,
            total_matches: log.len(),
            matched_trader,
            matched_exchange,
            unmatched_trader,
            unmatched_exchange,
            match_rate_trader: rate(matched_trader, unmatched_trader),
            match_rate_exchange: rate(matched_exchange, unmatched_exchange),
        }
    }
}

fn rate(matched: usize, unmatched: usize) -> Decimal {
    let input = matched + unmatched;
    if input == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(matched as u64) / Decimal::from(input as u64)).round_dp(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Confidence, match_log::MatchResult};
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_counts_and_rates() {
        let mut log = MatchLog::default();
        log.append(MatchResult::new(
            RuleKind::IceExact,
            Confidence::new(100).unwrap(),
            vec!["t-1".into()],
            vec!["e-1".into()],
            vec![],
        ));
        log.append(MatchResult::new(
            RuleKind::IceCalendarSpread,
            Confidence::new(95).unwrap(),
            vec!["t-2".into(), "t-3".into()],
            vec!["e-2".into(), "e-3".into()],
            vec![],
        ));

        let summary = ReconSummary::generate(
            [RuleKind::IceExact, RuleKind::IceCalendarSpread, RuleKind::IceFly],
            &log,
            1,
            3,
        );

        assert_eq!(summary.total_matches, 2);
        assert_eq!(summary.matches_per_rule[&RuleKind::IceExact], 1);
        assert_eq!(summary.matches_per_rule[&RuleKind::IceCalendarSpread], 1);
        assert_eq!(summary.matches_per_rule[&RuleKind::IceFly], 0);
        assert_eq!(summary.matched_trader, 3);
        assert_eq!(summary.matched_exchange, 3);
        assert_eq!(summary.match_rate_trader, dec!(0.75));
        assert_eq!(summary.match_rate_exchange, dec!(0.5));
    }

    #[test]
    fn test_summary_of_empty_run() {
        let summary = ReconSummary::generate([RuleKind::CmeExact], &MatchLog::default(), 0, 0);
        assert_eq!(summary.total_matches, 0);
        assert_eq!(summary.match_rate_trader, Decimal::ZERO);
    }
}
