use crate::normalize::{NormalizationError, Normalizer, RawRecord};
use matchbook_trade::trade::{Trade, TradeId, TradeSource};
use serde::{Deserialize, Serialize};
use smol_str::format_smolstr;
use tracing::warn;

/// A raw record rejected at ingest, with the error that disqualified it.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct RejectedRecord {
    pub source: TradeSource,
    /// Zero-based position in the source sequence.
    pub index: usize,
    pub record: RawRecord,
    pub error: NormalizationError,
}

/// Materialised canonical records for one reconciliation run.
///
/// Both sides in ingest order, plus every record the [`Normalizer`] rejected. Rejections are
/// per-record warnings, never run failures.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TradeStore {
    pub trader: Vec<Trade>,
    pub exchange: Vec<Trade>,
    pub rejects: Vec<RejectedRecord>,
}

impl TradeStore {
    /// Normalize both raw record streams into immutable [`Trade`]s.
    ///
    /// Records without a producer-assigned id receive sequential `t-<n>` / `e-<n>` identities
    /// in ingest order, keeping runs deterministic.
    pub fn ingest(
        normalizer: &Normalizer,
        trader: Vec<RawRecord>,
        exchange: Vec<RawRecord>,
    ) -> Self {
        let mut store = Self::default();
        store.ingest_side(normalizer, TradeSource::Trader, trader);
        store.ingest_side(normalizer, TradeSource::Exchange, exchange);
        store
    }

    fn ingest_side(
        &mut self,
        normalizer: &Normalizer,
        source: TradeSource,
        records: Vec<RawRecord>,
    ) {
        let prefix = match source {
            TradeSource::Trader => "t",
            TradeSource::Exchange => "e",
        };

        for (index, record) in records.into_iter().enumerate() {
            let id = match &record.id {
                Some(id) => TradeId::new(id.clone()),
                None => TradeId::new(format_smolstr!("{prefix}-{}", index + 1)),
            };

            match normalizer.normalize(source, id, &record) {
                Ok(trade) => match source {
                    TradeSource::Trader => self.trader.push(trade),
                    TradeSource::Exchange => self.exchange.push(trade),
                },
                Err(error) => {
                    warn!(%source, index, %error, "rejecting record at ingest");
                    self.rejects.push(RejectedRecord {
                        source,
                        index,
                        record,
                        error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizerConfig;

    fn record(product: &str, month: &str, quantity: &str, price: &str, side: &str) -> RawRecord {
        RawRecord {
            product: product.into(),
            contract_month: month.into(),
            quantity: quantity.into(),
            price: price.into(),
            buy_sell: side.into(),
            unit: Some("MT".into()),
            ..RawRecord::default()
        }
    }

    #[test]
    fn test_ingest_assigns_sequential_ids_and_collects_rejects() {
        let normalizer = Normalizer::new(NormalizerConfig::default());
        let store = TradeStore::ingest(
            &normalizer,
            vec![
                record("380cst", "Jun-25", "2000", "425.50", "s"),
                record("380cst", "Jun-25", "2000", "425.50", "short"),
                record("180cst", "Jul-25", "1000", "400.00", "b"),
            ],
            vec![record("380cst", "Jun-25", "2000", "425.50", "sold")],
        );

        let trader_ids: Vec<_> = store.trader.iter().map(|t| t.id.to_string()).collect();
        assert_eq!(trader_ids, vec!["t-1", "t-3"]);
        assert_eq!(store.exchange[0].id.to_string(), "e-1");

        assert_eq!(store.rejects.len(), 1);
        assert_eq!(store.rejects[0].index, 1);
        assert!(matches!(
            store.rejects[0].error,
            NormalizationError::UnknownSide { .. }
        ));
    }

    #[test]
    fn test_ingest_respects_producer_ids() {
        let normalizer = Normalizer::new(NormalizerConfig::default());
        let mut raw = record("380cst", "Jun-25", "2000", "425.50", "s");
        raw.id = Some("book-77".into());

        let store = TradeStore::ingest(&normalizer, vec![raw], vec![]);
        assert_eq!(store.trader[0].id.to_string(), "book-77");
    }
}
