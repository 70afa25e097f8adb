use crate::{
    normalize::{NormalizerConfig, ProductVariation},
    rule::{RuleKind, convert::ConversionTable},
};
use indexmap::IndexMap;
use matchbook_trade::{Unit, exchange::ExchangeGroup};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// Defines all possible configuration errors. Any of them is fatal for the run; the pipeline
/// refuses to start.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum ConfigError {
    #[error("confidence outside [0, 100]: {value}")]
    ConfidenceOutOfRange { value: u8 },

    #[error("rule list is empty")]
    EmptyRuleList,

    #[error("rule {rule} does not belong to exchange group {group}")]
    RuleNotApplicable {
        rule: RuleKind,
        group: ExchangeGroup,
    },

    #[error("rule {rule} configured more than once")]
    DuplicateRule { rule: RuleKind },

    #[error("negative tolerance on rule {rule}")]
    NegativeTolerance { rule: RuleKind },

    #[error("non-positive conversion ratio for product: {product}")]
    InvalidConversionRatio { product: SmolStr },
}

/// Per-rule confidence constant, validated into [0, 100] at construction.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Deserialize,
    Serialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    pub fn new(value: u8) -> Result<Self, ConfigError> {
        if value > 100 {
            return Err(ConfigError::ConfidenceOutOfRange { value });
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Confidence {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for u8 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declaration of one rule in an exchange group's ordered pipeline.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct RuleSpec {
    pub kind: RuleKind,
    pub confidence: Confidence,
    /// Lower-tier confidences with rule-specific meaning (R3's converted tier, S3's pattern
    /// and plain tiers). Empty for single-confidence rules.
    #[serde(default)]
    pub tier_confidences: Vec<Confidence>,
    /// BBL tolerance for quantity comparison after conversion.
    #[serde(default)]
    pub tolerance_bbl: Option<Decimal>,
    /// MT tolerance for same-unit quantity comparison.
    #[serde(default)]
    pub tolerance_mt: Option<Decimal>,
}

impl RuleSpec {
    fn new(kind: RuleKind, confidence: u8) -> Self {
        Self {
            kind,
            confidence: Confidence(confidence.min(100)),
            tier_confidences: Vec::default(),
            tolerance_bbl: None,
            tolerance_mt: None,
        }
    }

    fn tier(mut self, confidence: u8) -> Self {
        self.tier_confidences.push(Confidence(confidence.min(100)));
        self
    }

    fn bbl(mut self, tolerance: Decimal) -> Self {
        self.tolerance_bbl = Some(tolerance);
        self
    }

    fn mt(mut self, tolerance: Decimal) -> Self {
        self.tolerance_mt = Some(tolerance);
        self
    }
}

/// The configuration bundle of one exchange group: the ordered rule list with per-rule
/// confidences and tolerances, the normalization tables, and the unit-conversion ratios.
///
/// Read-only after [`Self::validate`]; the rule order here is authoritative and never changes
/// at runtime.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ExchangeGroupConfig {
    pub group: ExchangeGroup,
    pub rules: Vec<RuleSpec>,
    pub normalizer: NormalizerConfig,
    pub conversion: ConversionTable,
}

impl ExchangeGroupConfig {
    /// Default ICE pipeline: thirteen rules in descending confidence order.
    pub fn ice() -> Self {
        use RuleKind::*;
        let dec = |tolerance: i64| Decimal::from(tolerance);

        Self {
            group: ExchangeGroup::Ice,
            rules: vec![
                RuleSpec::new(IceExact, 100),
                RuleSpec::new(IceCalendarSpread, 95),
                RuleSpec::new(IceSimpleCrack, 90).tier(88).bbl(dec(100)),
                RuleSpec::new(IceComplexCrack, 80).mt(dec(50)).bbl(dec(500)),
                RuleSpec::new(IceProductSpread, 75),
                RuleSpec::new(IceFly, 74),
                RuleSpec::new(IceAggregation, 72),
                RuleSpec::new(IceAggregatedSpread, 70),
                RuleSpec::new(IceAggregatedCrack, 68).bbl(dec(500)),
                RuleSpec::new(IceMultilegSpread, 68),
                RuleSpec::new(IceAggregatedComplexCrack, 65).mt(dec(50)).bbl(dec(500)),
                RuleSpec::new(IceComplexCrackRoll, 65).mt(dec(145)),
                RuleSpec::new(IceAggregatedProductSpread, 62),
            ],
            normalizer: ice_normalizer(),
            conversion: ConversionTable::oil_defaults(),
        }
    }

    /// Default SGX pipeline: exact (futures and options), calendar spread, tiered product
    /// spread.
    pub fn sgx() -> Self {
        use RuleKind::*;

        Self {
            group: ExchangeGroup::Sgx,
            rules: vec![
                RuleSpec::new(SgxExact, 100),
                RuleSpec::new(SgxCalendarSpread, 95),
                RuleSpec::new(SgxProductSpread, 95).tier(92).tier(90),
            ],
            normalizer: ice_normalizer(),
            conversion: ConversionTable::oil_defaults(),
        }
    }

    /// Default CME pipeline: a single exact rule over lots.
    pub fn cme() -> Self {
        Self {
            group: ExchangeGroup::Cme,
            rules: vec![RuleSpec::new(RuleKind::CmeExact, 100)],
            normalizer: NormalizerConfig {
                default_trader_unit: Unit::Lot,
                ..NormalizerConfig::default()
            },
            conversion: ConversionTable::oil_defaults(),
        }
    }

    /// Default EEX pipeline: a single exact rule over units.
    pub fn eex() -> Self {
        Self {
            group: ExchangeGroup::Eex,
            rules: vec![RuleSpec::new(RuleKind::EexExact, 100)],
            normalizer: NormalizerConfig {
                default_trader_unit: Unit::Lot,
                ..NormalizerConfig::default()
            },
            conversion: ConversionTable::oil_defaults(),
        }
    }

    /// Reject any configuration the pipeline must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.is_empty() {
            return Err(ConfigError::EmptyRuleList);
        }

        let mut seen = Vec::with_capacity(self.rules.len());
        for spec in &self.rules {
            if spec.kind.group() != self.group {
                return Err(ConfigError::RuleNotApplicable {
                    rule: spec.kind,
                    group: self.group,
                });
            }
            if seen.contains(&spec.kind) {
                return Err(ConfigError::DuplicateRule { rule: spec.kind });
            }
            seen.push(spec.kind);

            let negative = |tolerance: &Option<Decimal>| {
                tolerance.is_some_and(|tolerance| tolerance.is_sign_negative())
            };
            if negative(&spec.tolerance_bbl) || negative(&spec.tolerance_mt) {
                return Err(ConfigError::NegativeTolerance { rule: spec.kind });
            }
        }

        self.conversion.validate()?;
        Ok(())
    }
}

fn ice_normalizer() -> NormalizerConfig {
    NormalizerConfig {
        product_direct: IndexMap::from_iter([
            (SmolStr::new("380 cst"), SmolStr::new("380cst")),
            (SmolStr::new("180 cst"), SmolStr::new("180cst")),
            (SmolStr::new("marine 0.5"), SmolStr::new("marine 0.5%")),
        ]),
        product_variations: vec![
            ProductVariation {
                keywords: vec!["marine".into(), "0.5".into(), "crack".into()],
                canonical: "marine 0.5% crack".into(),
            },
            ProductVariation {
                keywords: vec!["naphtha".into(), "jap".into()],
                canonical: "naphtha japan".into(),
            },
        ],
        trader_unit_defaults: IndexMap::from_iter([(SmolStr::new("brent swap"), Unit::Bbl)]),
        default_trader_unit: Unit::Mt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_bounds() {
        assert!(Confidence::new(0).is_ok());
        assert!(Confidence::new(100).is_ok());
        assert_eq!(
            Confidence::new(101),
            Err(ConfigError::ConfidenceOutOfRange { value: 101 })
        );
    }

    #[test]
    fn test_default_configs_validate() {
        for config in [
            ExchangeGroupConfig::ice(),
            ExchangeGroupConfig::sgx(),
            ExchangeGroupConfig::cme(),
            ExchangeGroupConfig::eex(),
        ] {
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_foreign_rule() {
        let mut config = ExchangeGroupConfig::cme();
        config.rules.push(RuleSpec::new(RuleKind::IceFly, 74));
        assert_eq!(
            config.validate(),
            Err(ConfigError::RuleNotApplicable {
                rule: RuleKind::IceFly,
                group: ExchangeGroup::Cme,
            })
        );
    }

    #[test]
    fn test_validate_rejects_empty_rule_list() {
        let mut config = ExchangeGroupConfig::ice();
        config.rules.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyRuleList));
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = ExchangeGroupConfig::ice();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ExchangeGroupConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
