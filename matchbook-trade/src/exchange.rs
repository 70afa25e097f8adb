use crate::month::MonthDialect;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Unique identifier for a clearing venue whose feed is reconciled against the trader book.
///
/// Each group owns one rule pipeline; two groups never share an unmatched pool.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeGroup {
    Ice,
    Sgx,
    Cme,
    Eex,
}

impl ExchangeGroup {
    /// Return the &str representation of this [`ExchangeGroup`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeGroup::Ice => "ice",
            ExchangeGroup::Sgx => "sgx",
            ExchangeGroup::Cme => "cme",
            ExchangeGroup::Eex => "eex",
        }
    }

    /// Contract-month string dialect this venue's records are rendered in.
    pub fn month_dialect(&self) -> MonthDialect {
        match self {
            ExchangeGroup::Ice => MonthDialect::HyphenYY,
            ExchangeGroup::Sgx | ExchangeGroup::Cme | ExchangeGroup::Eex => {
                MonthDialect::CompactYY
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_group_month_dialects() {
        assert_eq!(ExchangeGroup::Ice.month_dialect(), MonthDialect::HyphenYY);
        assert_eq!(ExchangeGroup::Sgx.month_dialect(), MonthDialect::CompactYY);
        assert_eq!(ExchangeGroup::Cme.month_dialect(), MonthDialect::CompactYY);
        assert_eq!(ExchangeGroup::Eex.month_dialect(), MonthDialect::CompactYY);
    }
}
