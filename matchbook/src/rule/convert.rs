use crate::config::ConfigError;
use indexmap::IndexMap;
use matchbook_trade::{Unit, product::ProductName};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// MT to BBL conversion ratios per product, with a fallback for anything unlisted.
///
/// Ratios are keyed by base product, so `380cst crack` converts with the `380cst` ratio.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ConversionTable {
    pub ratios: IndexMap<SmolStr, Decimal>,
    pub fallback: Decimal,
}

impl ConversionTable {
    /// Default oil-products table: marine 0.5% and 380cst at 6.35, naphtha at 8.9,
    /// fallback 7.0.
    pub fn oil_defaults() -> Self {
        Self {
            ratios: IndexMap::from_iter([
                (SmolStr::new("marine 0.5%"), Decimal::new(635, 2)),
                (SmolStr::new("380cst"), Decimal::new(635, 2)),
                (SmolStr::new("naphtha japan"), Decimal::new(89, 1)),
                (SmolStr::new("naphtha nwe"), Decimal::new(89, 1)),
            ]),
            fallback: Decimal::new(70, 1),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (product, ratio) in &self.ratios {
            if *ratio <= Decimal::ZERO {
                return Err(ConfigError::InvalidConversionRatio {
                    product: product.clone(),
                });
            }
        }
        if self.fallback <= Decimal::ZERO {
            return Err(ConfigError::InvalidConversionRatio {
                product: SmolStr::new_static("<fallback>"),
            });
        }
        Ok(())
    }

    /// The MT -> BBL ratio for `product`, resolved via its base product.
    pub fn ratio(&self, product: &ProductName) -> Decimal {
        let base = product.base();
        self.ratios
            .get(base.as_str())
            .or_else(|| self.ratios.get(product.as_str()))
            .copied()
            .unwrap_or(self.fallback)
    }

    /// Convert a quantity to BBL. MT quantities multiply by the product ratio; BBL (and
    /// counted-lot) quantities pass through.
    pub fn to_bbl(&self, quantity: Decimal, unit: Unit, product: &ProductName) -> Decimal {
        match unit {
            Unit::Mt => quantity * self.ratio(product),
            Unit::Bbl | Unit::Lot => quantity,
        }
    }

    /// Whether an MT quantity and a BBL quantity describe the same size, within
    /// `tolerance_bbl` after conversion.
    pub fn quantities_match(
        &self,
        quantity_mt: Decimal,
        quantity_bbl: Decimal,
        product: &ProductName,
        tolerance_bbl: Decimal,
    ) -> bool {
        let converted = self.to_bbl(quantity_mt, Unit::Mt, product);
        (converted - quantity_bbl).abs() <= tolerance_bbl
    }
}
