//! SGX rule set: exact (futures and options), calendar spread, and the three-tier product
//! spread distinguished by the trader-side `PS` marker.

/// S1 - exact match including option attributes.
pub mod exact;

/// S2 - calendar spread.
pub mod calendar_spread;

/// S3 - tiered product spread.
pub mod product_spread;

/// Trader-side spread marker identifying an SGX product-spread leg.
pub(crate) const PS_MARKER: &str = "PS";
