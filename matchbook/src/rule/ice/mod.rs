//! ICE rule set: thirteen confidence-ordered processors, from the one-to-one exact match down
//! to the four-tier aggregated product spread.

/// R1 - exact one-to-one signature match.
pub mod exact;

/// R2 - calendar spread, two legs per side.
pub mod calendar_spread;

/// R3 - simple crack with MT to BBL conversion.
pub mod simple_crack;

/// R4 - complex crack: one trader crack against exchange base + brent legs.
pub mod complex_crack;

/// R5 - hyphenated exchange product spread against a trader leg pair.
pub mod product_spread;

/// R6 - fly/butterfly, three legs per side.
pub mod fly;

/// R7 - many-to-one quantity aggregation, bidirectional.
pub mod aggregation;

/// R8 - complex crack with the base-product side aggregated.
pub mod aggregated_complex_crack;

/// R9 - calendar spread over aggregated exchange positions.
pub mod aggregated_spread;

/// R10 - multileg spread chains, 4- and 6-leg tiers.
pub mod multileg_spread;

/// R11 - simple crack with the many side aggregated.
pub mod aggregated_crack;

/// R12 - complex crack roll across two contract months.
pub mod complex_crack_roll;

/// R13 - aggregated product spread, four tiers.
pub mod aggregated_product_spread;

/// Product name of the crude reference leg of crack structures.
pub(crate) const BRENT_SWAP: &str = "brent swap";
