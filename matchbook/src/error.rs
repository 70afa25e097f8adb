use crate::{config::ConfigError, normalize::NormalizationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Defines all possible errors in Matchbook.
///
/// Per-candidate predicate failures inside a rule are ordinary negative outcomes and never
/// surface here; only malformed inputs and invalid configurations do.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum MatchbookError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("normalization: {0}")]
    Normalization(#[from] NormalizationError),
}
