use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Failed to interpret an input string as a [`ContractMonth`].
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
#[error("malformed contract month: {value}")]
pub struct MonthParseError {
    pub value: String,
}

/// Calendar month code of a futures contract.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
pub enum MonthCode {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl MonthCode {
    /// 1-based month index used for chronological ordering.
    pub fn index(&self) -> u8 {
        *self as u8 + 1
    }

    /// Canonical three-letter code, title-cased.
    pub fn code(&self) -> &'static str {
        match self {
            MonthCode::Jan => "Jan",
            MonthCode::Feb => "Feb",
            MonthCode::Mar => "Mar",
            MonthCode::Apr => "Apr",
            MonthCode::May => "May",
            MonthCode::Jun => "Jun",
            MonthCode::Jul => "Jul",
            MonthCode::Aug => "Aug",
            MonthCode::Sep => "Sep",
            MonthCode::Oct => "Oct",
            MonthCode::Nov => "Nov",
            MonthCode::Dec => "Dec",
        }
    }

    fn from_name(name: &str) -> Option<MonthCode> {
        const NAMES: [(MonthCode, &str); 12] = [
            (MonthCode::Jan, "january"),
            (MonthCode::Feb, "february"),
            (MonthCode::Mar, "march"),
            (MonthCode::Apr, "april"),
            (MonthCode::May, "may"),
            (MonthCode::Jun, "june"),
            (MonthCode::Jul, "july"),
            (MonthCode::Aug, "august"),
            (MonthCode::Sep, "september"),
            (MonthCode::Oct, "october"),
            (MonthCode::Nov, "november"),
            (MonthCode::Dec, "december"),
        ];

        let lower = name.to_ascii_lowercase();
        NAMES
            .iter()
            .find(|(_, full)| lower == full[..3] || lower == *full)
            .map(|(code, _)| *code)
    }
}

/// String dialect a [`ContractMonth`] is rendered in.
///
/// ICE feeds carry `Aug-25`; SGX, CME and EEX feeds carry `Aug25`.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MonthDialect {
    HyphenYY,
    CompactYY,
}

/// Contract delivery month of a [`Trade`](crate::trade::Trade).
///
/// Chronological ordering is `(year, month-index)`. The `Balmo` (balance-of-month) sentinel is
/// preserved literally and sorts before any dated month, keeping early/late leg assignment total.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
pub enum ContractMonth {
    Balmo,
    Month { year: u16, month: MonthCode },
}

impl ContractMonth {
    pub fn new(year: u16, month: MonthCode) -> Self {
        Self::Month { year, month }
    }

    /// Parse the accepted input shapes: `Aug 25`, `aug25`, `August-25`, `Aug-25`, `Aug25`,
    /// `Balmo`. Two-digit years resolve into the 2000s; four-digit years pass through.
    pub fn parse(input: &str) -> Result<Self, MonthParseError> {
        let err = || MonthParseError {
            value: input.to_string(),
        };

        let trimmed = input.trim().trim_matches(['"', '\'']).trim();
        if trimmed.eq_ignore_ascii_case("balmo") {
            return Ok(Self::Balmo);
        }

        let alpha_len = trimmed
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphabetic())
            .map(|(at, _)| at)
            .unwrap_or(trimmed.len());
        let (name, rest) = trimmed.split_at(alpha_len);
        let month = MonthCode::from_name(name).ok_or_else(err)?;

        let digits = rest.trim_start_matches([' ', '-']);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let year = match digits.len() {
            2 => 2000 + digits.parse::<u16>().map_err(|_| err())?,
            4 => digits.parse::<u16>().map_err(|_| err())?,
            _ => return Err(err()),
        };

        Ok(Self::Month { year, month })
    }

    /// Render this month in the provided exchange [`MonthDialect`].
    pub fn format(&self, dialect: MonthDialect) -> SmolStr {
        match (self, dialect) {
            (Self::Balmo, _) => SmolStr::new_static("Balmo"),
            (Self::Month { year, month }, MonthDialect::HyphenYY) => {
                format_smolstr!("{}-{:02}", month.code(), year % 100)
            }
            (Self::Month { year, month }, MonthDialect::CompactYY) => {
                format_smolstr!("{}{:02}", month.code(), year % 100)
            }
        }
    }
}

impl Display for ContractMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format(MonthDialect::HyphenYY))
    }
}
