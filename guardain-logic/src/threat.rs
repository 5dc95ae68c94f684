use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
/// Personal safety threat level, 1 (low) through 5 (high)
pub struct ThreatLevel(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Threat level must be between 1 and 5, got {0}")]
pub struct ThreatLevelError(pub i64);

impl ThreatLevel {
    pub const LOW: Self = Self(1);
    pub const LOWER: Self = Self(2);
    pub const MODERATE: Self = Self(3);
    pub const HIGHER: Self = Self(4);
    pub const HIGH: Self = Self(5);

    pub fn new(level: u8) -> Result<Self, ThreatLevelError> {
        if (1..=5).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ThreatLevelError(level.into()))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Low",
            2 => "Lower",
            3 => "Moderate",
            4 => "Higher",
            _ => "High",
        }
    }

    /// Safety advice is only warranted at the top two levels
    pub fn needs_advice(self) -> bool {
        self >= Self::HIGHER
    }
}

impl TryFrom<u8> for ThreatLevel {
    type Error = ThreatLevelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ThreatLevel> for u8 {
    fn from(value: ThreatLevel) -> Self {
        value.0
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The computed threat level and a short human readable explanation
pub struct ThreatReport {
    pub level: ThreatLevel,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyParseError {
    #[error("Reply has fewer than two non-blank lines")]
    TooShort,
    #[error("Expected a threat level digit, got {0:?}")]
    NotADigit(String),
    #[error(transparent)]
    OutOfRange(#[from] ThreatLevelError),
}

const REASON_PREFIXES: [&str; 2] = ["reasons:", "reason:"];

impl ThreatReport {
    /// Pull the level and reason out of a free text model reply. The last two non-blank lines
    /// must be the level digit followed by the reason, anything before them is ignored.
    pub fn parse_model_reply(reply: &str) -> Result<Self, ReplyParseError> {
        let lines = reply
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>();

        let [.., level_line, reason_line] = lines.as_slice() else {
            return Err(ReplyParseError::TooShort);
        };

        if level_line.is_empty() || !level_line.chars().all(|c| c.is_ascii_digit()) {
            return Err(ReplyParseError::NotADigit(level_line.to_string()));
        }

        let level = level_line
            .parse::<i64>()
            .map_err(|_| ReplyParseError::NotADigit(level_line.to_string()))?;
        let level = u8::try_from(level)
            .map_err(|_| ThreatLevelError(level))
            .and_then(ThreatLevel::new)?;

        Ok(Self {
            level,
            reason: strip_reason_prefix(reason_line).to_string(),
        })
    }
}

fn strip_reason_prefix(line: &str) -> &str {
    let lower = line.to_ascii_lowercase();
    REASON_PREFIXES
        .iter()
        .find(|prefix| lower.starts_with(*prefix))
        .map(|prefix| line[prefix.len()..].trim_start())
        .unwrap_or(line)
}
