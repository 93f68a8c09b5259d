//! Domain primitives: LotId, Symbol, LotStatus.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Venue suffixes recognised on symbol codes (listed and OTC boards).
pub const VENUE_SUFFIXES: [&str; 2] = [".TWO", ".TW"];

/// Opaque lot identifier.
///
/// Compared as a string. Legacy rows carry millisecond timestamps such as
/// `"1718000000123"`; those are kept verbatim and never parsed as numbers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LotId(pub String);

impl LotId {
    pub fn new(id: String) -> Self {
        LotId(id)
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        LotId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for LotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LotId {
    fn from(value: &str) -> Self {
        LotId(value.to_string())
    }
}

/// Free-form symbol text, conventionally `"<code> <name>"`, e.g. `"2330 台積電"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(symbol: String) -> Self {
        Symbol(symbol)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the quote code: the first whitespace-delimited token with any
    /// venue suffix removed. Returns `None` when that token carries no digit.
    pub fn code(&self) -> Option<String> {
        let token = self.0.split_whitespace().next()?;
        let upper = token.to_ascii_uppercase();
        let stripped = VENUE_SUFFIXES
            .iter()
            .find_map(|suffix| upper.strip_suffix(suffix))
            .unwrap_or(&upper);

        if stripped.is_empty() || !stripped.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(stripped.to_string())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LotStatus {
    Open,
    Closed,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Open => "OPEN",
            LotStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for LotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lot status: {0}")]
pub struct LotStatusParseError(pub String);

impl FromStr for LotStatus {
    type Err = LotStatusParseError;

    /// Accepts the canonical forms, lowercase forms, the legacy journal
    /// labels, and an empty cell (rows written before status existed).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "OPEN" | "open" | "Open" | "持倉中" => Ok(LotStatus::Open),
            "CLOSED" | "closed" | "Closed" | "已平倉" => Ok(LotStatus::Closed),
            other => Err(LotStatusParseError(other.to_string())),
        }
    }
}
