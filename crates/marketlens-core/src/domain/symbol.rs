use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_ROOT_LEN: usize = 5;
const MAX_SUFFIX_LEN: usize = 2;

/// Normalized ticker symbol: 1-5 letters, optionally followed by `.` and a 1-2 letter
/// exchange/class suffix (`BRK.B`, `VOD.L`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Normalize and validate a raw ticker.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = normalize_symbol(input);
        if normalized.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        if !is_valid_symbol(&normalized) {
            return Err(ValidationError::InvalidSymbol { value: normalized });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Trim surrounding whitespace and uppercase. Idempotent.
pub fn normalize_symbol(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

/// Returns `true` when `input` (after trimming) matches `^[A-Za-z]{1,5}(\.[A-Za-z]{1,2})?$`.
pub fn is_valid_symbol(input: &str) -> bool {
    let trimmed = input.trim();
    let (root, suffix) = match trimmed.split_once('.') {
        Some((root, suffix)) => (root, Some(suffix)),
        None => (trimmed, None),
    };

    let letters = |part: &str, max: usize| {
        !part.is_empty() && part.len() <= max && part.chars().all(|ch| ch.is_ascii_alphabetic())
    };

    letters(root, MAX_ROOT_LEN) && suffix.map_or(true, |suffix| letters(suffix, MAX_SUFFIX_LEN))
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
