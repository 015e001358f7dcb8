//! Masking wrapper for sensitive configuration values (bot tokens, app keys).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wraps a sensitive string so it can only ever be displayed masked.
///
/// Masking rule: show first four and last four characters if length >= 13,
/// else show first four and replace the rest with `***`, else show `***`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Masked<T = String>(pub T);

impl<T: AsRef<str>> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn reveal(&self) -> &str {
        self.0.as_ref()
    }

    pub fn masked(&self) -> String {
        mask(self.0.as_ref())
    }
}

/// Standalone masking function, exposed so API-layer auth logging can reuse it
/// without wrapping the value in `Masked` first.
pub fn mask(text: &str) -> String {
    let len = text.chars().count();
    if len >= 13 {
        let first: String = text.chars().take(4).collect();
        let last: String = text.chars().skip(len - 4).collect();
        let stars: String = "*".repeat(len - 8);
        format!("{first}{stars}{last}")
    } else if len > 4 {
        let first: String = text.chars().take(4).collect();
        format!("{first}***")
    } else {
        "***".to_string()
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Masked({})", self.masked())
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}
