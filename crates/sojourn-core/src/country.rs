//! Country reference types sourced from the catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical short identifier for a country — ISO 3166-1 alpha-2, uppercase.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
  /// Build a code from raw text, trimming and uppercasing.
  pub fn new(code: impl Into<String>) -> Self {
    let code = code.into();
    Self(code.trim().to_ascii_uppercase())
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CountryCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A catalog entry. Read-only reference data; never created or mutated by
/// this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
  pub code: CountryCode,
  pub name: String,
}
