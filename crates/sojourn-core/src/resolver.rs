//! Free-text country resolution.
//!
//! The store supplies substring candidates; this module owns the matching
//! policy. Matching is case-insensitive containment — a catalog name matches
//! when it contains the normalised input anywhere, so "king" matches
//! "United Kingdom". Purely a lookup; nothing here has side effects.

use crate::country::Country;

/// Normalise free-text input for catalog matching.
///
/// Returns `None` for empty or whitespace-only input, which resolves to
/// not-found without touching the store.
pub fn normalize(input: &str) -> Option<String> {
  let trimmed = input.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(trimmed.to_lowercase())
  }
}

/// Pick the winning candidate when several catalog names contain the input.
///
/// The tie-break is deterministic and part of the resolver contract: the
/// shortest catalog name wins, with equal lengths falling back to
/// alphabetical order. The shortest containing name is the one closest to
/// what was typed — "guinea" resolves to Guinea, not Guinea-Bissau or
/// Equatorial Guinea.
pub fn best_match(mut candidates: Vec<Country>) -> Option<Country> {
  candidates.sort_by(|a, b| {
    (a.name.len(), a.name.as_str()).cmp(&(b.name.len(), b.name.as_str()))
  });
  candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::country::CountryCode;

  fn country(code: &str, name: &str) -> Country {
    Country { code: CountryCode::new(code), name: name.to_owned() }
  }

  #[test]
  fn normalize_trims_and_lowercases() {
    assert_eq!(normalize("  FraNce "), Some("france".to_owned()));
  }

  #[test]
  fn normalize_rejects_blank_input() {
    assert_eq!(normalize(""), None);
    assert_eq!(normalize("   \t"), None);
  }

  #[test]
  fn single_candidate_wins_outright() {
    let winner = best_match(vec![country("FR", "France")]).unwrap();
    assert_eq!(winner.code, CountryCode::new("FR"));
  }

  #[test]
  fn shortest_name_wins() {
    let winner = best_match(vec![
      country("GQ", "Equatorial Guinea"),
      country("GW", "Guinea-Bissau"),
      country("GN", "Guinea"),
      country("PG", "Papua New Guinea"),
    ])
    .unwrap();
    assert_eq!(winner.code, CountryCode::new("GN"));
  }

  #[test]
  fn equal_lengths_break_alphabetically() {
    let winner = best_match(vec![
      country("IN", "India"),
      country("CN", "China"),
    ])
    .unwrap();
    assert_eq!(winner.code, CountryCode::new("CN"));
  }

  #[test]
  fn no_candidates_resolve_to_none() {
    assert!(best_match(Vec::new()).is_none());
  }
}
