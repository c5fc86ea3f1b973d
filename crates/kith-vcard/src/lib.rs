//! vCard 3.0 / 4.0 codec for Kith.
//!
//! Converts between vCard strings and [`kith_core`] domain types. Pure
//! synchronous; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use kith_vcard::{ParsedVcard, parse};
//!
//! let vcard = "BEGIN:VCARD\r\nVERSION:4.0\r\nFN:Alice Smith\r\nEND:VCARD\r\n";
//! let parsed: ParsedVcard = parse(vcard, "my-import").unwrap();
//! println!("uid={:?}, {} facts", parsed.uid, parsed.facts.len());
//! ```

pub mod error;
mod parse;
mod serialize;

pub use error::{Error, Result};
use kith_core::{fact::NewFact, lifecycle::ContactView};

// ─── Public types
// ─────────────────────────────────────────────────────────────

/// The result of parsing a single vCard.
///
/// All `facts[*].subject_id` are [`uuid::Uuid::nil()`]; the caller must
/// replace them with the real subject UUID before persisting.
pub struct ParsedVcard {
  /// The `UID` property from the vCard, if present.
  pub uid:   Option<String>,
  /// Facts decoded from the vCard properties.
  /// All use `RecordingContext::Imported { source_name, original_uid: uid }`.
  pub facts: Vec<NewFact>,
}

// ─── Public API
// ───────────────────────────────────────────────────────────────

/// Parse a single vCard from `input`.
///
/// `source_name` is stored in every fact's
/// `RecordingContext::Imported { source_name, … }`.
pub fn parse(input: &str, source_name: &str) -> Result<ParsedVcard> {
  parse::parse_one(input, source_name)
}

/// Parse zero or more vCards from `input`.
///
/// Each `BEGIN:VCARD … END:VCARD` block is parsed independently; a malformed
/// block yields `Err(…)` in the corresponding position without aborting the
/// rest.
pub fn parse_many(input: &str, source_name: &str) -> Vec<Result<ParsedVcard>> {
  let lines = parse::unfold_lines(input);
  let mut results = Vec::new();
  let mut i = 0;

  while i < lines.len() {
    if lines[i].eq_ignore_ascii_case("BEGIN:VCARD") {
      let start = i;
      let rel_end = lines[start + 1..]
        .iter()
        .position(|l| l.eq_ignore_ascii_case("END:VCARD"));

      if let Some(offset) = rel_end {
        let end = start + 1 + offset;
        let card_str = lines[start..=end].join("\r\n") + "\r\n";
        results.push(parse::parse_one(&card_str, source_name));
        i = end + 1;
      } else {
        results.push(Err(Error::MissingEnvelope));
        break;
      }
    } else {
      i += 1;
    }
  }

  results
}

/// Serialize `view` as a vCard 4.0 string (CRLF line endings, folded at 75
/// octets).
pub fn serialize(view: &ContactView) -> Result<String> {
  serialize::serialize(view)
}

/// Serialize `view` as a vCard 3.0 string.
pub fn serialize_v3(view: &ContactView) -> Result<String> {
  serialize::serialize_v3(view)
}

// ─── Round-trip test ─────────────────────────────────────────────────────────


// ─── Shared test helpers ──────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test_helpers {
  use chrono::{TimeZone, Utc};
  use kith_core::{
    fact::{Confidence, Fact, FactValue, RecordingContext},
    lifecycle::{ContactView, FactStatus, ResolvedFact},
    subject::{Subject, SubjectKind},
  };
  use uuid::Uuid;

  /// Build a [`ContactView`] from a list of fact values for use in tests.
  pub(crate) fn make_view(facts: Vec<FactValue>) -> ContactView {
    let subject_id = Uuid::new_v4();
    let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let subject = Subject {
      subject_id,
      created_at: as_of,
      kind: SubjectKind::Person,
    };
    let active_facts = facts
      .into_iter()
      .map(|v| {
        let fact = Fact {
          fact_id: Uuid::new_v4(),
          subject_id,
          value: v,
          recorded_at: as_of,
          effective_at: None,
          effective_until: None,
          source: None,
          confidence: Confidence::Certain,
          recording_context: RecordingContext::Manual,
          tags: vec![],
        };
        ResolvedFact {
          fact,
          status: FactStatus::Active,
        }
      })
      .collect();
    ContactView {
      subject,
      as_of,
      active_facts,
    }
  }
}
