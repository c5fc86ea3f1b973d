//! Member — a registered family member in the roster.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A family member known to the roster.
///
/// Fields are immutable after registration and there is no deletion path.
/// Names and colors carry no uniqueness constraint — two members of the same
/// household may share either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
  pub member_id:  Uuid,
  pub name:       String,
  /// Display color for the member's map and tab, as a CSS color keyword or
  /// hex string. Opaque to this crate.
  pub color:      String,
  /// Server-assigned registration timestamp; orders the roster.
  pub created_at: DateTime<Utc>,
}
