//! Error types for `sojourn-core`.

use thiserror::Error;

/// Errors surfaced by the session orchestrator, generic over the backend
/// error type of the [`TravelStore`](crate::store::TravelStore) in use.
///
/// Every variant is recoverable: callers are expected to log and re-render
/// the home view rather than terminate.
#[derive(Debug, Error)]
pub enum Error<E> {
  /// Free-text input matched no catalog entry.
  #[error("no country in the catalog matches {0:?}")]
  UnknownCountry(String),

  /// The active-member pointer cannot be resolved and the roster holds no
  /// member to fall back to.
  #[error("active member is unresolvable: the roster is empty")]
  StaleActiveMember,

  #[error("store error: {0}")]
  Store(#[source] E),
}
