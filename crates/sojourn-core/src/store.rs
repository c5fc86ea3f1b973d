//! The `TravelStore` trait.
//!
//! Implemented by storage backends (e.g. `sojourn-store-sqlite`). The three
//! persistent collaborators — member roster, country catalog, and
//! visited-country ledger — are one backend trait with a method group per
//! concern. Higher layers depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  country::{Country, CountryCode},
  member::Member,
};

/// Abstraction over a travel-tracker storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait TravelStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Roster ────────────────────────────────────────────────────────────

  /// Register a new member and return the persisted [`Member`]. The id and
  /// registration timestamp are assigned by the store.
  fn add_member(
    &self,
    name: String,
    color: String,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  /// Fetch a member by id. Returns `None` if unknown.
  fn get_member(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + '_;

  /// All members, earliest registration first. Re-read from the backing
  /// store on every call; the roster is never cached across requests.
  fn list_members(
    &self,
  ) -> impl Future<Output = Result<Vec<Member>, Self::Error>> + Send + '_;

  // ── Catalog ───────────────────────────────────────────────────────────

  /// All catalog entries whose name contains `fragment`,
  /// case-insensitively. Ordering is unspecified at this layer; ranking
  /// belongs to [`resolver::best_match`](crate::resolver::best_match).
  fn match_countries<'a>(
    &'a self,
    fragment: &'a str,
  ) -> impl Future<Output = Result<Vec<Country>, Self::Error>> + Send + 'a;

  /// Exact catalog lookup by canonical code.
  fn get_country<'a>(
    &'a self,
    code: &'a CountryCode,
  ) -> impl Future<Output = Result<Option<Country>, Self::Error>> + Send + 'a;

  // ── Ledger ────────────────────────────────────────────────────────────

  /// Record that `member_id` has visited `code`.
  ///
  /// Idempotent: recording an already-present pair leaves the visited set
  /// unchanged. Fails if `code` is not in the catalog.
  fn record_visit<'a>(
    &'a self,
    member_id: Uuid,
    code: &'a CountryCode,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The visited set for a member — deduplicated, ordered by code. A member
  /// unknown to the roster has an empty visited set.
  fn list_visited(
    &self,
    member_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CountryCode>, Self::Error>> + Send + '_;
}
