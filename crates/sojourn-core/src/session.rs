//! Session orchestrator — composes roster, catalog, and ledger into the
//! actions behind the home view.
//!
//! A [`Session`] owns the active-member pointer as explicit session state.
//! A single-terminal deployment shares one instance between all clients
//! (they then also share the pointer, as a household device should); a
//! deployment that wants per-client isolation constructs one per client.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use uuid::Uuid;

use crate::{
  country::{Country, CountryCode},
  error::Error,
  member::Member,
  resolver,
  store::TravelStore,
};

// ─── Home view ───────────────────────────────────────────────────────────────

/// The data bag the home view renders from.
///
/// Field names follow the page contract: `users` is the full roster and
/// `color` belongs to the active member.
#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
  pub countries: Vec<CountryCode>,
  pub total:     usize,
  pub users:     Vec<Member>,
  pub color:     String,
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// One client session over a shared store.
///
/// Switching the active member carries no validation, so the pointer may go
/// stale; every read re-validates it against a freshly-read roster and falls
/// back to the earliest-registered member, repairing the pointer as it goes.
/// View state is always re-derived from the store — nothing is cached — so
/// concurrent writers are picked up on the next render.
pub struct Session<S> {
  store:  Arc<S>,
  active: RwLock<Option<Uuid>>,
}

impl<S: TravelStore> Session<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, active: RwLock::new(None) }
  }

  /// The raw pointer value, unvalidated.
  pub fn active_id(&self) -> Option<Uuid> {
    *self.active.read().unwrap_or_else(PoisonError::into_inner)
  }

  /// Point the session at `id` without checking the roster.
  ///
  /// A later [`active_member`](Self::active_member) heals a pointer that
  /// turns out to be stale.
  pub fn switch_to(&self, id: Uuid) {
    *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(id);
  }

  /// Resolve the active member against a freshly-read roster.
  pub async fn active_member(&self) -> Result<Member, Error<S::Error>> {
    let roster = self.store.list_members().await.map_err(Error::Store)?;
    self.pick_active(&roster)
  }

  /// Resolve against an already-fetched roster.
  ///
  /// Stale and unset pointers fall back to the earliest-registered member;
  /// an empty roster is the only unresolvable case.
  fn pick_active(&self, roster: &[Member]) -> Result<Member, Error<S::Error>> {
    if let Some(id) = self.active_id()
      && let Some(member) = roster.iter().find(|m| m.member_id == id)
    {
      return Ok(member.clone());
    }

    let fallback = roster.first().ok_or(Error::StaleActiveMember)?;
    self.switch_to(fallback.member_id);
    Ok(fallback.clone())
  }

  // ── Views ─────────────────────────────────────────────────────────────

  /// Assemble the home view: the roster plus the active member's visited
  /// set and color, all re-derived from the store.
  pub async fn home_view(&self) -> Result<HomeView, Error<S::Error>> {
    let users = self.store.list_members().await.map_err(Error::Store)?;
    let active = self.pick_active(&users)?;
    let countries = self
      .store
      .list_visited(active.member_id)
      .await
      .map_err(Error::Store)?;

    Ok(HomeView {
      total: countries.len(),
      countries,
      users,
      color: active.color,
    })
  }

  /// The full roster, freshly read.
  pub async fn roster(&self) -> Result<Vec<Member>, Error<S::Error>> {
    self.store.list_members().await.map_err(Error::Store)
  }

  // ── Actions ───────────────────────────────────────────────────────────

  /// Resolve free text to a catalog entry.
  ///
  /// Empty input and no-match both come back as [`Error::UnknownCountry`];
  /// ties between several matches go to [`resolver::best_match`].
  pub async fn resolve(&self, input: &str) -> Result<Country, Error<S::Error>> {
    let Some(needle) = resolver::normalize(input) else {
      return Err(Error::UnknownCountry(input.to_owned()));
    };
    let candidates = self
      .store
      .match_countries(&needle)
      .await
      .map_err(Error::Store)?;
    resolver::best_match(candidates)
      .ok_or_else(|| Error::UnknownCountry(input.to_owned()))
  }

  /// Record a visit for the active member from free-text input. Returns
  /// the country that was recorded.
  pub async fn add_visit(&self, input: &str) -> Result<Country, Error<S::Error>> {
    let active = self.active_member().await?;
    let country = self.resolve(input).await?;
    self
      .store
      .record_visit(active.member_id, &country.code)
      .await
      .map_err(Error::Store)?;
    Ok(country)
  }

  /// Register a member and make them active.
  pub async fn add_member(
    &self,
    name: String,
    color: String,
  ) -> Result<Member, Error<S::Error>> {
    let member = self
      .store
      .add_member(name, color)
      .await
      .map_err(Error::Store)?;
    self.switch_to(member.member_id);
    Ok(member)
  }
}
