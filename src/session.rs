//! Process-wide session state.
//!
//! One explicit cache with a clear lifecycle replaces the overlapping
//! per-screen singletons the mobile client grew: `initialize` after login,
//! `clear` on logout, last write wins in between. The cache holds fetched
//! server state only — the schedule core never reads it, and the bearer
//! token is an opaque value threaded through by the caller.

use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{DailyPlan, Medication};

/// The signed-in identity, passed as a plain value wherever it is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub token: String,
}

impl SessionContext {
    pub fn new(user_id: Uuid, token: impl Into<String>) -> Self {
        Self {
            user_id,
            token: token.into(),
        }
    }
}

/// Cache of the signed-in user's fetched records.
///
/// Callers repopulate after any mutation; a date's plan snapshot is either
/// current or absent, never partially updated.
#[derive(Debug, Default)]
pub struct SessionCache {
    context: Option<SessionContext>,
    medications: Vec<Medication>,
    plans_by_date: HashMap<NaiveDate, Vec<DailyPlan>>,
}

impl SessionCache {
    /// Create an empty, signed-out cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session. Any previous user's cached data is dropped first.
    pub fn initialize(&mut self, context: SessionContext) {
        self.clear();
        self.context = Some(context);
    }

    /// Drop everything. Called on logout and on app shutdown.
    pub fn clear(&mut self) {
        self.context = None;
        self.medications.clear();
        self.plans_by_date.clear();
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.context.is_some()
    }

    // ── Medication list ──────────────────────────────────

    pub fn set_medications(&mut self, medications: Vec<Medication>) {
        self.medications = medications;
    }

    pub fn medications(&self) -> &[Medication] {
        &self.medications
    }

    // ── Day-plan snapshots ───────────────────────────────

    pub fn set_plans(&mut self, date: NaiveDate, plans: Vec<DailyPlan>) {
        self.plans_by_date.insert(date, plans);
    }

    pub fn plans_for(&self, date: NaiveDate) -> Option<&[DailyPlan]> {
        self.plans_by_date.get(&date).map(Vec::as_slice)
    }

    /// Forget one date's snapshot (e.g. after a check-in, before refetch).
    pub fn invalidate_plans(&mut self, date: NaiveDate) {
        self.plans_by_date.remove(&date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Medication;

    fn context(name: &str) -> SessionContext {
        SessionContext::new(Uuid::new_v4(), format!("token-{name}"))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
    }

    #[test]
    fn new_cache_is_signed_out() {
        let cache = SessionCache::new();
        assert!(!cache.is_signed_in());
        assert!(cache.context().is_none());
        assert!(cache.medications().is_empty());
        assert!(cache.plans_for(date()).is_none());
    }

    #[test]
    fn initialize_sets_context() {
        let mut cache = SessionCache::new();
        let ctx = context("alice");
        cache.initialize(ctx.clone());

        assert!(cache.is_signed_in());
        assert_eq!(cache.context(), Some(&ctx));
    }

    #[test]
    fn initialize_drops_previous_users_data() {
        let mut cache = SessionCache::new();
        let alice = context("alice");
        cache.initialize(alice.clone());
        cache.set_medications(vec![Medication::new(alice.user_id, "Metformin")]);
        cache.set_plans(date(), Vec::new());

        cache.initialize(context("bob"));
        assert!(cache.medications().is_empty());
        assert!(cache.plans_for(date()).is_none());
    }

    #[test]
    fn last_write_wins_for_medications() {
        let mut cache = SessionCache::new();
        let ctx = context("alice");
        cache.initialize(ctx.clone());

        cache.set_medications(vec![Medication::new(ctx.user_id, "Metformin")]);
        cache.set_medications(vec![
            Medication::new(ctx.user_id, "Metformin"),
            Medication::new(ctx.user_id, "Lisinopril"),
        ]);
        assert_eq!(cache.medications().len(), 2);
    }

    #[test]
    fn plan_snapshots_keyed_by_date() {
        let mut cache = SessionCache::new();
        cache.initialize(context("alice"));

        let other = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
        cache.set_plans(date(), Vec::new());

        assert!(cache.plans_for(date()).is_some());
        assert!(cache.plans_for(other).is_none());

        cache.invalidate_plans(date());
        assert!(cache.plans_for(date()).is_none());
    }

    #[test]
    fn clear_signs_out() {
        let mut cache = SessionCache::new();
        let ctx = context("alice");
        cache.initialize(ctx.clone());
        cache.set_medications(vec![Medication::new(ctx.user_id, "Metformin")]);

        cache.clear();
        assert!(!cache.is_signed_in());
        assert!(cache.medications().is_empty());
    }
}
