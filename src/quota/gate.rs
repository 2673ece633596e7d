//! Quota Gate
//!
//! Decides whether a generation may proceed. The gate is `Open` while
//! `count < limit` and `Closed` otherwise. Window expiry is checked lazily
//! at the start of every operation; there is no background timer.
//!
//! Persistence failures are logged and swallowed: the in-memory state stays
//! authoritative for the lifetime of the process.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::QuotaPolicy;
use super::state::QuotaState;
use super::store::QuotaStore;
use crate::metrics;

/// Result of [`QuotaGate::try_consume`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Request admitted; `count` is the usage after this request
    Allowed { count: u32 },
    /// Quota exhausted; nothing was changed
    Denied,
}

/// Result of [`QuotaGate::reset_with_password`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Password matched; quota zeroed and window restarted
    Success,
    /// Password did not match; nothing was changed
    Rejected,
}

/// Point-in-time view of the gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub open: bool,
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
    pub window_start: DateTime<Utc>,
    pub resets_at: DateTime<Utc>,
}

/// Quota gate over a single persisted counter
pub struct QuotaGate {
    policy: QuotaPolicy,
    store: Box<dyn QuotaStore>,
    state: QuotaState,
}

impl QuotaGate {
    /// Load state from `store` and build a gate enforcing `policy`
    pub fn new(store: Box<dyn QuotaStore>, policy: QuotaPolicy) -> Self {
        Self::new_at(store, policy, Utc::now())
    }

    /// Same as [`QuotaGate::new`] with an explicit clock
    pub fn new_at(store: Box<dyn QuotaStore>, policy: QuotaPolicy, now: DateTime<Utc>) -> Self {
        let state = store.load(now);
        let gate = Self {
            policy,
            store,
            state,
        };
        metrics::QUOTA_USED.set(i64::from(gate.state.count));
        gate
    }

    /// Current in-memory state
    pub fn state(&self) -> &QuotaState {
        &self.state
    }

    /// Policy enforced by this gate
    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Admit one request if the quota allows it
    pub fn try_consume(&mut self) -> ConsumeOutcome {
        self.try_consume_at(Utc::now())
    }

    pub fn try_consume_at(&mut self, now: DateTime<Utc>) -> ConsumeOutcome {
        self.expire_window(now);

        if !self.has_capacity() {
            debug!(
                count = self.state.count,
                limit = self.policy.limit,
                "Quota exhausted"
            );
            return ConsumeOutcome::Denied;
        }

        self.state.count += 1;
        self.persist();
        ConsumeOutcome::Allowed {
            count: self.state.count,
        }
    }

    /// Whether a request would currently be admitted
    pub fn is_open(&mut self) -> bool {
        self.is_open_at(Utc::now())
    }

    pub fn is_open_at(&mut self, now: DateTime<Utc>) -> bool {
        self.expire_window(now);
        self.has_capacity()
    }

    /// Zero the quota if `secret` matches the override password exactly
    pub fn reset_with_password(&mut self, secret: &str) -> ResetOutcome {
        self.reset_with_password_at(secret, Utc::now())
    }

    pub fn reset_with_password_at(&mut self, secret: &str, now: DateTime<Utc>) -> ResetOutcome {
        if secret != self.policy.override_password {
            warn!("Quota override rejected");
            return ResetOutcome::Rejected;
        }

        self.state.reset(now);
        self.persist();
        info!("Quota reset with override password");
        ResetOutcome::Success
    }

    /// Snapshot of the gate, after applying any due window reset
    pub fn status(&mut self) -> QuotaStatus {
        self.status_at(Utc::now())
    }

    pub fn status_at(&mut self, now: DateTime<Utc>) -> QuotaStatus {
        self.expire_window(now);
        QuotaStatus {
            open: self.has_capacity(),
            count: self.state.count,
            limit: self.policy.limit,
            remaining: self.policy.limit.saturating_sub(self.state.count),
            window_start: self.state.window_start,
            resets_at: self.state.window_start + self.window(),
        }
    }

    fn window(&self) -> Duration {
        self.policy.window()
    }

    fn has_capacity(&self) -> bool {
        self.state.count < self.policy.limit
    }

    fn expire_window(&mut self, now: DateTime<Utc>) {
        if self.state.is_expired(now, self.window()) {
            info!(
                previous_count = self.state.count,
                window_start = %self.state.window_start,
                "Quota window expired, resetting"
            );
            self.state.reset(now);
            self.persist();
        }
    }

    fn persist(&self) {
        metrics::QUOTA_USED.set(i64::from(self.state.count));
        if let Err(e) = self.store.save(&self.state) {
            metrics::QUOTA_STORAGE_ERRORS_TOTAL.inc();
            warn!(error = %e, "Failed to persist quota state, continuing in memory");
        }
    }
}

impl std::fmt::Debug for QuotaGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaGate")
            .field("limit", &self.policy.limit)
            .field("window_hours", &self.policy.window_hours)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::store::{FileQuotaStore, MemoryQuotaStore};
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn policy(limit: u32) -> QuotaPolicy {
        QuotaPolicy {
            limit,
            window_hours: 24,
            override_password: "hunter2".to_string(),
        }
    }

    /// Store handle shared between the gate and the test
    #[derive(Clone)]
    struct SharedStore(Arc<MemoryQuotaStore>);

    impl QuotaStore for SharedStore {
        fn load(&self, now: DateTime<Utc>) -> QuotaState {
            self.0.load(now)
        }

        fn save(&self, state: &QuotaState) -> Result<(), crate::error::StorageError> {
            self.0.save(state)
        }
    }

    fn gate_with(state: Option<QuotaState>, limit: u32) -> (QuotaGate, Arc<MemoryQuotaStore>) {
        let inner = Arc::new(match state {
            Some(state) => MemoryQuotaStore::with_state(state),
            None => MemoryQuotaStore::new(),
        });
        let gate = QuotaGate::new_at(Box::new(SharedStore(inner.clone())), policy(limit), t0());
        (gate, inner)
    }

    #[test]
    fn test_new_gate_is_open() {
        let (mut gate, _) = gate_with(None, 1);
        assert!(gate.is_open_at(t0()));
        assert_eq!(gate.state().count, 0);
    }

    #[test]
    fn test_consume_until_closed() {
        let (mut gate, store) = gate_with(None, 2);

        assert_eq!(gate.try_consume_at(t0()), ConsumeOutcome::Allowed { count: 1 });
        assert_eq!(gate.try_consume_at(t0()), ConsumeOutcome::Allowed { count: 2 });
        assert!(!gate.is_open_at(t0()));

        assert_eq!(gate.try_consume_at(t0()), ConsumeOutcome::Denied);
        assert_eq!(gate.state().count, 2);
        assert_eq!(store.snapshot().unwrap().count, 2);
    }

    #[test]
    fn test_denied_does_not_persist() {
        let closed = QuotaState {
            count: 1,
            window_start: t0(),
        };
        let (mut gate, store) = gate_with(Some(closed), 1);
        let before = store.snapshot();

        assert_eq!(gate.try_consume_at(t0() + Duration::hours(1)), ConsumeOutcome::Denied);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_expired_window_reopens_on_consume() {
        let stale = QuotaState {
            count: 5,
            window_start: t0(),
        };
        let (mut gate, store) = gate_with(Some(stale), 1);
        let later = t0() + Duration::hours(25);

        assert_eq!(gate.try_consume_at(later), ConsumeOutcome::Allowed { count: 1 });
        let saved = store.snapshot().unwrap();
        assert_eq!(saved.count, 1);
        assert_eq!(saved.window_start, later);
    }

    #[test]
    fn test_expired_window_reopens_on_is_open() {
        let stale = QuotaState {
            count: 5,
            window_start: t0(),
        };
        let (mut gate, store) = gate_with(Some(stale), 1);
        let later = t0() + Duration::hours(24) + Duration::seconds(1);

        assert!(gate.is_open_at(later));
        assert_eq!(gate.state().count, 0);
        assert_eq!(store.snapshot().unwrap().window_start, later);
        assert_eq!(gate.try_consume_at(later), ConsumeOutcome::Allowed { count: 1 });
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let state = QuotaState {
            count: 1,
            window_start: t0(),
        };
        let (mut gate, _) = gate_with(Some(state), 1);

        assert!(!gate.is_open_at(t0() + Duration::hours(24)));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let closed = QuotaState {
            count: 1,
            window_start: t0(),
        };
        let (mut gate, store) = gate_with(Some(closed), 1);
        let before = store.snapshot();

        assert_eq!(
            gate.reset_with_password_at("wrong", t0() + Duration::hours(1)),
            ResetOutcome::Rejected
        );
        assert_eq!(*gate.state(), closed);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_password_is_case_sensitive() {
        let (mut gate, _) = gate_with(None, 1);
        assert_eq!(gate.reset_with_password_at("HUNTER2", t0()), ResetOutcome::Rejected);
        assert_eq!(gate.reset_with_password_at("hunter2 ", t0()), ResetOutcome::Rejected);
    }

    #[test]
    fn test_correct_password_reopens() {
        let closed = QuotaState {
            count: 3,
            window_start: t0(),
        };
        let (mut gate, store) = gate_with(Some(closed), 1);
        let later = t0() + Duration::hours(3);

        assert_eq!(gate.reset_with_password_at("hunter2", later), ResetOutcome::Success);
        assert!(gate.is_open_at(later));
        let saved = store.snapshot().unwrap();
        assert_eq!(saved.count, 0);
        assert_eq!(saved.window_start, later);
    }

    #[test]
    fn test_status_reports_remaining() {
        let (mut gate, _) = gate_with(None, 3);
        gate.try_consume_at(t0());

        let status = gate.status_at(t0());
        assert!(status.open);
        assert_eq!(status.count, 1);
        assert_eq!(status.limit, 3);
        assert_eq!(status.remaining, 2);
        assert_eq!(status.resets_at, t0() + Duration::hours(24));
    }

    #[test]
    fn test_status_applies_expiry() {
        let stale = QuotaState {
            count: 9,
            window_start: t0(),
        };
        let (mut gate, _) = gate_with(Some(stale), 1);

        let status = gate.status_at(t0() + Duration::days(2));
        assert!(status.open);
        assert_eq!(status.count, 0);
    }

    #[test]
    fn test_storage_failure_is_not_fatal() {
        let store = MemoryQuotaStore::read_only(None);
        let mut gate = QuotaGate::new_at(Box::new(store), policy(2), t0());

        assert_eq!(gate.try_consume_at(t0()), ConsumeOutcome::Allowed { count: 1 });
        assert_eq!(gate.try_consume_at(t0()), ConsumeOutcome::Allowed { count: 2 });
        assert_eq!(gate.try_consume_at(t0()), ConsumeOutcome::Denied);
    }

    #[test]
    fn test_state_survives_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("request_count.json");

        let mut gate = QuotaGate::new_at(Box::new(FileQuotaStore::new(&path)), policy(1), t0());
        assert_eq!(gate.try_consume_at(t0()), ConsumeOutcome::Allowed { count: 1 });
        drop(gate);

        let mut restarted =
            QuotaGate::new_at(Box::new(FileQuotaStore::new(&path)), policy(1), t0());
        assert_eq!(restarted.state().count, 1);
        assert!(!restarted.is_open_at(t0() + Duration::hours(1)));
    }
}
