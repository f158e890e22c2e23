//! Concurrent TTL-keyed session store.
//!
//! The store is the single owner of session state. Liveness checks are
//! self-sufficient: `resolve` and `is_live` re-check record age themselves,
//! so correctness never depends on the background sweeper having run.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};
use ulid::Ulid;

use super::SessionKey;

/// Prefix for generated session IDs.
pub const SESSION_ID_PREFIX: &str = "sess_";

/// Default idle and absolute TTL (minutes).
pub const DEFAULT_TTL_MINUTES: i64 = 30;

// ============================================================================
// TTL Policy
// ============================================================================

/// Liveness bounds for session records.
///
/// `idle` bounds the gap since last access; `absolute` bounds total age from
/// creation. They are independent knobs: access refreshes the idle window
/// but never extends absolute life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub idle: Duration,
    pub absolute: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            idle: Duration::minutes(DEFAULT_TTL_MINUTES),
            absolute: Duration::minutes(DEFAULT_TTL_MINUTES),
        }
    }
}

// ============================================================================
// Session Record
// ============================================================================

/// A single live conversation identity.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Opaque conversation handle passed to the NLU backend.
    /// Embeds the user ID for log traceability.
    pub session_id: String,
    /// Set once at creation; drives the absolute liveness bound.
    pub created_at: DateTime<Utc>,
    /// Updated on every successful resolve; drives the idle bound.
    pub last_accessed_at: DateTime<Utc>,
}

impl SessionRecord {
    fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            session_id: format!("{}{}_{}", SESSION_ID_PREFIX, user_id, Ulid::new()),
            created_at: now,
            last_accessed_at: now,
        }
    }

    fn is_live(&self, now: DateTime<Utc>, ttl: &TtlPolicy) -> bool {
        now - self.created_at < ttl.absolute && now - self.last_accessed_at < ttl.idle
    }
}

// ============================================================================
// Store Stats
// ============================================================================

/// Observability snapshot of the store.
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    /// Number of records currently held (expired-but-unswept included).
    pub count: usize,
    pub ttl_idle: Duration,
    pub ttl_absolute: Duration,
}

// ============================================================================
// Session Store
// ============================================================================

/// Concurrent map of session key to session record.
///
/// All operations are short, synchronous critical sections on DashMap
/// shards; nothing is ever held across an await point. `resolve` is atomic
/// per key: concurrent first-time resolves for the same key observe exactly
/// one created record.
pub struct SessionStore {
    records: DashMap<SessionKey, SessionRecord>,
    ttl: TtlPolicy,
}

impl SessionStore {
    /// Create an empty store with the given TTL policy.
    pub fn new(ttl: TtlPolicy) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
        }
    }

    /// Return the live session ID for `key`, creating a record if none is
    /// live.
    ///
    /// A live record gets its `last_accessed_at` refreshed. An expired or
    /// absent record is superseded by a fresh one under the same entry
    /// lock, so two racing callers can never both create a winner.
    pub fn resolve(&self, key: &SessionKey) -> String {
        let now = Utc::now();

        match self.records.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                if record.is_live(now, &self.ttl) {
                    record.last_accessed_at = now;
                    return record.session_id.clone();
                }

                let fresh = SessionRecord::new(key.user_id(), now);
                let session_id = fresh.session_id.clone();
                let stale = entry.insert(fresh);
                debug!(
                    session_key = %key,
                    old_session_id = %stale.session_id,
                    session_id = %session_id,
                    "Superseded expired session"
                );
                session_id
            }
            Entry::Vacant(entry) => {
                let fresh = SessionRecord::new(key.user_id(), now);
                let session_id = fresh.session_id.clone();
                entry.insert(fresh);
                debug!(
                    session_key = %key,
                    session_id = %session_id,
                    "Created session"
                );
                session_id
            }
        }
    }

    /// Remove any record for `key`. Idempotent; absent keys are not an
    /// error.
    pub fn reset(&self, key: &SessionKey) {
        if let Some((_, record)) = self.records.remove(key) {
            info!(
                session_key = %key,
                session_id = %record.session_id,
                "Session reset"
            );
        }
    }

    /// Non-mutating liveness check.
    ///
    /// Evicts the record and reports false when it is past either deadline,
    /// keeping "expired implies absent" observable without the sweeper.
    pub fn is_live(&self, key: &SessionKey) -> bool {
        let now = Utc::now();

        let live = match self.records.get(key) {
            Some(record) => record.is_live(now, &self.ttl),
            None => return false,
        };
        if live {
            return true;
        }

        // Re-checked under the entry lock: a record recreated by a
        // concurrent resolve survives.
        self.records
            .remove_if(key, |_, record| !record.is_live(now, &self.ttl));
        false
    }

    /// Remove every record past its idle or absolute deadline.
    ///
    /// Candidates are collected first; each removal then takes its entry
    /// lock individually and re-checks, so request-path resolves are never
    /// blocked for the duration of a whole sweep. Returns the number of
    /// records removed.
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();

        let candidates: Vec<SessionKey> = self
            .records
            .iter()
            .filter(|entry| !entry.value().is_live(now, &self.ttl))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in candidates {
            if self
                .records
                .remove_if(&key, |_, record| !record.is_live(now, &self.ttl))
                .is_some()
            {
                removed += 1;
            }
        }
        removed
    }

    /// Snapshot for observability. Reads shard-by-shard; never blocks
    /// writers for unbounded time.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            count: self.records.len(),
            ttl_idle: self.ttl.idle,
            ttl_absolute: self.ttl.absolute,
        }
    }

    /// The configured TTL policy.
    pub fn ttl(&self) -> &TtlPolicy {
        &self.ttl
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(TtlPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(tenant: &str, user: &str) -> SessionKey {
        SessionKey::new(tenant, user)
    }

    /// Rewind a record's timestamps directly to simulate elapsed time.
    fn age_record(store: &SessionStore, key: &SessionKey, idle_by: Duration, created_by: Duration) {
        let mut record = store.records.get_mut(key).expect("record exists");
        record.last_accessed_at -= idle_by;
        record.created_at -= created_by;
    }

    #[test]
    fn resolve_twice_returns_same_id() {
        let store = SessionStore::default();
        let k = key("t1", "u1");

        let first = store.resolve(&k);
        let second = store.resolve(&k);

        assert_eq!(first, second);
        assert_eq!(store.stats().count, 1);
    }

    #[test]
    fn resolve_embeds_user_id() {
        let store = SessionStore::default();

        let id = store.resolve(&key("t1", "u42"));

        assert!(id.starts_with("sess_u42_"));
    }

    #[test]
    fn resolve_refreshes_last_accessed_but_not_created() {
        let store = SessionStore::default();
        let k = key("t1", "u1");

        store.resolve(&k);
        age_record(&store, &k, Duration::minutes(5), Duration::minutes(5));
        let created_before = store.records.get(&k).unwrap().created_at;
        let accessed_before = store.records.get(&k).unwrap().last_accessed_at;

        store.resolve(&k);

        let record = store.records.get(&k).unwrap();
        assert!(record.last_accessed_at > accessed_before);
        assert_eq!(record.created_at, created_before);
    }

    #[test]
    fn different_keys_get_different_sessions() {
        let store = SessionStore::default();

        let a = store.resolve(&key("t1", "u1"));
        let b = store.resolve(&key("t1", "u2"));
        let c = store.resolve(&key("t2", "u1"));

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn resolve_supersedes_after_absolute_ttl() {
        let store = SessionStore::default();
        let k = key("t1", "u1");

        let first = store.resolve(&k);
        // Past the absolute bound, idle window still fresh.
        age_record(&store, &k, Duration::zero(), Duration::minutes(31));

        let second = store.resolve(&k);

        assert_ne!(first, second);
        assert_eq!(store.stats().count, 1);
    }

    #[test]
    fn resolve_supersedes_after_idle_ttl() {
        let store = SessionStore::default();
        let k = key("t1", "u1");

        let first = store.resolve(&k);
        age_record(&store, &k, Duration::minutes(31), Duration::zero());

        let second = store.resolve(&k);

        assert_ne!(first, second);
    }

    #[test]
    fn access_does_not_extend_absolute_life() {
        let store = SessionStore::default();
        let k = key("t1", "u1");

        let first = store.resolve(&k);
        age_record(&store, &k, Duration::zero(), Duration::minutes(20));

        // Repeated access keeps the idle window fresh.
        assert_eq!(store.resolve(&k), first);

        // Creation age still crosses the absolute bound.
        age_record(&store, &k, Duration::zero(), Duration::minutes(11));
        assert_ne!(store.resolve(&k), first);
    }

    #[test]
    fn reset_forces_new_session() {
        let store = SessionStore::default();
        let k = key("t1", "u1");

        let first = store.resolve(&k);
        store.reset(&k);
        let second = store.resolve(&k);

        assert_ne!(first, second);
    }

    #[test]
    fn reset_absent_key_is_noop() {
        let store = SessionStore::default();
        store.reset(&key("t1", "ghost"));
        assert_eq!(store.stats().count, 0);
    }

    #[test]
    fn concurrent_first_resolve_single_winner() {
        let store = Arc::new(SessionStore::default());
        let k = key("t1", "u1");

        let ids: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let store = Arc::clone(&store);
                    let k = k.clone();
                    scope.spawn(move || store.resolve(&k))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winner = &ids[0];
        assert!(ids.iter().all(|id| id == winner));
        assert_eq!(store.stats().count, 1);
    }

    #[test]
    fn is_live_true_within_window() {
        let store = SessionStore::default();
        let k = key("t1", "u1");

        store.resolve(&k);

        assert!(store.is_live(&k));
    }

    #[test]
    fn is_live_false_for_unknown_key() {
        let store = SessionStore::default();
        assert!(!store.is_live(&key("t1", "nobody")));
    }

    #[test]
    fn is_live_evicts_expired_record() {
        let store = SessionStore::default();
        let k = key("t1", "u1");

        store.resolve(&k);
        age_record(&store, &k, Duration::minutes(31), Duration::zero());

        // No sweeper has run; the check itself must evict.
        assert!(!store.is_live(&k));
        assert_eq!(store.stats().count, 0);
    }

    #[test]
    fn evict_expired_removes_exactly_stale_records() {
        let store = SessionStore::default();
        let stale_a = key("t1", "u1");
        let stale_b = key("t1", "u2");
        let fresh = key("t1", "u3");

        store.resolve(&stale_a);
        store.resolve(&stale_b);
        let fresh_id = store.resolve(&fresh);
        let fresh_created = store.records.get(&fresh).unwrap().created_at;

        age_record(&store, &stale_a, Duration::minutes(31), Duration::zero());
        age_record(&store, &stale_b, Duration::minutes(45), Duration::zero());

        let removed = store.evict_expired();

        assert_eq!(removed, 2);
        assert_eq!(store.stats().count, 1);
        let survivor = store.records.get(&fresh).unwrap();
        assert_eq!(survivor.session_id, fresh_id);
        assert_eq!(survivor.created_at, fresh_created);
    }

    #[test]
    fn evict_expired_on_empty_store() {
        let store = SessionStore::default();
        assert_eq!(store.evict_expired(), 0);
    }

    #[test]
    fn stats_reports_configured_ttls() {
        let ttl = TtlPolicy {
            idle: Duration::minutes(10),
            absolute: Duration::minutes(60),
        };
        let store = SessionStore::new(ttl);

        let stats = store.stats();

        assert_eq!(stats.count, 0);
        assert_eq!(stats.ttl_idle, Duration::minutes(10));
        assert_eq!(stats.ttl_absolute, Duration::minutes(60));
    }

    #[test]
    fn independent_idle_and_absolute_windows() {
        let ttl = TtlPolicy {
            idle: Duration::minutes(5),
            absolute: Duration::minutes(60),
        };
        let store = SessionStore::new(ttl);
        let k = key("t1", "u1");

        let first = store.resolve(&k);
        age_record(&store, &k, Duration::minutes(6), Duration::minutes(6));

        // Idle bound trips long before the absolute one.
        assert_ne!(store.resolve(&k), first);
    }
}
