//! Process-local permission decision cache
//!
//! Memoizes evaluator results under `permission:{plan_id}:{role_id}:{action_slug}`.
//! Every key is also recorded in three secondary indices (plan, role and
//! action slug) so the scoped invalidations touch only the keys they remove.
//!
//! The cache is per process. Invalidating here does not reach other
//! instances; their entries expire after the TTL.

use crate::domain::StringUuid;
use metrics::{counter, gauge};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Defaults
pub mod ttl {
    pub const PERMISSION_SECS: u64 = 600; // 10 minutes
    pub const SWEEP_INTERVAL_SECS: u64 = 120; // 2 minutes
    pub const MAX_ENTRIES: usize = 100_000;
}

const KEY_PREFIX: &str = "permission";

/// Build the cache key for one decision
pub fn permission_key(plan_id: StringUuid, role_id: StringUuid, action_slug: &str) -> String {
    format!("{}:{}:{}:{}", KEY_PREFIX, plan_id, role_id, action_slug)
}

#[derive(Debug, Clone)]
struct Entry {
    allowed: bool,
    expires_at: Instant,
    plan_id: StringUuid,
    role_id: StringUuid,
    action_slug: String,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    by_plan: HashMap<StringUuid, HashSet<String>>,
    by_role: HashMap<StringUuid, HashSet<String>>,
    by_action: HashMap<String, HashSet<String>>,
    /// Bumped by every invalidation
    generation: u64,
}

fn unindex<K: std::hash::Hash + Eq>(index: &mut HashMap<K, HashSet<String>>, owner: &K, key: &str) {
    if let Some(keys) = index.get_mut(owner) {
        keys.remove(key);
        if keys.is_empty() {
            index.remove(owner);
        }
    }
}

impl State {
    fn remove(&mut self, key: &str) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        unindex(&mut self.by_plan, &entry.plan_id, key);
        unindex(&mut self.by_role, &entry.role_id, key);
        unindex(&mut self.by_action, &entry.action_slug, key);
        true
    }

    fn remove_all(&mut self, keys: Vec<String>) -> usize {
        keys.iter().filter(|key| self.remove(key)).count()
    }

    /// Insert unless the cache is full. A full cache first drops expired
    /// entries; new keys are refused while it stays full.
    fn admit(&mut self, key: String, entry: Entry, max_entries: usize) -> bool {
        if self.entries.len() >= max_entries && !self.entries.contains_key(&key) {
            let now = Instant::now();
            let expired: Vec<String> = self
                .entries
                .iter()
                .filter(|(_, entry)| entry.expires_at <= now)
                .map(|(key, _)| key.clone())
                .collect();
            self.remove_all(expired);
            if self.entries.len() >= max_entries {
                return false;
            }
        }
        self.insert(key, entry);
        true
    }

    fn insert(&mut self, key: String, entry: Entry) {
        self.by_plan
            .entry(entry.plan_id)
            .or_default()
            .insert(key.clone());
        self.by_role
            .entry(entry.role_id)
            .or_default()
            .insert(key.clone());
        self.by_action
            .entry(entry.action_slug.clone())
            .or_default()
            .insert(key.clone());
        self.entries.insert(key, entry);
    }
}

struct Inner {
    ttl: Duration,
    max_entries: usize,
    state: RwLock<State>,
}

/// Shared handle; clones point at the same entries.
#[derive(Clone)]
pub struct PermissionCache {
    inner: Arc<Inner>,
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(ttl::PERMISSION_SECS))
    }
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, ttl::MAX_ENTRIES)
    }

    /// Cache holding at most `max_entries` decisions
    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl,
                max_entries,
                state: RwLock::new(State::default()),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Cached decision, or `None` on a miss. Expired entries count as misses.
    pub fn get(&self, plan_id: StringUuid, role_id: StringUuid, action_slug: &str) -> Option<bool> {
        let key = permission_key(plan_id, role_id, action_slug);
        let state = self.inner.state.read();
        let hit = state
            .entries
            .get(&key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.allowed);

        let result = if hit.is_some() { "hit" } else { "miss" };
        counter!("plangate_permission_cache_lookups_total", "result" => result).increment(1);
        hit
    }

    /// Store a decision regardless of generation. Returns whether it was
    /// stored; a full cache refuses new keys.
    pub fn set(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_slug: &str,
        allowed: bool,
    ) -> bool {
        let mut state = self.inner.state.write();
        let stored = state.admit(
            permission_key(plan_id, role_id, action_slug),
            self.entry(plan_id, role_id, action_slug, allowed),
            self.inner.max_entries,
        );
        drop(state);
        if !stored {
            counter!("plangate_permission_cache_rejections_total").increment(1);
        }
        stored
    }

    /// Current generation; pair with [`PermissionCache::insert_if_current`].
    pub fn generation(&self) -> u64 {
        self.inner.state.read().generation
    }

    /// Store a decision computed after `generation` was read, unless an
    /// invalidation ran in between. Returns whether the entry was stored.
    pub fn insert_if_current(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_slug: &str,
        allowed: bool,
        generation: u64,
    ) -> bool {
        let mut state = self.inner.state.write();
        if state.generation != generation {
            return false;
        }
        let stored = state.admit(
            permission_key(plan_id, role_id, action_slug),
            self.entry(plan_id, role_id, action_slug, allowed),
            self.inner.max_entries,
        );
        drop(state);
        if !stored {
            counter!("plangate_permission_cache_rejections_total").increment(1);
        }
        stored
    }

    fn entry(
        &self,
        plan_id: StringUuid,
        role_id: StringUuid,
        action_slug: &str,
        allowed: bool,
    ) -> Entry {
        Entry {
            allowed,
            expires_at: Instant::now() + self.inner.ttl,
            plan_id,
            role_id,
            action_slug: action_slug.to_string(),
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut state = self.inner.state.write();
        let removed = state.entries.len();
        let generation = state.generation + 1;
        *state = State {
            generation,
            ..State::default()
        };
        drop(state);
        self.record_invalidation("all", removed);
    }

    /// Drop every decision under a plan
    pub fn invalidate_plan(&self, plan_id: StringUuid) {
        let removed = self.invalidate_with(|state| {
            state.by_plan.get(&plan_id).map(|keys| keys.iter().cloned().collect())
        });
        self.record_invalidation("plan", removed);
    }

    /// Drop every decision for a role, across plans
    pub fn invalidate_role(&self, role_id: StringUuid) {
        let removed = self.invalidate_with(|state| {
            state.by_role.get(&role_id).map(|keys| keys.iter().cloned().collect())
        });
        self.record_invalidation("role", removed);
    }

    /// Drop every decision for an action slug, across plans and roles
    pub fn invalidate_action(&self, action_slug: &str) {
        let removed = self.invalidate_with(|state| {
            state
                .by_action
                .get(action_slug)
                .map(|keys| keys.iter().cloned().collect())
        });
        self.record_invalidation("action", removed);
    }

    /// Drop the decisions of every role for one (plan, action) pair
    pub fn invalidate_plan_action(&self, plan_id: StringUuid, action_slug: &str) {
        let removed = self.invalidate_with(|state| {
            let plan_keys = state.by_plan.get(&plan_id)?;
            let action_keys = state.by_action.get(action_slug)?;
            Some(plan_keys.intersection(action_keys).cloned().collect())
        });
        self.record_invalidation("plan_action", removed);
    }

    /// Drop a single decision
    pub fn invalidate_entry(&self, plan_id: StringUuid, role_id: StringUuid, action_slug: &str) {
        let key = permission_key(plan_id, role_id, action_slug);
        let removed = self.invalidate_with(|_| Some(vec![key]));
        self.record_invalidation("entry", removed);
    }

    fn invalidate_with<F>(&self, select: F) -> usize
    where
        F: FnOnce(&State) -> Option<Vec<String>>,
    {
        let mut state = self.inner.state.write();
        state.generation += 1;
        match select(&*state) {
            Some(keys) => state.remove_all(keys),
            None => 0,
        }
    }

    fn record_invalidation(&self, scope: &'static str, removed: usize) {
        counter!("plangate_permission_cache_invalidations_total", "scope" => scope).increment(1);
        tracing::debug!(scope, removed, "Permission cache invalidated");
    }

    /// Evict expired entries; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut state = self.inner.state.write();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        let removed = state.remove_all(expired);
        gauge!("plangate_permission_cache_entries").set(state.entries.len() as f64);
        removed
    }

    /// Run [`PermissionCache::sweep`] every `interval` until the handle is aborted.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        let mut ticker = tokio::time::interval(interval);
        tokio::spawn(async move {
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired permission cache entries");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
