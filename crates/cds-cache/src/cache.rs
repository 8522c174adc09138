//! Entity cache backed by a persistent ordered map
//!
//! Writers swap a new map version in under a short write lock; readers
//! either look up single entries or take a [`CacheSnapshot`], which is an
//! O(1) structural clone.

use crate::key::CacheKey;
use cds_model::ProjectKey;
use chrono::{DateTime, Utc};
use im::OrdMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Cached value plus session metadata
#[derive(Debug)]
pub struct CacheEntry<E> {
    /// Last-known-good server representation
    pub value: Arc<E>,
    /// Set when another actor changed the entity since it was fetched
    pub external_change: bool,
    /// When the value was last fetched from the server
    pub loaded_at: DateTime<Utc>,
}

impl<E> Clone for CacheEntry<E> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            external_change: self.external_change,
            loaded_at: self.loaded_at,
        }
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: usize,
    /// Entries carrying the external-change flag
    pub external_count: usize,
}

struct CacheState<E> {
    entries: OrdMap<CacheKey, CacheEntry<E>>,
    scope: Option<ProjectKey>,
}

/// Cache of one entity kind, keyed by `(project, name)`
///
/// Unbounded; lives as long as the console session.
pub struct EntityCache<E> {
    inner: RwLock<CacheState<E>>,
}

impl<E> std::fmt::Debug for EntityCache<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read();
        f.debug_struct("EntityCache")
            .field("scope", &state.scope)
            .field("entries", &state.entries.len())
            .finish()
    }
}

impl<E> Default for EntityCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EntityCache<E> {
    /// Create empty cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CacheState {
                entries: OrdMap::new(),
                scope: None,
            }),
        }
    }

    /// Cached value
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<E>> {
        self.inner.read().entries.get(key).map(|e| Arc::clone(&e.value))
    }

    /// Cached value with its metadata
    #[must_use]
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry<E>> {
        self.inner.read().entries.get(key).cloned()
    }

    /// Whether a value is cached under `key`
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.read().entries.contains_key(key)
    }

    /// Store the result of a local or remote mutation
    ///
    /// The external-change flag of an existing entry is kept: only a fresh
    /// fetch clears it.
    pub fn put(&self, key: CacheKey, value: E) -> Arc<E> {
        let value = Arc::new(value);
        let mut state = self.inner.write();
        let (external_change, loaded_at) = state
            .entries
            .get(&key)
            .map_or((false, Utc::now()), |e| (e.external_change, e.loaded_at));
        tracing::debug!(%key, "cache put");
        state.entries.insert(
            key,
            CacheEntry {
                value: Arc::clone(&value),
                external_change,
                loaded_at,
            },
        );
        value
    }

    /// Store a value freshly fetched from the server, clearing its flag
    pub fn load(&self, key: CacheKey, value: E) -> Arc<E> {
        let value = Arc::new(value);
        tracing::debug!(%key, "cache load");
        self.inner.write().entries.insert(
            key,
            CacheEntry {
                value: Arc::clone(&value),
                external_change: false,
                loaded_at: Utc::now(),
            },
        );
        value
    }

    /// Move an entry to a new key and store the renamed value
    ///
    /// Both steps happen under one write lock, so no reader observes the
    /// entity under both names or under neither.
    pub fn rekey(&self, from: &CacheKey, to: CacheKey, value: E) -> Arc<E> {
        let value = Arc::new(value);
        let mut state = self.inner.write();
        let previous = state.entries.remove(from);
        let (external_change, loaded_at) = previous
            .map_or((false, Utc::now()), |e| (e.external_change, e.loaded_at));
        tracing::debug!(%from, %to, "cache rekey");
        state.entries.insert(
            to,
            CacheEntry {
                value: Arc::clone(&value),
                external_change,
                loaded_at,
            },
        );
        value
    }

    /// Remove an entry
    pub fn evict(&self, key: &CacheKey) -> Option<Arc<E>> {
        let removed = self.inner.write().entries.remove(key);
        if removed.is_some() {
            tracing::debug!(%key, "cache evict");
        }
        removed.map(|e| e.value)
    }

    /// Remove every entry of a project, returning how many were dropped
    pub fn evict_scope(&self, project: &ProjectKey) -> usize {
        let mut state = self.inner.write();
        let before = state.entries.len();
        state.entries = state
            .entries
            .iter()
            .filter(|(key, _)| &key.project != project)
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        let evicted = before - state.entries.len();
        if evicted > 0 {
            tracing::debug!(%project, evicted, "cache scope evicted");
        }
        evicted
    }

    /// Make `project` the active scope
    ///
    /// Switching to another project drops every entry; returns whether that
    /// happened.
    pub fn enter_scope(&self, project: &ProjectKey) -> bool {
        let mut state = self.inner.write();
        match &state.scope {
            Some(current) if current == project => false,
            Some(current) => {
                tracing::debug!(from = %current, to = %project, "cache scope switch");
                state.entries = OrdMap::new();
                state.scope = Some(project.clone());
                true
            }
            None => {
                state.scope = Some(project.clone());
                false
            }
        }
    }

    /// Active project scope
    #[must_use]
    pub fn scope(&self) -> Option<ProjectKey> {
        self.inner.read().scope.clone()
    }

    /// Raise the external-change flag
    ///
    /// Returns `false` when nothing is cached under `key`.
    pub fn mark_external(&self, key: &CacheKey) -> bool {
        let mut state = self.inner.write();
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.external_change = true;
                tracing::debug!(%key, "cache entry marked external");
                true
            }
            None => false,
        }
    }

    /// Whether the external-change flag is raised
    #[must_use]
    pub fn is_external(&self, key: &CacheKey) -> bool {
        self.inner
            .read()
            .entries
            .get(key)
            .is_some_and(|e| e.external_change)
    }

    /// Persistent copy of the whole cache
    #[must_use]
    pub fn snapshot(&self) -> CacheSnapshot<E> {
        CacheSnapshot {
            entries: self.inner.read().entries.clone(),
        }
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether the cache holds nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// All keys, in order
    #[must_use]
    pub fn keys(&self) -> Vec<CacheKey> {
        self.inner.read().entries.keys().cloned().collect()
    }

    /// Drop every entry and the scope
    pub fn clear(&self) {
        let mut state = self.inner.write();
        state.entries = OrdMap::new();
        state.scope = None;
    }

    /// Cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.read();
        CacheStats {
            entry_count: state.entries.len(),
            external_count: state.entries.values().filter(|e| e.external_change).count(),
        }
    }
}

/// Immutable view of a cache at one point in time
#[derive(Debug)]
pub struct CacheSnapshot<E> {
    entries: OrdMap<CacheKey, CacheEntry<E>>,
}

impl<E> Clone for CacheSnapshot<E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<E> CacheSnapshot<E> {
    /// Value at the time of the snapshot
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&Arc<E>> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Whether the flag was raised at the time of the snapshot
    #[must_use]
    pub fn is_external(&self, key: &CacheKey) -> bool {
        self.entries.get(key).is_some_and(|e| e.external_change)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &Arc<E>)> {
        self.entries.iter().map(|(k, e)| (k, &e.value))
    }
}
