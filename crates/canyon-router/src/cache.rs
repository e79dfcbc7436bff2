//! Route-segment memoization and in-flight request deduplication.

use canyon_core::Coordinate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::hash::Hash;

use crate::directions::RoutedLeg;

/// Cache key for an ordered endpoint pair at 6-decimal precision.
pub fn route_cache_key(from: Coordinate, to: Coordinate) -> String {
    format!("{}|{}", from.key(), to.key())
}

/// Bounded cache of routing-service answers, shared across generation runs.
///
/// When full, an insert of a new key clears every entry first.
#[derive(Debug)]
pub struct RouteSegmentCache {
    entries: DashMap<String, RoutedLeg>,
    max_entries: usize,
}

impl RouteSegmentCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&self, from: Coordinate, to: Coordinate) -> Option<RoutedLeg> {
        self.entries
            .get(&route_cache_key(from, to))
            .map(|entry| entry.value().clone())
    }

    pub fn insert(&self, from: Coordinate, to: Coordinate, leg: RoutedLeg) {
        let key = route_cache_key(from, to);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            tracing::debug!(
                "Route cache full ({} entries), clearing",
                self.entries.len()
            );
            self.entries.clear();
        }
        self.entries.insert(key, leg);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

type SharedResult<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// Map from request signature to a shared in-flight future.
///
/// Concurrent callers with the same key await one underlying operation.
/// Successful results stay memoized for the life of the map; failures are
/// evicted on settlement so the next caller starts over.
pub struct InflightMap<K, V, E>
where
    K: Eq + Hash,
{
    entries: DashMap<K, SharedResult<V, E>>,
}

impl<K, V, E> Default for InflightMap<K, V, E>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K, V, E> InflightMap<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the entry for `key`, starting it with `start` if none exists.
    pub async fn get_or_insert_with<F, Fut>(&self, key: K, start: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let shared = match self.entries.entry(key.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let shared = start().boxed().shared();
                entry.insert(shared.clone());
                shared
            }
        };

        let result = shared.clone().await;
        if result.is_err() {
            self.entries
                .remove_if(&key, |_, current| current.ptr_eq(&shared));
        }
        result
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
