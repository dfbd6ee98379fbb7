//! Query matcher.
//!
//! Single source of truth for "is this exact query string currently true".
//! Each distinct query string gets exactly one platform list and one attached
//! listener for the matcher's lifetime; the cache is never evicted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::error::{MediaError, MediaResult};
use crate::platform::{ListenerId, MatchMedia, MediaListener, MediaQueryList};

use super::bus::ChangeBus;
use super::event::ChangeEvent;
use super::stream::MediaQueryStream;

/// Default per-subscriber buffer size.
pub const DEFAULT_STREAM_CAPACITY: usize = 1024;

struct MatchState {
    list: Arc<dyn MediaQueryList>,
    listener: ListenerId,
    matches: Arc<AtomicBool>,
}

#[derive(Default)]
struct MatchCache {
    by_query: HashMap<String, MatchState>,
    order: Vec<String>,
    detached: bool,
}

/// Caches one platform list per query string and republishes its transitions.
pub struct QueryMatcher {
    platform: Arc<dyn MatchMedia>,
    cache: RwLock<MatchCache>,
    bus: Arc<ChangeBus>,
}

impl std::fmt::Debug for QueryMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryMatcher")
            .field("queries", &self.registered_queries())
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl QueryMatcher {
    /// Matcher with the default subscriber buffer size.
    #[must_use]
    pub fn new(platform: Arc<dyn MatchMedia>) -> Self {
        Self::with_capacity(platform, DEFAULT_STREAM_CAPACITY)
    }

    /// Matcher whose subscribers buffer at most `stream_capacity` events each.
    #[must_use]
    pub fn with_capacity(platform: Arc<dyn MatchMedia>, stream_capacity: usize) -> Self {
        Self {
            platform,
            cache: RwLock::new(MatchCache::default()),
            bus: Arc::new(ChangeBus::new(stream_capacity)),
        }
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, MatchCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking `query`. Idempotent per query string.
    ///
    /// A query that already matches is announced immediately so that
    /// subscribers arriving later replay the current state.
    ///
    /// # Errors
    /// Platform failures (malformed or unsupported query) propagate unchanged.
    pub fn register_query(&self, query: &str) -> MediaResult<()> {
        if self.read_cache().by_query.contains_key(query) {
            return Ok(());
        }

        let initially = {
            let mut cache = self
                .cache
                .write()
                .map_err(|_| MediaError::poisoned("match_cache"))?;
            if cache.by_query.contains_key(query) {
                return Ok(());
            }
            if cache.detached {
                return Err(MediaError::internal("query matcher has been shut down"));
            }

            let list = self.platform.match_media(query)?;
            let matches = Arc::new(AtomicBool::new(list.matches()));
            let listener = list.add_listener(self.transition_listener(query, &matches));
            let initially = matches.load(Ordering::Acquire);

            cache.order.push(query.to_string());
            cache.by_query.insert(
                query.to_string(),
                MatchState {
                    list,
                    listener,
                    matches,
                },
            );
            initially
        };

        tracing::debug!(query, matches = initially, "media query registered");
        if initially {
            self.bus.publish(ChangeEvent::raw(true, query))?;
        }
        Ok(())
    }

    fn transition_listener(&self, query: &str, cell: &Arc<AtomicBool>) -> MediaListener {
        let bus = Arc::downgrade(&self.bus);
        let cell = Arc::clone(cell);
        let query = query.to_string();
        Arc::new(move |now: bool| {
            cell.store(now, Ordering::Release);
            let Some(bus) = bus.upgrade() else {
                return;
            };
            if let Err(err) = bus.publish(ChangeEvent::raw(now, query.as_str())) {
                tracing::warn!(query = %query, error = %err, "failed to publish media query transition");
            }
        })
    }

    /// Whether `query` currently matches.
    ///
    /// Never-registered queries are reported inactive rather than registered lazily.
    #[must_use]
    pub fn is_active(&self, query: &str) -> bool {
        match self.read_cache().by_query.get(query) {
            Some(state) => state.matches.load(Ordering::Acquire),
            None => {
                tracing::debug!(query, "is_active on unregistered media query");
                false
            }
        }
    }

    /// Whether `query` has a cached platform list.
    #[must_use]
    pub fn is_registered(&self, query: &str) -> bool {
        self.read_cache().by_query.contains_key(query)
    }

    /// Subscribe to transitions of `query`, or of every registered query when `None`.
    ///
    /// The stream starts with the most recent event visible through the filter.
    ///
    /// # Errors
    /// An internal error if the subscriber table lock is poisoned.
    pub fn observe(&self, query: Option<&str>) -> MediaResult<MediaQueryStream> {
        let filter = query.map(str::to_string);
        let (id, rx) = self.bus.subscribe(filter.clone())?;
        Ok(MediaQueryStream::new(id, filter, rx, Arc::downgrade(&self.bus)))
    }

    /// Registered query strings in registration order.
    #[must_use]
    pub fn registered_queries(&self) -> Vec<String> {
        self.read_cache().order.clone()
    }

    /// Most recent event published for `query`.
    #[must_use]
    pub fn last_event(&self, query: &str) -> Option<ChangeEvent> {
        self.bus.latest_for(query)
    }

    /// Live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    /// Events dropped because a subscriber's buffer was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.bus.dropped_events()
    }

    /// Detach every platform listener. Idempotent; also runs on drop.
    ///
    /// Cached match flags stay readable but no longer update.
    pub fn shutdown(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.detached {
            return;
        }
        cache.detached = true;
        for state in cache.by_query.values() {
            state.list.remove_listener(state.listener);
        }
        tracing::debug!(queries = cache.by_query.len(), "media query listeners detached");
    }
}

impl Drop for QueryMatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
