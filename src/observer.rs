//! Breakpoint observer.
//!
//! Facade that translates between the alias-centric view consumers want and
//! the query-centric view the matcher provides, and resolves the dominant
//! breakpoint when several ranges match at once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::breakpoint::BreakpointDefinition;
use crate::error::{MediaResult, StreamError};
use crate::platform::MatchMedia;
use crate::query::{ChangeEvent, MediaQueryStream, QueryMatcher, SubscriptionId, DEFAULT_STREAM_CAPACITY};
use crate::registry::BreakpointRegistry;

/// Observer tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Per-subscription stream buffer capacity.
    pub stream_capacity: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }
}

/// Alias-aware view over a [`QueryMatcher`].
#[derive(Debug)]
pub struct BreakpointObserver {
    registry: Arc<BreakpointRegistry>,
    matcher: QueryMatcher,
}

impl BreakpointObserver {
    /// Build an observer and register every breakpoint query, in registration order.
    ///
    /// Queries that already match are announced before this returns.
    ///
    /// # Errors
    /// A platform failure on any definition aborts construction.
    pub fn new(registry: BreakpointRegistry, platform: Arc<dyn MatchMedia>) -> MediaResult<Self> {
        Self::with_config(registry, platform, &ObserverConfig::default())
    }

    /// Like [`Self::new`], with explicit tuning.
    ///
    /// # Errors
    /// A platform failure on any definition aborts construction.
    pub fn with_config(
        registry: BreakpointRegistry,
        platform: Arc<dyn MatchMedia>,
        config: &ObserverConfig,
    ) -> MediaResult<Self> {
        let matcher = QueryMatcher::with_capacity(platform, config.stream_capacity);
        for bp in registry.all() {
            matcher.register_query(&bp.media_query)?;
        }
        tracing::debug!(breakpoints = registry.len(), "breakpoint observer ready");

        Ok(Self {
            registry: Arc::new(registry),
            matcher,
        })
    }

    /// Validate `definitions` and build an observer over them.
    ///
    /// # Errors
    /// Registry validation failures, then platform failures.
    pub fn from_definitions(
        definitions: Vec<BreakpointDefinition>,
        platform: Arc<dyn MatchMedia>,
    ) -> MediaResult<Self> {
        Self::new(BreakpointRegistry::register(definitions)?, platform)
    }

    /// Resolve an alias first, then a literal query owned by a breakpoint.
    #[must_use]
    pub fn find(&self, alias_or_query: &str) -> Option<&BreakpointDefinition> {
        self.registry
            .find_by_alias(alias_or_query)
            .or_else(|| self.registry.find_by_query(alias_or_query))
    }

    fn resolve_query<'a>(&'a self, alias_or_query: &'a str) -> &'a str {
        match self.find(alias_or_query) {
            Some(bp) => bp.media_query.as_str(),
            None => {
                tracing::debug!(input = alias_or_query, "unresolved breakpoint alias, treating as literal query");
                alias_or_query
            }
        }
    }

    /// Whether the breakpoint (or literal query) is currently active.
    ///
    /// Unknown aliases and unregistered queries are inactive.
    #[must_use]
    pub fn is_active(&self, alias_or_query: &str) -> bool {
        self.matcher.is_active(self.resolve_query(alias_or_query))
    }

    /// Subscribe to one breakpoint, or to every registered query when `None`.
    ///
    /// Both activations and deactivations are delivered; see
    /// [`BreakpointStream::activations_only`] to narrow.
    ///
    /// # Errors
    /// An internal error if the subscriber table lock is poisoned.
    pub fn observe(&self, alias_or_query: Option<&str>) -> MediaResult<BreakpointStream> {
        let query = alias_or_query.map(|input| self.resolve_query(input));
        let inner = self.matcher.observe(query)?;
        Ok(BreakpointStream::new(inner, Arc::clone(&self.registry)))
    }

    /// The dominant active breakpoint.
    ///
    /// Scans non-default breakpoints from highest precedence down; the
    /// first active one wins. Falls back to the first-registered breakpoint
    /// when it is active, otherwise nothing is active.
    #[must_use]
    pub fn active(&self) -> Option<&BreakpointDefinition> {
        self.registry
            .by_precedence()
            .rev()
            .filter(|bp| !bp.is_default())
            .find(|bp| self.matcher.is_active(&bp.media_query))
            .or_else(|| {
                self.registry
                    .first()
                    .filter(|bp| self.matcher.is_active(&bp.media_query))
            })
    }

    /// Every active overlapping breakpoint, highest precedence first.
    #[must_use]
    pub fn active_overlaps(&self) -> Vec<&BreakpointDefinition> {
        self.registry
            .by_precedence()
            .rev()
            .filter(|bp| bp.overlapping && self.matcher.is_active(&bp.media_query))
            .collect()
    }

    /// Copy of every definition in registration order.
    #[must_use]
    pub fn breakpoints(&self) -> Vec<BreakpointDefinition> {
        self.registry.all().to_vec()
    }

    /// The validated definitions.
    #[must_use]
    pub fn registry(&self) -> &BreakpointRegistry {
        &self.registry
    }

    /// The underlying query matcher.
    #[must_use]
    pub fn matcher(&self) -> &QueryMatcher {
        &self.matcher
    }

    /// Detach all platform listeners.
    pub fn shutdown(&self) {
        self.matcher.shutdown();
    }
}

/// Alias-labeled change stream.
///
/// Wraps a query-level stream and merges the owning breakpoint's alias and
/// suffix into each event on receipt. Events for queries no breakpoint owns
/// pass through unlabeled.
#[derive(Debug)]
pub struct BreakpointStream {
    inner: MediaQueryStream,
    registry: Arc<BreakpointRegistry>,
    activations_only: bool,
    value: Option<String>,
}

impl BreakpointStream {
    fn new(inner: MediaQueryStream, registry: Arc<BreakpointRegistry>) -> Self {
        Self {
            inner,
            registry,
            activations_only: false,
            value: None,
        }
    }

    /// Skip deactivation events.
    #[must_use]
    pub fn activations_only(mut self) -> Self {
        self.activations_only = true;
        self
    }

    /// Stamp `value` onto every delivered event.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    fn accepts(&self, raw: &ChangeEvent) -> bool {
        !self.activations_only || raw.matches
    }

    fn enrich(&self, raw: ChangeEvent) -> ChangeEvent {
        let labeled = match self.registry.find_by_query(&raw.media_query) {
            Some(bp) => raw.merge_alias(bp),
            None => raw,
        };
        match &self.value {
            Some(value) => labeled.with_value(value.as_str()),
            None => labeled,
        }
    }

    /// The subscription id backing this stream.
    #[must_use]
    pub const fn subscription_id(&self) -> SubscriptionId {
        self.inner.subscription_id()
    }

    /// Receive the next event (blocking).
    ///
    /// # Errors
    /// `StreamError::Disconnected` once the matcher is gone and the buffer is empty.
    pub fn recv(&self) -> MediaResult<ChangeEvent> {
        loop {
            let raw = self.inner.recv()?;
            if self.accepts(&raw) {
                return Ok(self.enrich(raw));
            }
        }
    }

    /// Receive the next event, waiting at most `timeout` overall.
    ///
    /// # Errors
    /// `StreamError::Timeout` when no accepted event arrives in time,
    /// `StreamError::Disconnected` once the matcher is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> MediaResult<ChangeEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let raw = self.inner.recv_timeout(remaining).map_err(|err| {
                if err.is_retryable() {
                    StreamError::Timeout {
                        duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    }
                    .into()
                } else {
                    err
                }
            })?;
            if self.accepts(&raw) {
                return Ok(self.enrich(raw));
            }
        }
    }

    /// Next buffered event, if any. Never blocks.
    ///
    /// # Errors
    /// `StreamError::Disconnected` once the matcher is gone and the buffer is empty.
    pub fn try_recv(&self) -> MediaResult<Option<ChangeEvent>> {
        while let Some(raw) = self.inner.try_recv()? {
            if self.accepts(&raw) {
                return Ok(Some(self.enrich(raw)));
            }
        }
        Ok(None)
    }

    /// Every event currently buffered, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.inner
            .drain()
            .into_iter()
            .filter(|raw| self.accepts(raw))
            .map(|raw| self.enrich(raw))
            .collect()
    }

    /// Stop receiving new events. Idempotent; also runs on drop.
    pub fn unsubscribe(&self) {
        self.inner.unsubscribe();
    }

    /// True once [`Self::unsubscribe`] has run.
    #[must_use]
    pub fn is_unsubscribed(&self) -> bool {
        self.inner.is_unsubscribed()
    }
}
