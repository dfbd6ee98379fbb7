//! Platform match primitive.
//!
//! The engine never evaluates media queries itself. A host supplies a
//! [`MatchMedia`] capability that turns a query string into a live
//! [`MediaQueryList`]: a current match flag plus change notifications.
//! Browsers, windowing toolkits and terminals each provide their own backend;
//! [`memory::InMemoryMatchMedia`] is a deterministic one for embedded use and tests.

use std::fmt;
use std::sync::Arc;

use crate::error::PlatformError;

/// In-memory viewport-driven backend.
pub mod memory;

pub use memory::{InMemoryMatchMedia, Orientation, Viewport};

/// Callback invoked with the new match flag whenever the platform re-evaluates a query.
pub type MediaListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle identifying one listener attached to a [`MediaQueryList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a backend-assigned id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Live match state for one query string.
///
/// Implementations may deliver notifications synchronously from whatever
/// call caused the re-evaluation, but must not hold internal locks while
/// invoking listeners.
pub trait MediaQueryList: Send + Sync {
    /// The query string this list evaluates.
    fn media(&self) -> &str;

    /// Current match flag.
    fn matches(&self) -> bool;

    /// Attach a change listener.
    fn add_listener(&self, listener: MediaListener) -> ListenerId;

    /// Detach a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);
}

/// Factory for [`MediaQueryList`]s.
pub trait MatchMedia: Send + Sync {
    /// Create a live list for `query`.
    ///
    /// # Errors
    /// `PlatformError::InvalidQuery` for unsupported or malformed queries.
    fn match_media(&self, query: &str) -> Result<Arc<dyn MediaQueryList>, PlatformError>;
}
