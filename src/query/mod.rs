//! Query-level observation.
//!
//! The matcher owns the per-query platform lists; the bus fans their
//! transitions out to subscriber streams with latest-value replay.

mod bus;
/// Change event and subscription id types.
pub mod event;
/// Platform list cache and transition republishing.
pub mod matcher;
/// Subscriber stream handle.
pub mod stream;

pub use event::{ChangeEvent, SubscriptionId};
pub use matcher::{QueryMatcher, DEFAULT_STREAM_CAPACITY};
pub use stream::MediaQueryStream;
