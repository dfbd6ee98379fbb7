//! # media-breakpoints - Responsive breakpoint observation
//!
//! Applications declare named breakpoints (alias to media query, e.g.
//! `gt-sm` to `screen and (min-width: 960px)`) and then observe which of them
//! are active as the viewport or device characteristics change.
//!
//! ## Core Concepts
//!
//! - **BreakpointRegistry**: the validated set of definitions with their precedence ranks
//! - **QueryMatcher**: one cached platform listener per distinct query string
//! - **BreakpointObserver**: alias resolution, dominant-breakpoint selection and
//!   alias-labeled change streams
//! - **MatchMedia**: the host's media query primitive, supplied at construction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use media_breakpoints::{stock_breakpoints, BreakpointObserver, InMemoryMatchMedia};
//!
//! let platform = InMemoryMatchMedia::new();
//! let observer = BreakpointObserver::from_definitions(stock_breakpoints(), Arc::new(platform.clone()))?;
//!
//! let stream = observer.observe(Some("gt-sm"))?.activations_only();
//! platform.set_width(1280.0);
//! assert_eq!(stream.recv()?.alias, "gt-sm");
//! assert_eq!(observer.active().map(|bp| bp.alias.as_str()), Some("lg"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod breakpoint;
pub mod error;
pub mod observer;
pub mod platform;
pub mod query;
pub mod registry;

// Re-export primary types at crate root for convenience
pub use breakpoint::{stock_breakpoints, suffix_for, BreakpointDefinition};
pub use error::{MediaError, MediaResult, PlatformError, RegistryError, StreamError};
pub use observer::{BreakpointObserver, BreakpointStream, ObserverConfig};
pub use platform::{InMemoryMatchMedia, ListenerId, MatchMedia, MediaListener, MediaQueryList, Viewport};
pub use query::{ChangeEvent, MediaQueryStream, QueryMatcher, SubscriptionId};
pub use registry::BreakpointRegistry;
