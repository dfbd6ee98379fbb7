//! Breakpoint definitions.
//!
//! A breakpoint binds a short alias (`gt-sm`) to a media query expression
//! (`screen and (min-width: 960px)`). Definitions are immutable values; the
//! registry assigns their precedence rank at registration time.

use serde::{Deserialize, Serialize};

/// A named media-query range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointDefinition {
    /// Consumer-facing key. Empty only for the single default breakpoint.
    pub alias: String,
    /// Platform query expression.
    pub media_query: String,
    /// Consumer-side naming suffix, e.g. `GtSm`.
    #[serde(default)]
    pub suffix: String,
    /// Open-ended range that can be active alongside others.
    #[serde(default)]
    pub overlapping: bool,
    /// Explicit precedence override; registration order when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl BreakpointDefinition {
    /// Creates a discrete (non-overlapping) breakpoint with an empty suffix.
    #[must_use]
    pub fn new(alias: impl Into<String>, media_query: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            media_query: media_query.into(),
            suffix: String::new(),
            overlapping: false,
            priority: None,
        }
    }

    /// Creates the default (alias-less) breakpoint.
    #[must_use]
    pub fn fallback(media_query: impl Into<String>) -> Self {
        Self::new("", media_query)
    }

    /// Sets an explicit suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Sets the suffix from the alias: `gt-sm` becomes `GtSm`.
    #[must_use]
    pub fn with_derived_suffix(mut self) -> Self {
        self.suffix = suffix_for(&self.alias);
        self
    }

    /// Marks this breakpoint as an open-ended overlapping range.
    #[must_use]
    pub const fn overlapping(mut self) -> Self {
        self.overlapping = true;
        self
    }

    /// Overrides the precedence rank.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// True for the implicit default breakpoint.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.alias.is_empty()
    }
}

/// Upper camel case of a dash-separated alias.
#[must_use]
pub fn suffix_for(alias: &str) -> String {
    alias
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect()
}

/// The conventional breakpoint set, registered narrow-to-broad per tier so
/// that later (more specific) ranges win ties.
#[must_use]
pub fn stock_breakpoints() -> Vec<BreakpointDefinition> {
    let discrete = |alias: &str, query: &str| BreakpointDefinition::new(alias, query).with_derived_suffix();
    let open = |alias: &str, query: &str| discrete(alias, query).overlapping();

    vec![
        BreakpointDefinition::fallback("all"),
        discrete("xs", "screen and (max-width: 599px)"),
        open("gt-xs", "screen and (min-width: 600px)"),
        discrete("sm", "screen and (min-width: 600px) and (max-width: 959px)"),
        open("gt-sm", "screen and (min-width: 960px)"),
        discrete("md", "screen and (min-width: 960px) and (max-width: 1279px)"),
        open("gt-md", "screen and (min-width: 1280px)"),
        discrete("lg", "screen and (min-width: 1280px) and (max-width: 1919px)"),
        open("gt-lg", "screen and (min-width: 1920px)"),
        discrete("xl", "screen and (min-width: 1920px) and (max-width: 5000px)"),
    ]
}
