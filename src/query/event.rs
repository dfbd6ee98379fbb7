//! Change events and subscription identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::breakpoint::BreakpointDefinition;

/// Unique identifier for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One observed match/unmatch transition.
///
/// Raw events from the query layer carry only `matches` and `media_query`;
/// the observer merges in the owning breakpoint's alias and suffix. Events
/// are never mutated after construction; the builders return new values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Whether the query matches after the transition.
    pub matches: bool,
    /// Query string the transition belongs to.
    pub media_query: String,
    /// Owning breakpoint alias; empty when unlabeled.
    #[serde(default)]
    pub alias: String,
    /// Owning breakpoint suffix.
    #[serde(default)]
    pub suffix: String,
    /// Consumer-supplied payload merged in downstream.
    #[serde(default)]
    pub value: String,
}

impl ChangeEvent {
    /// A raw, unlabeled event for `media_query`.
    #[must_use]
    pub fn raw(matches: bool, media_query: impl Into<String>) -> Self {
        Self {
            matches,
            media_query: media_query.into(),
            alias: String::new(),
            suffix: String::new(),
            value: String::new(),
        }
    }

    /// Copy of this event labeled with `bp`'s alias and suffix.
    #[must_use]
    pub fn merge_alias(&self, bp: &BreakpointDefinition) -> Self {
        Self {
            alias: bp.alias.clone(),
            suffix: bp.suffix.clone(),
            ..self.clone()
        }
    }

    /// Copy of this event carrying `value`.
    #[must_use]
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..self.clone()
        }
    }

    /// True when the event is not attributed to any breakpoint.
    #[must_use]
    pub fn is_unlabeled(&self) -> bool {
        self.alias.is_empty()
    }
}
