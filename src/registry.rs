//! Breakpoint registry.
//!
//! Holds the ordered set of breakpoint definitions and answers alias/query
//! lookups. Pure data: no platform access, no interior mutability.

use std::collections::HashMap;

use crate::breakpoint::BreakpointDefinition;
use crate::error::RegistryError;

/// Ordered, validated set of breakpoint definitions.
///
/// Definitions keep their registration order. Each one also carries a
/// precedence rank: its explicit `priority` when given, its registration
/// index otherwise. Higher ranks take precedence when several ranges match;
/// equal ranks are won by the later registration.
#[derive(Debug, Clone, Default)]
pub struct BreakpointRegistry {
    definitions: Vec<BreakpointDefinition>,
    ranks: Vec<i64>,
    // Registration indexes sorted by ascending (rank, index).
    precedence: Vec<usize>,
    by_alias: HashMap<String, usize>,
    by_query: HashMap<String, usize>,
}

impl BreakpointRegistry {
    /// Registry with no definitions.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validates and stores `definitions`.
    ///
    /// # Errors
    /// - `DuplicateAlias` if two definitions share an alias (including two defaults)
    /// - `DuplicateQuery` if two definitions share a media query string
    /// - `EmptyQuery` if a definition has a blank media query
    pub fn register(definitions: Vec<BreakpointDefinition>) -> Result<Self, RegistryError> {
        validate(&definitions)?;

        let ranks: Vec<i64> = definitions
            .iter()
            .enumerate()
            .map(|(idx, bp)| {
                bp.priority
                    .map_or_else(|| i64::try_from(idx).unwrap_or(i64::MAX), i64::from)
            })
            .collect();
        let mut precedence: Vec<usize> = (0..definitions.len()).collect();
        precedence.sort_by_key(|&idx| (ranks[idx], idx));

        let mut by_alias = HashMap::with_capacity(definitions.len());
        let mut by_query = HashMap::with_capacity(definitions.len());
        for (idx, bp) in definitions.iter().enumerate() {
            by_alias.insert(bp.alias.clone(), idx);
            by_query.insert(bp.media_query.clone(), idx);
        }

        tracing::debug!(count = definitions.len(), "breakpoint registry built");
        Ok(Self {
            definitions,
            ranks,
            precedence,
            by_alias,
            by_query,
        })
    }

    /// Definition whose alias is exactly `alias`.
    #[must_use]
    pub fn find_by_alias(&self, alias: &str) -> Option<&BreakpointDefinition> {
        self.by_alias.get(alias).map(|&idx| &self.definitions[idx])
    }

    /// Definition owning exactly the query string `query`.
    #[must_use]
    pub fn find_by_query(&self, query: &str) -> Option<&BreakpointDefinition> {
        self.by_query.get(query).map(|&idx| &self.definitions[idx])
    }

    /// Effective precedence rank of the breakpoint owning `alias`.
    #[must_use]
    pub fn precedence_rank(&self, alias: &str) -> Option<i64> {
        self.by_alias.get(alias).map(|&idx| self.ranks[idx])
    }

    /// All definitions in registration order.
    #[must_use]
    pub fn all(&self) -> &[BreakpointDefinition] {
        &self.definitions
    }

    /// All definitions from lowest to highest precedence.
    pub fn by_precedence(&self) -> impl DoubleEndedIterator<Item = &BreakpointDefinition> {
        self.precedence.iter().map(|&idx| &self.definitions[idx])
    }

    /// Definitions flagged as overlapping, in registration order.
    pub fn overlapping(&self) -> impl DoubleEndedIterator<Item = &BreakpointDefinition> {
        self.definitions.iter().filter(|bp| bp.overlapping)
    }

    /// The first registered definition, treated as the base breakpoint.
    #[must_use]
    pub fn first(&self) -> Option<&BreakpointDefinition> {
        self.definitions.first()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True when no definitions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn validate(definitions: &[BreakpointDefinition]) -> Result<(), RegistryError> {
    let mut seen_alias: HashMap<&str, usize> = HashMap::with_capacity(definitions.len());
    let mut seen_query: HashMap<&str, usize> = HashMap::with_capacity(definitions.len());

    for (idx, bp) in definitions.iter().enumerate() {
        if bp.media_query.trim().is_empty() {
            return Err(RegistryError::EmptyQuery {
                alias: bp.alias.clone(),
            });
        }
        if seen_alias.insert(bp.alias.as_str(), idx).is_some() {
            return Err(RegistryError::DuplicateAlias {
                alias: bp.alias.clone(),
            });
        }
        if let Some(prev) = seen_query.insert(bp.media_query.as_str(), idx) {
            return Err(RegistryError::DuplicateQuery {
                query: bp.media_query.clone(),
                first: definitions[prev].alias.clone(),
                second: bp.alias.clone(),
            });
        }
    }

    Ok(())
}
