//! In-memory platform backend.
//!
//! Evaluates a practical subset of media queries against a settable viewport:
//! comma-separated alternatives, an optional `not`/`only` prefix, a media type
//! (`all`, `screen`, `print`) and `and`-joined features (`min-width`,
//! `max-width`, `min-height`, `max-height` in `px`/`em`, `orientation`).
//! Any query can additionally be forced on or off with an override.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use regex::Regex;

use super::{ListenerId, MatchMedia, MediaListener, MediaQueryList};
use crate::error::PlatformError;

const EM_PX: f64 = 16.0;

static FEATURE_RE: OnceLock<Regex> = OnceLock::new();
static LENGTH_RE: OnceLock<Regex> = OnceLock::new();
static AND_RE: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> Result<&'static Regex, PlatformError> {
    if let Some(re) = cell.get() {
        return Ok(re);
    }
    let re = Regex::new(pattern).map_err(|e| PlatformError::Unavailable {
        message: format!("media grammar failed to compile: {e}"),
    })?;
    Ok(cell.get_or_init(|| re))
}

fn invalid(query: &str, reason: impl Into<String>) -> PlatformError {
    PlatformError::InvalidQuery {
        query: query.to_string(),
        reason: reason.into(),
    }
}

/// Screen orientation derived from the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
}

impl Viewport {
    /// Viewport of `width` by `height` pixels.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Portrait when height is at least width.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        if self.height >= self.width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1024.0, 768.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Feature {
    MinWidth(f64),
    MaxWidth(f64),
    MinHeight(f64),
    MaxHeight(f64),
    Orientation(Orientation),
}

impl Feature {
    fn holds(self, vp: &Viewport) -> bool {
        match self {
            Self::MinWidth(px) => vp.width >= px,
            Self::MaxWidth(px) => vp.width <= px,
            Self::MinHeight(px) => vp.height >= px,
            Self::MaxHeight(px) => vp.height <= px,
            Self::Orientation(o) => vp.orientation() == o,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaType {
    All,
    Screen,
    Print,
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    negated: bool,
    media_type: MediaType,
    features: Vec<Feature>,
}

impl Clause {
    fn holds(&self, vp: &Viewport) -> bool {
        // The in-memory platform always renders to a screen.
        let type_ok = matches!(self.media_type, MediaType::All | MediaType::Screen);
        let result = type_ok && self.features.iter().all(|f| f.holds(vp));
        result != self.negated
    }
}

/// Parsed media query: a disjunction of clauses.
#[derive(Debug, Clone, PartialEq)]
struct MediaCondition {
    clauses: Vec<Clause>,
}

impl MediaCondition {
    fn parse(query: &str) -> Result<Self, PlatformError> {
        let and_re = compiled(&AND_RE, r"(?i)\s+and\s+")?;

        let mut clauses = Vec::new();
        for raw in query.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(invalid(query, "empty clause"));
            }

            let mut clause = Clause {
                negated: false,
                media_type: MediaType::All,
                features: Vec::new(),
            };

            for (idx, part) in and_re.split(raw).enumerate() {
                let part = part.trim();
                if part.starts_with('(') {
                    clause.features.push(parse_feature(query, part)?);
                    continue;
                }
                if idx != 0 {
                    return Err(invalid(query, format!("media type '{part}' must come first")));
                }

                let lowered = part.to_ascii_lowercase();
                let mut words = lowered.split_whitespace();
                let mut word = words.next().unwrap_or_default();
                match word {
                    "not" => {
                        clause.negated = true;
                        word = words.next().unwrap_or_default();
                    }
                    "only" => word = words.next().unwrap_or_default(),
                    _ => {}
                }
                clause.media_type = match word {
                    "all" => MediaType::All,
                    "screen" => MediaType::Screen,
                    "print" => MediaType::Print,
                    other => return Err(invalid(query, format!("unknown media type '{other}'"))),
                };
                if let Some(extra) = words.next() {
                    return Err(invalid(query, format!("unexpected token '{extra}'")));
                }
            }

            clauses.push(clause);
        }

        Ok(Self { clauses })
    }

    fn evaluate(&self, vp: &Viewport) -> bool {
        self.clauses.iter().any(|c| c.holds(vp))
    }
}

fn parse_feature(query: &str, part: &str) -> Result<Feature, PlatformError> {
    let feature_re = compiled(&FEATURE_RE, r"^\(\s*([A-Za-z-]+)\s*:\s*([^()]+?)\s*\)$")?;
    let caps = feature_re
        .captures(part)
        .ok_or_else(|| invalid(query, format!("malformed feature '{part}'")))?;
    let name = caps[1].to_ascii_lowercase();
    let value = caps[2].to_ascii_lowercase();

    let feature = match name.as_str() {
        "min-width" => Feature::MinWidth(parse_length(query, &value)?),
        "max-width" => Feature::MaxWidth(parse_length(query, &value)?),
        "min-height" => Feature::MinHeight(parse_length(query, &value)?),
        "max-height" => Feature::MaxHeight(parse_length(query, &value)?),
        "orientation" => match value.as_str() {
            "portrait" => Feature::Orientation(Orientation::Portrait),
            "landscape" => Feature::Orientation(Orientation::Landscape),
            other => return Err(invalid(query, format!("unknown orientation '{other}'"))),
        },
        other => return Err(invalid(query, format!("unsupported feature '{other}'"))),
    };
    Ok(feature)
}

fn parse_length(query: &str, value: &str) -> Result<f64, PlatformError> {
    let length_re = compiled(&LENGTH_RE, r"^(\d+(?:\.\d+)?)(px|em)$")?;
    let caps = length_re
        .captures(value)
        .ok_or_else(|| invalid(query, format!("unsupported length '{value}'")))?;
    let amount: f64 = caps[1]
        .parse()
        .map_err(|_| invalid(query, format!("bad number in '{value}'")))?;
    Ok(if &caps[2] == "em" { amount * EM_PX } else { amount })
}

#[derive(Default)]
struct Environment {
    viewport: Viewport,
    overrides: HashMap<String, bool>,
    lists: Vec<Weak<InMemoryQueryList>>,
    created: HashMap<String, usize>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct InMemoryQueryList {
    media: String,
    condition: MediaCondition,
    env: Arc<Mutex<Environment>>,
    ids: Arc<AtomicU64>,
    listeners: Mutex<Vec<(ListenerId, MediaListener)>>,
    notified: AtomicBool,
}

impl InMemoryQueryList {
    fn evaluate_in(&self, env: &Environment) -> bool {
        env.overrides
            .get(&self.media)
            .copied()
            .unwrap_or_else(|| self.condition.evaluate(&env.viewport))
    }

    fn notify_if_changed(&self, now: bool) {
        if self.notified.swap(now, Ordering::AcqRel) == now {
            return;
        }
        let listeners: Vec<MediaListener> = lock(&self.listeners).iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(now);
        }
    }
}

impl MediaQueryList for InMemoryQueryList {
    fn media(&self) -> &str {
        &self.media
    }

    fn matches(&self) -> bool {
        self.evaluate_in(&lock(&self.env))
    }

    fn add_listener(&self, listener: MediaListener) -> ListenerId {
        let id = ListenerId::new(self.ids.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        lock(&self.listeners).retain(|(existing, _)| *existing != id);
    }
}

/// Deterministic [`MatchMedia`] backed by a settable viewport.
///
/// Cloning shares the same environment.
#[derive(Clone, Default)]
pub struct InMemoryMatchMedia {
    env: Arc<Mutex<Environment>>,
    ids: Arc<AtomicU64>,
}

impl InMemoryMatchMedia {
    /// Backend with a 1024x768 viewport and no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend starting at `viewport`.
    #[must_use]
    pub fn with_viewport(viewport: Viewport) -> Self {
        let platform = Self::default();
        lock(&platform.env).viewport = viewport;
        platform
    }

    /// Current viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        lock(&self.env).viewport
    }

    /// Resize the viewport and notify every list whose result flipped.
    pub fn set_viewport(&self, width: f64, height: f64) {
        lock(&self.env).viewport = Viewport::new(width, height);
        self.refresh();
    }

    /// Resize keeping the current height.
    pub fn set_width(&self, width: f64) {
        let height = self.viewport().height;
        self.set_viewport(width, height);
    }

    /// Force `query` to match regardless of the viewport.
    pub fn activate(&self, query: &str) {
        lock(&self.env).overrides.insert(query.to_string(), true);
        self.refresh();
    }

    /// Force `query` not to match regardless of the viewport.
    pub fn deactivate(&self, query: &str) {
        lock(&self.env).overrides.insert(query.to_string(), false);
        self.refresh();
    }

    /// Drop any override for `query`, returning it to viewport evaluation.
    pub fn clear_override(&self, query: &str) {
        lock(&self.env).overrides.remove(query);
        self.refresh();
    }

    /// Evaluate `query` against the current environment without creating a list.
    ///
    /// # Errors
    /// `PlatformError::InvalidQuery` if the query cannot be parsed.
    pub fn evaluate(&self, query: &str) -> Result<bool, PlatformError> {
        let condition = MediaCondition::parse(query)?;
        let env = lock(&self.env);
        Ok(env
            .overrides
            .get(query)
            .copied()
            .unwrap_or_else(|| condition.evaluate(&env.viewport)))
    }

    /// Number of lists ever created for `query`.
    #[must_use]
    pub fn lists_created(&self, query: &str) -> usize {
        lock(&self.env).created.get(query).copied().unwrap_or(0)
    }

    /// Listeners currently attached across all live lists for `query`.
    #[must_use]
    pub fn listener_count(&self, query: &str) -> usize {
        self.live_lists()
            .iter()
            .filter(|list| list.media == query)
            .map(|list| lock(&list.listeners).len())
            .sum()
    }

    fn live_lists(&self) -> Vec<Arc<InMemoryQueryList>> {
        let mut env = lock(&self.env);
        env.lists.retain(|weak| weak.strong_count() > 0);
        env.lists.iter().filter_map(Weak::upgrade).collect()
    }

    fn refresh(&self) {
        let evaluated: Vec<(Arc<InMemoryQueryList>, bool)> = {
            let lists = self.live_lists();
            let env = lock(&self.env);
            lists
                .into_iter()
                .map(|list| {
                    let now = list.evaluate_in(&env);
                    (list, now)
                })
                .collect()
        };

        // Listeners run with no platform lock held.
        for (list, now) in evaluated {
            list.notify_if_changed(now);
        }
    }
}

impl MatchMedia for InMemoryMatchMedia {
    fn match_media(&self, query: &str) -> Result<Arc<dyn MediaQueryList>, PlatformError> {
        let condition = MediaCondition::parse(query)?;

        let mut env = lock(&self.env);
        let list = Arc::new(InMemoryQueryList {
            media: query.to_string(),
            condition,
            env: Arc::clone(&self.env),
            ids: Arc::clone(&self.ids),
            listeners: Mutex::new(Vec::new()),
            notified: AtomicBool::new(false),
        });
        let initial = list.evaluate_in(&env);
        list.notified.store(initial, Ordering::Release);

        env.lists.push(Arc::downgrade(&list));
        *env.created.entry(query.to_string()).or_insert(0) += 1;

        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn recorder() -> (MediaListener, Arc<Mutex<Vec<bool>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: MediaListener = Arc::new(move |m| sink.lock().unwrap().push(m));
        (listener, seen)
    }

    #[test]
    fn evaluates_width_ranges() {
        let platform = InMemoryMatchMedia::with_viewport(Viewport::new(800.0, 600.0));
        assert!(platform.evaluate("screen and (min-width: 600px) and (max-width: 959px)").unwrap());
        assert!(!platform.evaluate("(min-width: 960px)").unwrap());
        assert!(platform.evaluate("(max-width: 50em)").unwrap());
        assert!(platform.evaluate("all").unwrap());
        assert!(!platform.evaluate("print").unwrap());
        assert!(platform.evaluate("not print").unwrap());
    }

    #[test]
    fn evaluates_orientation_and_alternatives() {
        let platform = InMemoryMatchMedia::with_viewport(Viewport::new(400.0, 900.0));
        assert!(platform.evaluate("(orientation: portrait)").unwrap());
        assert!(!platform.evaluate("(orientation: landscape)").unwrap());
        assert!(platform.evaluate("(min-width: 2000px), (orientation: portrait)").unwrap());
        assert!(platform.evaluate("only screen AND (max-height: 900px)").unwrap());
    }

    #[test]
    fn rejects_malformed_queries() {
        let platform = InMemoryMatchMedia::new();
        for bad in ["", "(min-width 600px)", "(min-width: wide)", "tv", "(color: 8)", "(min-width: 1px) and screen", "a,"] {
            let err = platform.match_media(bad).err().unwrap();
            assert!(matches!(err, PlatformError::InvalidQuery { .. }), "{bad}: {err:?}");
        }
        assert_eq!(platform.lists_created(""), 0);
    }

    #[test]
    fn notifies_only_on_transitions() {
        let platform = InMemoryMatchMedia::with_viewport(Viewport::new(500.0, 800.0));
        let list = platform.match_media("(min-width: 600px)").unwrap();
        let (listener, seen) = recorder();
        list.add_listener(listener);

        assert!(!list.matches());
        platform.set_width(700.0);
        platform.set_width(720.0);
        platform.set_width(300.0);

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
        assert!(!list.matches());
    }

    #[test]
    fn overrides_win_over_viewport() {
        let platform = InMemoryMatchMedia::with_viewport(Viewport::new(500.0, 800.0));
        let list = platform.match_media("print").unwrap();
        let (listener, seen) = recorder();
        list.add_listener(listener);

        platform.activate("print");
        assert!(list.matches());
        platform.clear_override("print");
        assert!(!list.matches());
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn remove_listener_stops_delivery() {
        let platform = InMemoryMatchMedia::with_viewport(Viewport::new(500.0, 800.0));
        let list = platform.match_media("(min-width: 600px)").unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = list.add_listener(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(platform.listener_count("(min-width: 600px)"), 1);

        list.remove_listener(id);
        platform.set_width(900.0);

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(platform.listener_count("(min-width: 600px)"), 0);
    }

    #[test]
    fn counts_created_lists() {
        let platform = InMemoryMatchMedia::new();
        let _a = platform.match_media("(min-width: 600px)").unwrap();
        let _b = platform.match_media("(min-width: 600px)").unwrap();
        assert_eq!(platform.lists_created("(min-width: 600px)"), 2);
        assert_eq!(platform.lists_created("(max-width: 600px)"), 0);
    }
}
