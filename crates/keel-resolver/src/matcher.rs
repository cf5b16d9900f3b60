//! Pattern matchers: compile a pattern string once, test candidates many times.
//!
//! Five kinds exist (exact, regexp, glob, exact-or-regexp, any). Every kind
//! short-circuits the `*` expression to an always-true matcher without
//! touching the regex or glob engine. Compiled matchers are cached per
//! [`PatternMatcher`] and shared through `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use fancy_regex::Regex;
use globset::{GlobBuilder, GlobMatcher};
use keel_core::config::MatcherKind;
use keel_util::errors::{KeelError, KeelResult};
use parking_lot::RwLock;

/// The expression every matcher kind treats as "match anything".
pub const ANY_EXPRESSION: &str = "*";

const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}', '\\'];

/// A compiled pattern.
#[derive(Debug)]
pub enum Matcher {
    /// Always true, never exact.
    Any,
    Exact(String),
    Regexp(Regex),
    /// `None` when the glob failed to compile; such a matcher never matches.
    Glob {
        glob: Option<GlobMatcher>,
        exact: bool,
    },
    ExactOrRegexp {
        expression: String,
        regex: Regex,
    },
}

impl Matcher {
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expression) => expression == candidate,
            Self::Regexp(regex) => regex_matches(regex, candidate),
            Self::Glob { glob, .. } => glob.as_ref().is_some_and(|g| g.is_match(candidate)),
            Self::ExactOrRegexp { expression, regex } => {
                expression == candidate || regex_matches(regex, candidate)
            }
        }
    }

    /// Like [`Matcher::matches`], for callers holding an optional value.
    ///
    /// A missing candidate is a caller error, not a non-match.
    pub fn matches_value(&self, candidate: Option<&str>) -> KeelResult<bool> {
        match candidate {
            Some(c) => Ok(self.matches(c)),
            None => Err(KeelError::InvalidArgument {
                message: "cannot match a missing value".to_string(),
            }),
        }
    }

    /// Whether this matcher only ever accepts one literal string.
    pub fn is_exact(&self) -> bool {
        match self {
            Self::Exact(_) => true,
            Self::Glob { exact, .. } => *exact,
            Self::Any | Self::Regexp(_) | Self::ExactOrRegexp { .. } => false,
        }
    }
}

/// Compile `expression` as a pattern of the given kind.
pub fn compile(kind: MatcherKind, expression: &str) -> KeelResult<Matcher> {
    compile_inner(kind, expression).map_err(|message| KeelError::InvalidPattern {
        kind: kind.builtin_name().to_string(),
        pattern: expression.to_string(),
        message,
    })
}

fn compile_inner(kind: MatcherKind, expression: &str) -> Result<Matcher, String> {
    if expression == ANY_EXPRESSION {
        return Ok(Matcher::Any);
    }
    match kind {
        MatcherKind::Any => Ok(Matcher::Any),
        MatcherKind::Exact => Ok(Matcher::Exact(expression.to_string())),
        MatcherKind::Regexp => anchored(expression).map(Matcher::Regexp),
        MatcherKind::Glob => Ok(compile_glob(expression)),
        MatcherKind::ExactOrRegexp => Ok(Matcher::ExactOrRegexp {
            expression: expression.to_string(),
            regex: anchored(expression)?,
        }),
    }
}

fn anchored(expression: &str) -> Result<Regex, String> {
    Regex::new(&format!("^(?:{expression})$")).map_err(|e| e.to_string())
}

/// A pattern that exhausts the backtracking limit counts as not matching.
fn regex_matches(regex: &Regex, candidate: &str) -> bool {
    regex.is_match(candidate).unwrap_or_else(|e| {
        tracing::warn!("pattern '{}' gave up on '{candidate}': {e}", regex.as_str());
        false
    })
}

fn compile_glob(expression: &str) -> Matcher {
    let built = GlobBuilder::new(expression)
        .literal_separator(false)
        .backslash_escape(true)
        .build();
    match built {
        Ok(glob) => Matcher::Glob {
            glob: Some(glob.compile_matcher()),
            exact: !expression.contains(GLOB_META),
        },
        Err(e) => {
            tracing::error!("impossible to compile glob pattern '{expression}': {e}");
            Matcher::Glob {
                glob: None,
                exact: false,
            }
        }
    }
}

/// A named matcher kind with a cache of compiled expressions.
///
/// Lookups take a shared lock; a miss takes the write lock, re-checks, and
/// compiles once.
pub struct PatternMatcher {
    name: String,
    kind: MatcherKind,
    cache: RwLock<HashMap<String, Arc<Matcher>>>,
    any: Arc<Matcher>,
}

impl PatternMatcher {
    pub fn new(name: impl Into<String>, kind: MatcherKind) -> Self {
        Self {
            name: name.into(),
            kind,
            cache: RwLock::new(HashMap::new()),
            any: Arc::new(Matcher::Any),
        }
    }

    /// The matcher registered under the kind's built-in name.
    pub fn builtin(kind: MatcherKind) -> Self {
        Self::new(kind.builtin_name(), kind)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MatcherKind {
        self.kind
    }

    /// Compiled matcher for `expression`, from cache when possible.
    pub fn get_matcher(&self, expression: &str) -> KeelResult<Arc<Matcher>> {
        if expression == ANY_EXPRESSION {
            return Ok(Arc::clone(&self.any));
        }
        if let Some(m) = self.cache.read().get(expression) {
            return Ok(Arc::clone(m));
        }
        let mut cache = self.cache.write();
        if let Some(m) = cache.get(expression) {
            return Ok(Arc::clone(m));
        }
        let compiled = Arc::new(compile(self.kind, expression)?);
        cache.insert(expression.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Number of cached compiled expressions.
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

impl fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A pattern string tagged with its matcher kind, compiled on first use.
#[derive(Debug)]
pub struct MatchExpression {
    kind: MatcherKind,
    expression: String,
    compiled: OnceLock<Result<Matcher, String>>,
}

impl MatchExpression {
    pub fn new(kind: MatcherKind, expression: impl Into<String>) -> Self {
        Self {
            kind,
            expression: expression.into(),
            compiled: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> MatcherKind {
        self.kind
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn matcher(&self) -> KeelResult<&Matcher> {
        let compiled = self
            .compiled
            .get_or_init(|| compile_inner(self.kind, &self.expression));
        compiled.as_ref().map_err(|message| KeelError::InvalidPattern {
            kind: self.kind.builtin_name().to_string(),
            pattern: self.expression.clone(),
            message: message.clone(),
        })
    }

    pub fn matches(&self, candidate: &str) -> KeelResult<bool> {
        Ok(self.matcher()?.matches(candidate))
    }
}

impl Clone for MatchExpression {
    fn clone(&self) -> Self {
        Self::new(self.kind, self.expression.clone())
    }
}

impl fmt::Display for MatchExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.expression, self.kind.builtin_name())
    }
}
