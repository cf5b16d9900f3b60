//! Version matchers: recognizing and placing dynamic revisions.
//!
//! A dynamic revision (`latest.integration`, `1.+`, `[1.0,2.0[`) is not a
//! concrete version but a request resolved later against what a repository
//! offers. A matcher reports where such a request sits among concrete
//! revisions as a [`DynamicBound`]; the revision comparator ranks on that.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Static revision comparator handed to matchers that need one.
pub type RevisionComparator<'a> = &'a dyn Fn(&str, &str) -> Ordering;

/// The position of a dynamic revision among concrete ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicBound {
    /// Above every concrete revision.
    Unbounded,
    /// Just below this revision and anything equivalent to it.
    Below(String),
    /// Above this revision and every revision repeating its components.
    Above(String),
}

pub trait VersionMatcher: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Where `asked` ranks, or `None` when this matcher treats it as concrete.
    fn bound(&self, asked: &str) -> Option<DynamicBound>;

    fn is_dynamic(&self, asked: &str) -> bool {
        self.bound(asked).is_some()
    }

    /// Whether the concrete `found` revision satisfies `asked`.
    fn accept(&self, asked: &str, found: &str, cmp: RevisionComparator<'_>) -> bool;
}

/// Plain revisions: never dynamic.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactVersionMatcher;

impl VersionMatcher for ExactVersionMatcher {
    fn name(&self) -> &str {
        "exact"
    }

    fn bound(&self, _asked: &str) -> Option<DynamicBound> {
        None
    }

    fn accept(&self, asked: &str, found: &str, _cmp: RevisionComparator<'_>) -> bool {
        asked == found
    }
}

/// `latest.<status>`: whatever the newest published revision turns out to be.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestVersionMatcher;

impl VersionMatcher for LatestVersionMatcher {
    fn name(&self) -> &str {
        "latest"
    }

    fn bound(&self, asked: &str) -> Option<DynamicBound> {
        asked.starts_with("latest.").then_some(DynamicBound::Unbounded)
    }

    fn accept(&self, _asked: &str, _found: &str, _cmp: RevisionComparator<'_>) -> bool {
        true
    }
}

/// `<prefix>+`: any revision starting with the prefix.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubVersionMatcher;

impl VersionMatcher for SubVersionMatcher {
    fn name(&self) -> &str {
        "sub-revision"
    }

    fn bound(&self, asked: &str) -> Option<DynamicBound> {
        let prefix = asked.strip_suffix('+')?;
        Some(DynamicBound::Above(prefix.to_string()))
    }

    fn accept(&self, asked: &str, found: &str, _cmp: RevisionComparator<'_>) -> bool {
        found.starts_with(asked.strip_suffix('+').unwrap_or(asked))
    }
}

/// One end of a [`RevisionRange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub revision: String,
    pub inclusive: bool,
}

/// A revision interval such as `[1.0,2.0[`, `(1.0,2.0)` or `[1.0,)`.
///
/// Both the `[a,b[` / `]a,b]` and the `(a,b)` exclusion conventions are
/// understood. A missing lower bound must be written `(`, a missing upper
/// bound `)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl RevisionRange {
    /// Parse a range expression. Returns `None` for anything that is not a range.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut chars = spec.chars();
        let open = chars.next()?;
        let close = chars.next_back()?;
        if !matches!(open, '[' | ']' | '(') || !matches!(close, ']' | '[' | ')') {
            return None;
        }
        let inner = &spec[open.len_utf8()..spec.len() - close.len_utf8()];
        let (lower, upper) = inner.split_once(',')?;
        let (lower, upper) = (lower.trim(), upper.trim());
        if !is_bound_token(lower) || !is_bound_token(upper) {
            return None;
        }

        let lower = match (lower.is_empty(), open) {
            (true, '(') => None,
            (true, _) => return None,
            (false, _) => Some(Bound {
                revision: lower.to_string(),
                inclusive: open == '[',
            }),
        };
        let upper = match (upper.is_empty(), close) {
            (true, ')') => None,
            (true, _) => return None,
            (false, _) => Some(Bound {
                revision: upper.to_string(),
                inclusive: close == ']',
            }),
        };
        if lower.is_none() && upper.is_none() {
            return None;
        }
        Some(Self { lower, upper })
    }

    /// Whether `found` lies inside the range under the given comparator.
    pub fn contains(&self, found: &str, cmp: RevisionComparator<'_>) -> bool {
        if let Some(ref lower) = self.lower {
            let c = cmp(found, &lower.revision);
            if lower.inclusive {
                if c == Ordering::Less {
                    return false;
                }
            } else if c != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let c = cmp(found, &upper.revision);
            if upper.inclusive {
                if c == Ordering::Greater {
                    return false;
                }
            } else if c != Ordering::Less {
                return false;
            }
        }
        true
    }
}

fn is_bound_token(token: &str) -> bool {
    !token
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, ',' | '[' | ']' | '(' | ')'))
}

impl fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lower {
            Some(b) => write!(f, "{}{}", if b.inclusive { '[' } else { ']' }, b.revision)?,
            None => f.write_str("(")?,
        }
        f.write_str(",")?;
        match &self.upper {
            Some(b) => write!(f, "{}{}", b.revision, if b.inclusive { ']' } else { '[' }),
            None => f.write_str(")"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VersionRangeMatcher;

impl VersionMatcher for VersionRangeMatcher {
    fn name(&self) -> &str {
        "version-range"
    }

    /// Below the upper bound, inclusive or not.
    fn bound(&self, asked: &str) -> Option<DynamicBound> {
        let range = RevisionRange::parse(asked)?;
        Some(match range.upper {
            Some(upper) => DynamicBound::Below(upper.revision),
            None => DynamicBound::Unbounded,
        })
    }

    fn accept(&self, asked: &str, found: &str, cmp: RevisionComparator<'_>) -> bool {
        RevisionRange::parse(asked).is_some_and(|range| range.contains(found, cmp))
    }
}

/// An ordered list of matchers; the first one that recognizes a revision
/// as dynamic handles it.
#[derive(Debug, Clone)]
pub struct ChainVersionMatcher {
    matchers: Vec<Arc<dyn VersionMatcher>>,
}

impl ChainVersionMatcher {
    pub fn new(matchers: Vec<Arc<dyn VersionMatcher>>) -> Self {
        Self { matchers }
    }

    fn dynamic_matcher(&self, asked: &str) -> Option<&Arc<dyn VersionMatcher>> {
        self.matchers.iter().find(|m| m.is_dynamic(asked))
    }
}

impl Default for ChainVersionMatcher {
    /// Range, sub-revision, latest, then exact.
    fn default() -> Self {
        Self::new(vec![
            Arc::new(VersionRangeMatcher),
            Arc::new(SubVersionMatcher),
            Arc::new(LatestVersionMatcher),
            Arc::new(ExactVersionMatcher),
        ])
    }
}

impl VersionMatcher for ChainVersionMatcher {
    fn name(&self) -> &str {
        "chain"
    }

    fn bound(&self, asked: &str) -> Option<DynamicBound> {
        self.matchers.iter().find_map(|m| m.bound(asked))
    }

    fn accept(&self, asked: &str, found: &str, cmp: RevisionComparator<'_>) -> bool {
        match self.dynamic_matcher(asked).or_else(|| self.matchers.last()) {
            Some(m) => m.accept(asked, found, cmp),
            None => asked == found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }

    #[test]
    fn range_parse_finite() {
        let r = RevisionRange::parse("[1.0,2.0]").unwrap();
        assert_eq!(r.lower.as_ref().unwrap().revision, "1.0");
        assert!(r.lower.as_ref().unwrap().inclusive);
        assert!(r.upper.as_ref().unwrap().inclusive);

        let r = RevisionRange::parse("]1.0,2.0[").unwrap();
        assert!(!r.lower.as_ref().unwrap().inclusive);
        assert!(!r.upper.as_ref().unwrap().inclusive);

        let r = RevisionRange::parse("(1.0, 2.0)").unwrap();
        assert!(!r.lower.as_ref().unwrap().inclusive);
        assert_eq!(r.upper.as_ref().unwrap().revision, "2.0");
    }

    #[test]
    fn range_parse_open_ended() {
        let r = RevisionRange::parse("[1.0,)").unwrap();
        assert!(r.upper.is_none());
        let r = RevisionRange::parse("(,2.0]").unwrap();
        assert!(r.lower.is_none());
        assert!(r.upper.unwrap().inclusive);
    }

    #[test]
    fn range_parse_rejects_non_ranges() {
        for s in ["1.0", "[1.0]", "[,2.0]", "[1.0,]", "(,)", "[1 0,2.0]", "", "["] {
            assert!(RevisionRange::parse(s).is_none(), "{s:?}");
        }
    }

    #[test]
    fn range_contains() {
        let r = RevisionRange::parse("[1.0,2.0[").unwrap();
        assert!(r.contains("1.0", &plain));
        assert!(r.contains("1.5", &plain));
        assert!(!r.contains("2.0", &plain));
        assert!(!r.contains("0.9", &plain));
    }

    #[test]
    fn range_display() {
        let r = RevisionRange::parse("(1.0,2.0)").unwrap();
        assert_eq!(r.to_string(), "]1.0,2.0[");
        let r = RevisionRange::parse("(,2.0]").unwrap();
        assert_eq!(r.to_string(), "(,2.0]");
    }

    #[test]
    fn range_bound_is_its_upper_end() {
        let m = VersionRangeMatcher;
        assert_eq!(m.bound("[1.0,)"), Some(DynamicBound::Unbounded));
        assert_eq!(m.bound("[1.0,2.0]"), Some(DynamicBound::Below("2.0".into())));
        assert_eq!(m.bound("]1.0,2.0["), Some(DynamicBound::Below("2.0".into())));
        assert_eq!(m.bound("1.0"), None);
    }

    #[test]
    fn sub_revision() {
        let m = SubVersionMatcher;
        assert!(m.is_dynamic("1.+"));
        assert!(!m.is_dynamic("1.0"));
        assert!(m.accept("1.+", "1.5", &plain));
        assert!(!m.accept("1.+", "2.0", &plain));
        assert_eq!(m.bound("1.+"), Some(DynamicBound::Above("1.".into())));
    }

    #[test]
    fn latest_status() {
        let m = LatestVersionMatcher;
        assert!(m.is_dynamic("latest.integration"));
        assert!(!m.is_dynamic("latest"));
        assert_eq!(m.bound("latest.release"), Some(DynamicBound::Unbounded));
    }

    #[test]
    fn chain_dispatches_to_first_dynamic_matcher() {
        let chain = ChainVersionMatcher::default();
        assert!(chain.is_dynamic("[1.0,2.0]"));
        assert!(chain.is_dynamic("1.+"));
        assert!(chain.is_dynamic("latest.integration"));
        assert!(!chain.is_dynamic("1.0"));

        assert!(chain.accept("1.0", "1.0", &plain));
        assert!(!chain.accept("1.0", "1.1", &plain));
        assert!(chain.accept("[1.0,2.0]", "1.1", &plain));
        assert_eq!(chain.bound("[1.0,)"), Some(DynamicBound::Unbounded));
        assert_eq!(chain.bound("1.+"), Some(DynamicBound::Above("1.".into())));
        assert_eq!(chain.bound("1.0"), None);
    }
}
