//! Latest strategies: ranking revisions and picking the most preferred one.
//!
//! `sort` returns candidates oldest first, latest last. `find_latest` walks
//! that order from the back and returns the first candidate published
//! before the cutoff, if one is given.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use keel_core::artifact::ArtifactInfo;
use keel_util::errors::{KeelError, KeelResult};

use crate::version::{ChainVersionMatcher, DynamicBound, VersionMatcher};

pub const LATEST_REVISION: &str = "latest-revision";
pub const LATEST_LEXICO: &str = "latest-lexico";
pub const LATEST_TIME: &str = "latest-time";

/// Built-in ranks for non-numeric revision components.
pub const DEFAULT_SPECIAL_MEANINGS: [(&str, i32); 3] = [("dev", -1), ("rc", 1), ("final", 2)];

/// Comparator over artifact views, for [`ComparatorLatestStrategy`].
pub type InfoComparator = dyn Fn(&dyn ArtifactInfo, &dyn ArtifactInfo) -> Ordering + Send + Sync;

/// A named strategy family. See the variant types for the ordering rules.
#[derive(Debug)]
pub enum LatestStrategy {
    Comparator(ComparatorLatestStrategy),
    Lexicographic(LatestLexicographicStrategy),
    Revision(LatestRevisionStrategy),
    Time(LatestTimeStrategy),
    Workspace(WorkspaceLatestStrategy),
}

impl LatestStrategy {
    pub fn name(&self) -> &str {
        match self {
            Self::Comparator(s) => &s.name,
            Self::Lexicographic(s) => &s.name,
            Self::Revision(s) => &s.name,
            Self::Time(s) => &s.name,
            Self::Workspace(s) => &s.name,
        }
    }

    /// Order two candidates; `Greater` means `a` is more preferred.
    pub fn compare(&self, a: &dyn ArtifactInfo, b: &dyn ArtifactInfo) -> Ordering {
        match self {
            Self::Comparator(s) => (s.comparator)(a, b),
            Self::Lexicographic(_) => compare_lexicographic(a.revision(), b.revision()),
            Self::Revision(s) => s.compare(a.revision(), b.revision()),
            Self::Time(_) => a.last_modified().cmp(&b.last_modified()),
            Self::Workspace(s) => s.delegate.compare(a, b),
        }
    }

    /// Stable sort, least preferred first.
    pub fn sort<'a, A: ArtifactInfo>(&self, infos: &'a [A]) -> Vec<&'a A> {
        if let Self::Workspace(s) = self {
            return s.sort(infos);
        }
        let mut sorted: Vec<&A> = infos.iter().collect();
        sorted.sort_by(|a, b| self.compare(*a, *b));
        sorted
    }

    /// The most preferred candidate published before `cutoff` (epoch millis).
    pub fn find_latest<'a, A: ArtifactInfo>(
        &self,
        infos: &'a [A],
        cutoff: Option<i64>,
    ) -> Option<&'a A> {
        self.sort(infos).into_iter().rev().find(|info| match cutoff {
            None => true,
            Some(date) => self.published_before(info.last_modified(), date),
        })
    }

    fn published_before(&self, last_modified: i64, cutoff: i64) -> bool {
        match self {
            Self::Time(_) => last_modified <= cutoff,
            _ => last_modified < cutoff,
        }
    }
}

impl fmt::Display for LatestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ranks with a caller-supplied comparator.
#[derive(Clone)]
pub struct ComparatorLatestStrategy {
    name: String,
    comparator: Arc<InfoComparator>,
}

impl ComparatorLatestStrategy {
    pub fn new(name: impl Into<String>, comparator: Arc<InfoComparator>) -> Self {
        Self {
            name: name.into(),
            comparator,
        }
    }
}

impl fmt::Debug for ComparatorLatestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparatorLatestStrategy")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Plain string order, with `latest*` above everything and `prefix+` above
/// anything sharing its prefix.
#[derive(Debug, Clone)]
pub struct LatestLexicographicStrategy {
    name: String,
}

impl LatestLexicographicStrategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LatestLexicographicStrategy {
    fn default() -> Self {
        Self::new(LATEST_LEXICO)
    }
}

pub fn compare_lexicographic(rev1: &str, rev2: &str) -> Ordering {
    match (rev1.starts_with("latest"), rev2.starts_with("latest")) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (true, true) => return rev1.cmp(rev2),
        (false, false) => {}
    }
    let (prefix1, open1) = open_prefix(rev1);
    let (prefix2, open2) = open_prefix(rev2);
    let common = prefix1.len().min(prefix2.len());
    match prefix1.as_bytes()[..common].cmp(&prefix2.as_bytes()[..common]) {
        Ordering::Equal => {}
        other => return other,
    }
    // An open prefix outranks every string continuing it.
    match prefix1.len().cmp(&prefix2.len()) {
        Ordering::Less if open1 => Ordering::Greater,
        Ordering::Less => Ordering::Less,
        Ordering::Greater if open2 => Ordering::Less,
        Ordering::Greater => Ordering::Greater,
        Ordering::Equal => open1.cmp(&open2),
    }
}

/// `1.+` is the open prefix `1.`.
fn open_prefix(revision: &str) -> (&str, bool) {
    match revision.strip_suffix('+') {
        Some(prefix) => (prefix, true),
        None => (revision, false),
    }
}

/// Orders by publication timestamp only.
#[derive(Debug, Clone)]
pub struct LatestTimeStrategy {
    name: String,
}

impl LatestTimeStrategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LatestTimeStrategy {
    fn default() -> Self {
        Self::new(LATEST_TIME)
    }
}

/// Version-aware ordering of revision strings.
///
/// Revisions are split into components at `.`, `_`, `-`, `+` and at every
/// letter/digit boundary, then compared component by component. Non-numeric
/// components are ranked through the special-meanings table.
pub struct LatestRevisionStrategy {
    name: String,
    version_matcher: Arc<dyn VersionMatcher>,
    use_default_special_meanings: bool,
    configured: Vec<(String, i32)>,
    special_meanings: OnceLock<HashMap<String, i32>>,
}

impl LatestRevisionStrategy {
    pub fn new(name: impl Into<String>, version_matcher: Arc<dyn VersionMatcher>) -> Self {
        Self {
            name: name.into(),
            version_matcher,
            use_default_special_meanings: true,
            configured: Vec::new(),
            special_meanings: OnceLock::new(),
        }
    }

    pub fn add_special_meaning(&mut self, name: &str, value: i32) -> KeelResult<()> {
        if name.trim().is_empty() {
            return Err(KeelError::Configuration {
                message: format!("special meaning in '{}' needs a name", self.name),
            });
        }
        self.configured.push((name.to_lowercase(), value));
        self.special_meanings.take();
        Ok(())
    }

    pub fn set_use_default_special_meanings(&mut self, use_defaults: bool) {
        self.use_default_special_meanings = use_defaults;
        self.special_meanings.take();
    }

    fn special_meanings(&self) -> &HashMap<String, i32> {
        self.special_meanings.get_or_init(|| {
            let mut table = HashMap::new();
            if self.use_default_special_meanings {
                for (token, rank) in DEFAULT_SPECIAL_MEANINGS {
                    table.insert(token.to_string(), rank);
                }
            }
            for (token, rank) in &self.configured {
                table.insert(token.clone(), *rank);
            }
            table
        })
    }

    /// Compare two revisions, dynamic revisions included.
    ///
    /// A dynamic revision ranks by its [`DynamicBound`], winning ties against
    /// concrete revisions. Two dynamic revisions at the same position fall
    /// back to the component order of their text.
    pub fn compare(&self, rev1: &str, rev2: &str) -> Ordering {
        if rev1 == rev2 {
            return Ordering::Equal;
        }
        match (self.version_matcher.bound(rev1), self.version_matcher.bound(rev2)) {
            (None, None) => self.compare_static(rev1, rev2),
            (Some(bound), None) => self.bound_against(&bound, rev2),
            (None, Some(bound)) => self.bound_against(&bound, rev1).reverse(),
            (Some(b1), Some(b2)) => self
                .compare_bounds(&b1, &b2)
                .then_with(|| self.compare_static(rev1, rev2)),
        }
    }

    /// Whether the concrete `found` satisfies the possibly dynamic `asked`.
    pub fn accepts(&self, asked: &str, found: &str) -> bool {
        let static_cmp = |a: &str, b: &str| self.compare_static(a, b);
        self.version_matcher.accept(asked, found, &static_cmp)
    }

    fn bound_against(&self, bound: &DynamicBound, found: &str) -> Ordering {
        let above = match bound {
            DynamicBound::Unbounded => true,
            DynamicBound::Below(upper) => self.compare_static(upper, found) == Ordering::Greater,
            DynamicBound::Above(prefix) => {
                self.extends(found, prefix) || self.compare_static(prefix, found) != Ordering::Less
            }
        };
        if above {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }

    fn compare_bounds(&self, b1: &DynamicBound, b2: &DynamicBound) -> Ordering {
        use DynamicBound::{Above, Below, Unbounded};
        match (b1, b2) {
            (Unbounded, Unbounded) => Ordering::Equal,
            (Unbounded, _) => Ordering::Greater,
            (_, Unbounded) => Ordering::Less,
            (Below(u1), Below(u2)) => self.compare_static(u1, u2),
            (Above(_), Below(upper)) => self.bound_against(b1, upper),
            (Below(upper), Above(_)) => self.bound_against(b2, upper).reverse(),
            (Above(p1), Above(p2)) => match self.compare_static(p1, p2) {
                Ordering::Equal => Ordering::Equal,
                _ if self.extends(p1, p2) => Ordering::Less,
                _ if self.extends(p2, p1) => Ordering::Greater,
                other => other,
            },
        }
    }

    /// Whether `revision` repeats every component of `prefix`.
    fn extends(&self, revision: &str, prefix: &str) -> bool {
        let revision = insert_boundaries(revision);
        let prefix = insert_boundaries(prefix);
        let parts = split_components(&revision);
        let head = split_components(&prefix);
        head.len() <= parts.len()
            && head
                .iter()
                .zip(&parts)
                .all(|(h, p)| self.compare_component(h, p) == Ordering::Equal)
    }

    /// Component-wise comparison, ignoring dynamic revisions.
    ///
    /// When one side runs out, the longer revision is newer only if its next
    /// component is numeric (`1.0.1` > `1.0` > `1.0-rc`).
    pub fn compare_static(&self, rev1: &str, rev2: &str) -> Ordering {
        let rev1 = insert_boundaries(rev1);
        let rev2 = insert_boundaries(rev2);
        let parts1 = split_components(&rev1);
        let parts2 = split_components(&rev2);

        for (p1, p2) in parts1.iter().zip(&parts2) {
            match self.compare_component(p1, p2) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        let common = parts1.len().min(parts2.len());
        match (parts1.get(common), parts2.get(common)) {
            (Some(p), None) if is_number(p) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (None, Some(p)) if is_number(p) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }

    fn compare_component(&self, p1: &str, p2: &str) -> Ordering {
        if p1 == p2 {
            return Ordering::Equal;
        }
        match (is_number(p1), is_number(p2)) {
            (true, true) => compare_numbers(p1, p2),
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.token_rank(p1).cmp(&self.token_rank(p2)),
        }
    }

    /// Special tokens rank by their meaning, case-insensitively; any other
    /// token ranks as 0 and then by its exact text.
    fn token_rank(&self, token: &str) -> (i32, String) {
        let lower = token.to_lowercase();
        match self.special_meanings().get(&lower) {
            Some(rank) => (*rank, lower),
            None => (0, token.to_string()),
        }
    }
}

impl Default for LatestRevisionStrategy {
    fn default() -> Self {
        Self::new(LATEST_REVISION, Arc::new(ChainVersionMatcher::default()))
    }
}

impl fmt::Debug for LatestRevisionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatestRevisionStrategy")
            .field("name", &self.name)
            .field("use_default_special_meanings", &self.use_default_special_meanings)
            .field("special_meanings", &self.configured)
            .finish()
    }
}

fn insert_boundaries(revision: &str) -> String {
    let mut out = String::with_capacity(revision.len() + 4);
    let mut prev: Option<char> = None;
    for c in revision.chars() {
        if let Some(p) = prev {
            let letter_digit = p.is_ascii_alphabetic() && c.is_ascii_digit();
            let digit_letter = p.is_ascii_digit() && c.is_ascii_alphabetic();
            if letter_digit || digit_letter {
                out.push('.');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Splits on separators. Trailing empty components are dropped, leading and
/// inner ones kept.
fn split_components(revision: &str) -> Vec<&str> {
    const SEPARATORS: [char; 4] = ['.', '_', '-', '+'];
    if !revision.contains(SEPARATORS) {
        return vec![revision];
    }
    let mut parts: Vec<&str> = revision.split(SEPARATORS).collect();
    while parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Integer comparison of digit strings of any length.
fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Promotes `latest*` and `working*` revisions ahead of the delegate's order.
#[derive(Debug)]
pub struct WorkspaceLatestStrategy {
    name: String,
    delegate: Arc<LatestStrategy>,
}

impl WorkspaceLatestStrategy {
    pub fn new(name: impl Into<String>, delegate: Arc<LatestStrategy>) -> Self {
        Self {
            name: name.into(),
            delegate,
        }
    }

    pub fn delegate(&self) -> &LatestStrategy {
        &self.delegate
    }

    fn sort<'a, A: ArtifactInfo>(&self, infos: &'a [A]) -> Vec<&'a A> {
        let (mut workspace, rest): (Vec<&A>, Vec<&A>) =
            self.delegate.sort(infos).into_iter().partition(|info| {
                let rev = info.revision();
                rev.starts_with("latest") || rev.starts_with("working")
            });
        workspace.extend(rest);
        workspace
    }
}
