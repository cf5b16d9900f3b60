//! Conflict managers and conflict reporting.
//!
//! A conflict manager receives the candidates competing for one module under
//! one parent and returns the survivors. Survivors are always borrowed from
//! the input slice; nothing is ever added.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use fancy_regex::Regex;
use keel_core::artifact::ArtifactInfo;
use keel_core::module_id::{ModuleId, ModuleRevisionId};
use keel_util::errors::{KeelError, KeelResult};

use crate::latest::LatestStrategy;

pub const NO_CONFLICT: &str = "all";
pub const STRICT: &str = "strict";

/// How a parent declared its dependency on a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    /// The revision the parent asked for, possibly dynamic.
    pub requested: String,
    /// The parent revision this declaration belongs to.
    pub parent_revision_id: ModuleRevisionId,
    /// Overrides normal ranking when declared by the actual parent.
    pub force: bool,
}

/// Read-only view of a resolved node, as conflict managers see it.
pub trait ConflictNode: fmt::Display {
    fn resolved_id(&self) -> &ModuleRevisionId;

    /// Publication timestamp in epoch millis; `0` when unknown.
    fn last_modified(&self) -> i64;

    /// The descriptor of the edge from `parent` to this node, if any.
    fn dependency_descriptor(&self, parent: &Self) -> Option<&DependencyDescriptor>;

    /// Ids of every node depending on this one.
    fn callers(&self) -> Vec<ModuleRevisionId>;

    fn is_completely_evicted(&self) -> bool;
}

/// Adapts a node to the latest-strategy view: resolved revision plus timestamp.
struct NodeInfo<'a, N> {
    node: &'a N,
}

impl<N: ConflictNode> ArtifactInfo for NodeInfo<'_, N> {
    fn revision(&self) -> &str {
        self.node.resolved_id().revision()
    }

    fn last_modified(&self) -> i64 {
        self.node.last_modified()
    }
}

/// A named conflict resolution policy.
#[derive(Debug)]
pub enum ConflictManager {
    NoConflict(NoConflictManager),
    Fixed(FixedConflictManager),
    Latest(LatestConflictManager),
    Strict(StrictConflictManager),
    Regexp(RegexpConflictManager),
}

impl ConflictManager {
    pub fn name(&self) -> &str {
        match self {
            Self::NoConflict(m) => &m.name,
            Self::Fixed(m) => &m.name,
            Self::Latest(m) => &m.name,
            Self::Strict(m) => &m.name,
            Self::Regexp(m) => &m.name,
        }
    }

    /// The surviving subset of `conflicts`, in input order.
    pub fn resolve_conflicts<'a, N: ConflictNode>(
        &self,
        parent: &N,
        conflicts: &'a [N],
    ) -> KeelResult<Vec<&'a N>> {
        match self {
            Self::NoConflict(_) => Ok(conflicts.iter().collect()),
            Self::Fixed(m) => Ok(m.resolve_conflicts(conflicts)),
            Self::Latest(m) => Ok(m.resolve_conflicts(parent, conflicts)),
            Self::Strict(m) => m.resolve_conflicts(conflicts),
            Self::Regexp(m) => m.resolve_conflicts(conflicts),
        }
    }
}

impl fmt::Display for ConflictManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keeps every candidate.
#[derive(Debug, Clone)]
pub struct NoConflictManager {
    name: String,
}

impl NoConflictManager {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for NoConflictManager {
    fn default() -> Self {
        Self::new(NO_CONFLICT)
    }
}

/// Keeps candidates whose revision is in a fixed allow-list.
#[derive(Debug, Clone)]
pub struct FixedConflictManager {
    name: String,
    revisions: BTreeSet<String>,
}

impl FixedConflictManager {
    pub fn new(name: impl Into<String>, revisions: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            revisions: revisions.into_iter().collect(),
        }
    }

    pub fn revisions(&self) -> impl Iterator<Item = &str> {
        self.revisions.iter().map(String::as_str)
    }

    fn resolve_conflicts<'a, N: ConflictNode>(&self, conflicts: &'a [N]) -> Vec<&'a N> {
        conflicts
            .iter()
            .filter(|node| self.revisions.contains(node.resolved_id().revision()))
            .collect()
    }
}

/// Keeps the latest candidate under a latest strategy, unless a forced
/// dependency from the actual parent names the winner.
///
/// The decision is always made on the spot: under time ranking an unknown
/// (`0`) timestamp simply ranks oldest.
#[derive(Debug, Clone)]
pub struct LatestConflictManager {
    name: String,
    strategy: Arc<LatestStrategy>,
}

impl LatestConflictManager {
    pub fn new(name: impl Into<String>, strategy: Arc<LatestStrategy>) -> Self {
        Self {
            name: name.into(),
            strategy,
        }
    }

    pub fn strategy(&self) -> &LatestStrategy {
        &self.strategy
    }

    fn resolve_conflicts<'a, N: ConflictNode>(&self, parent: &N, conflicts: &'a [N]) -> Vec<&'a N> {
        if conflicts.len() < 2 {
            return conflicts.iter().collect();
        }
        let parent_id = parent.resolved_id();
        for node in conflicts {
            if let Some(dd) = node.dependency_descriptor(parent) {
                if dd.force && dd.parent_revision_id == *parent_id {
                    tracing::debug!("forced dependency from {parent}: {node} wins");
                    return vec![node];
                }
            }
        }

        let live: Vec<&'a N> = conflicts
            .iter()
            .filter(|n| !n.is_completely_evicted())
            .collect();
        let ranked: Vec<NodeInfo<'a, N>> = if live.is_empty() {
            conflicts.iter().map(|node| NodeInfo { node }).collect()
        } else {
            live.into_iter().map(|node| NodeInfo { node }).collect()
        };

        match self.strategy.find_latest(&ranked, None) {
            Some(latest) => {
                tracing::debug!(
                    "{}: {} wins among {} candidates",
                    self.name,
                    latest.node,
                    conflicts.len()
                );
                vec![latest.node]
            }
            None => conflicts.iter().collect(),
        }
    }
}

/// Fails unless every candidate resolves to the same id.
#[derive(Debug, Clone)]
pub struct StrictConflictManager {
    name: String,
}

impl StrictConflictManager {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn resolve_conflicts<'a, N: ConflictNode>(&self, conflicts: &'a [N]) -> KeelResult<Vec<&'a N>> {
        let mut last: Option<&'a N> = None;
        for node in conflicts {
            if let Some(last) = last {
                if last.resolved_id() != node.resolved_id() {
                    let message = format!(
                        "{} (needed by {}) conflicts with {} (needed by {})",
                        last,
                        callers(last),
                        node,
                        callers(node)
                    );
                    tracing::error!("{message}");
                    return Err(KeelError::StrictConflict { message });
                }
            }
            last = Some(node);
        }
        Ok(last.into_iter().collect())
    }
}

impl Default for StrictConflictManager {
    fn default() -> Self {
        Self::new(STRICT)
    }
}

/// Fails when candidates disagree on the key extracted by a single-group
/// pattern from their revision; otherwise keeps the greatest key.
#[derive(Debug, Clone)]
pub struct RegexpConflictManager {
    name: String,
    pattern: String,
    regex: Regex,
    ignore_non_matching: bool,
}

impl RegexpConflictManager {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        ignore_non_matching: bool,
    ) -> KeelResult<Self> {
        let name = name.into();
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            KeelError::InvalidPattern {
                kind: "regexp".to_string(),
                pattern: pattern.to_string(),
                message: e.to_string(),
            }
        })?;
        let groups = regex.captures_len() - 1;
        if groups != 1 {
            return Err(KeelError::Configuration {
                message: format!(
                    "conflict manager '{name}': pattern '{pattern}' must have exactly one \
                     capturing group, found {groups}"
                ),
            });
        }
        Ok(Self {
            name,
            pattern: pattern.to_string(),
            regex,
            ignore_non_matching,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn ignore_non_matching(&self) -> bool {
        self.ignore_non_matching
    }

    fn key<N: ConflictNode>(&self, node: &N) -> KeelResult<String> {
        let revision = node.resolved_id().revision();
        let group = match self.regex.captures(revision) {
            Ok(caps) => caps.and_then(|c| c.get(1)).map(|m| m.as_str().to_string()),
            Err(e) => {
                tracing::warn!("pattern '{}' gave up on {node}: {e}", self.pattern);
                None
            }
        };
        match group {
            Some(key) => Ok(key),
            None if self.ignore_non_matching => {
                tracing::warn!(
                    "pattern '{}' does not match {node}, using the whole revision as key",
                    self.pattern
                );
                Ok(revision.to_string())
            }
            None => {
                let message = format!("pattern '{}' does not match {node}", self.pattern);
                tracing::error!("{message}");
                Err(KeelError::StrictConflict { message })
            }
        }
    }

    fn resolve_conflicts<'a, N: ConflictNode>(&self, conflicts: &'a [N]) -> KeelResult<Vec<&'a N>> {
        let mut last: Option<(&'a N, String)> = None;
        for node in conflicts {
            let key = self.key(node)?;
            if let Some((last_node, last_key)) = &last {
                if *last_key != key {
                    let message = format!(
                        "{}:{} (needed by {}) conflicts with {}:{} (needed by {})",
                        last_node,
                        last_key,
                        callers(*last_node),
                        node,
                        key,
                        callers(node)
                    );
                    tracing::error!("{message}");
                    return Err(KeelError::StrictConflict { message });
                }
            }
            let replaces = match &last {
                None => true,
                Some((_, last_key)) => key >= *last_key,
            };
            if replaces {
                last = Some((node, key));
            }
        }
        Ok(last.map(|(node, _)| node).into_iter().collect())
    }
}

fn callers<N: ConflictNode>(node: &N) -> String {
    let ids: Vec<String> = node.callers().iter().map(ToString::to_string).collect();
    format!("[{}]", ids.join(", "))
}

/// All conflicts decided (or failed) during a session.
#[derive(Debug, Default)]
pub struct ConflictReport {
    pub evictions: Vec<Eviction>,
    pub problems: Vec<String>,
}

/// Candidates of one module dropped in favour of the winners.
#[derive(Debug, Clone)]
pub struct Eviction {
    pub module: ModuleId,
    pub parent: ModuleRevisionId,
    pub manager: String,
    pub winners: Vec<ModuleRevisionId>,
    pub evicted: Vec<ModuleRevisionId>,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, eviction: Eviction) {
        self.evictions.push(eviction);
    }

    pub fn add_problem(&mut self, problem: impl Into<String>) {
        self.problems.push(problem.into());
    }

    pub fn is_empty(&self) -> bool {
        self.evictions.is_empty() && self.problems.is_empty()
    }

    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.evictions.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No conflicts.");
        }
        if !self.evictions.is_empty() {
            writeln!(f, "Evictions ({}):", self.evictions.len())?;
            for e in &self.evictions {
                writeln!(f, "  {e}")?;
            }
        }
        if !self.problems.is_empty() {
            writeln!(f, "Problems ({}):", self.problems.len())?;
            for p in &self.problems {
                writeln!(f, "  {p}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Eviction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |ids: &[ModuleRevisionId]| {
            ids.iter()
                .map(|id| id.revision().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "{} in {}: kept [{}], evicted [{}] ({})",
            self.module,
            self.parent,
            join(&self.winners),
            join(&self.evicted),
            self.manager
        )
    }
}
