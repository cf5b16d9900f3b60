//! Candidate graph: module revisions discovered during a resolve, and the
//! conflict pass that evicts the losers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use keel_core::module_id::{ModuleId, ModuleRevisionId};
use keel_core::snapshot::Snapshot;
use keel_util::errors::{KeelError, KeelResult};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::conflict::{ConflictNode, ConflictReport, DependencyDescriptor, Eviction};
use crate::settings::ResolutionSettings;

/// A candidate module revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateNode {
    pub id: ModuleRevisionId,
    pub last_modified: i64,
    pub evicted: bool,
}

impl CandidateNode {
    pub fn new(id: ModuleRevisionId, last_modified: i64) -> Self {
        Self {
            id,
            last_modified,
            evicted: false,
        }
    }
}

impl fmt::Display for CandidateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Candidate graph backed by petgraph. Edges carry the dependency descriptor.
#[derive(Debug, Default)]
pub struct CandidateGraph {
    graph: DiGraph<CandidateNode, DependencyDescriptor>,
    index: HashMap<ModuleRevisionId, NodeIndex>,
    pub root: Option<NodeIndex>,
}

impl CandidateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or retrieve a node. If the id already exists, returns the existing index.
    pub fn add_node(&mut self, node: CandidateNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    pub fn set_root(&mut self, idx: NodeIndex) {
        self.root = Some(idx);
    }

    /// Add a dependency edge from `from` to `to`, once.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, descriptor: DependencyDescriptor) {
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, descriptor);
        }
    }

    pub fn find(&self, id: &ModuleRevisionId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &CandidateNode {
        &self.graph[idx]
    }

    /// Read-only conflict view of a node.
    pub fn node_ref(&self, idx: NodeIndex) -> NodeRef<'_> {
        NodeRef { graph: self, idx }
    }

    /// Direct dependencies of a node, in declaration order.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DependencyDescriptor)> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target()))
            .collect();
        edges.sort_by_key(|(e, _)| *e);
        edges
            .into_iter()
            .map(|(e, target)| (target, &self.graph[e]))
            .collect()
    }

    /// Nodes depending on this one, in declaration order.
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.id(), e.source()))
            .collect();
        edges.sort_by_key(|(e, _)| *e);
        edges.into_iter().map(|(_, source)| source).collect()
    }

    /// Every evicted candidate.
    pub fn evicted(&self) -> Vec<&CandidateNode> {
        self.graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .filter(|n| n.evicted)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Build a graph from a snapshot. Edge endpoints must be declared nodes
    /// (the root is added implicitly).
    pub fn from_snapshot(snapshot: &Snapshot) -> KeelResult<Self> {
        let mut graph = Self::new();
        let root_id = ModuleRevisionId::parse(&snapshot.root)?;
        let root = graph.add_node(CandidateNode::new(root_id, 0));
        graph.set_root(root);

        for node in &snapshot.nodes {
            let id = ModuleRevisionId::parse(&node.id)?;
            let idx = graph.add_node(CandidateNode::new(id, node.last_modified));
            graph.graph[idx].evicted = node.evicted;
        }
        for edge in &snapshot.edges {
            let from_id = ModuleRevisionId::parse(&edge.from)?;
            let to_id = ModuleRevisionId::parse(&edge.to)?;
            let from = graph.find(&from_id).ok_or_else(|| undeclared(&edge.from))?;
            let to = graph.find(&to_id).ok_or_else(|| undeclared(&edge.to))?;
            let parent_revision_id = match &edge.parent_revision {
                Some(rev) => from_id.with_revision(rev.as_str()),
                None => from_id.clone(),
            };
            graph.add_edge(
                from,
                to,
                DependencyDescriptor {
                    requested: edge
                        .requested
                        .clone()
                        .unwrap_or_else(|| to_id.revision().to_string()),
                    parent_revision_id,
                    force: edge.force,
                },
            );
        }
        Ok(graph)
    }

    /// Run the conflict pass for one parent: children sharing a module id
    /// compete under that module's conflict manager, losers get evicted.
    pub fn resolve_conflicts(
        &mut self,
        parent: NodeIndex,
        settings: &ResolutionSettings,
        report: &mut ConflictReport,
    ) -> KeelResult<()> {
        let mut groups: Vec<(ModuleId, Vec<NodeIndex>)> = Vec::new();
        for (child, _) in self.dependencies_of(parent) {
            let module = self.graph[child].id.module_id().clone();
            match groups.iter_mut().find(|(m, _)| *m == module) {
                Some((_, members)) => members.push(child),
                None => groups.push((module, vec![child])),
            }
        }

        for (module, members) in groups {
            if members.len() < 2 {
                continue;
            }
            let manager = settings.conflict_manager_for(&module);
            let (winners, losers) = {
                let candidates: Vec<NodeRef<'_>> =
                    members.iter().map(|&idx| self.node_ref(idx)).collect();
                let parent_ref = self.node_ref(parent);
                let kept = match manager.resolve_conflicts(&parent_ref, &candidates) {
                    Ok(kept) => kept,
                    Err(e) => {
                        report.add_problem(e.to_string());
                        return Err(e);
                    }
                };
                let kept: HashSet<NodeIndex> = kept.into_iter().map(|n| n.idx).collect();
                let (winners, losers): (Vec<NodeIndex>, Vec<NodeIndex>) =
                    members.iter().partition(|idx| kept.contains(idx));
                (winners, losers)
            };
            if losers.is_empty() {
                continue;
            }
            for &idx in &losers {
                self.graph[idx].evicted = true;
            }
            let eviction = Eviction {
                module,
                parent: self.graph[parent].id.clone(),
                manager: manager.name().to_string(),
                winners: winners.iter().map(|&i| self.graph[i].id.clone()).collect(),
                evicted: losers.iter().map(|&i| self.graph[i].id.clone()).collect(),
            };
            tracing::info!("{eviction}");
            report.add(eviction);
        }
        Ok(())
    }

    /// Conflict pass over every node reachable from the root, breadth first.
    pub fn resolve_all(
        &mut self,
        settings: &ResolutionSettings,
        report: &mut ConflictReport,
    ) -> KeelResult<()> {
        let Some(root) = self.root else {
            return Ok(());
        };
        let mut queue = VecDeque::from([root]);
        let mut seen = HashSet::from([root]);
        while let Some(idx) = queue.pop_front() {
            self.resolve_conflicts(idx, settings, report)?;
            for (child, _) in self.dependencies_of(idx) {
                if !self.graph[child].evicted && seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        Ok(())
    }

    /// Print the candidate tree, marking evicted revisions.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let Some(root) = self.root else {
            return output;
        };
        output.push_str(&format!("{}\n", self.graph[root]));

        let mut visited = HashSet::from([root]);
        let deps = self.dependencies_of(root);
        let count = deps.len();
        for (i, (idx, edge)) in deps.iter().enumerate() {
            self.print_subtree(
                &mut output,
                *idx,
                edge,
                "",
                i == count - 1,
                1,
                max_depth,
                &mut visited,
            );
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        edge: &DependencyDescriptor,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        let mut line = format!("{prefix}{connector}{node}");
        if edge.requested != node.id.revision() {
            line.push_str(&format!(" (requested {})", edge.requested));
        }
        if edge.force {
            line.push_str(" [force]");
        }
        if node.evicted {
            line.push_str(" [evicted]");
        }
        output.push_str(&line);
        output.push('\n');

        if node.evicted || max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, child_edge)) in deps.iter().enumerate() {
            self.print_subtree(
                output,
                *child,
                child_edge,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
                visited,
            );
        }
        visited.remove(&idx);
    }
}

fn undeclared(id: &str) -> KeelError {
    KeelError::Parse {
        message: format!("edge refers to undeclared node '{id}'"),
    }
}

/// A node seen through its graph, for conflict managers.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'g> {
    graph: &'g CandidateGraph,
    idx: NodeIndex,
}

impl<'g> NodeRef<'g> {
    pub fn index(&self) -> NodeIndex {
        self.idx
    }

    pub fn node(&self) -> &'g CandidateNode {
        &self.graph.graph[self.idx]
    }
}

impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node())
    }
}

impl ConflictNode for NodeRef<'_> {
    fn resolved_id(&self) -> &ModuleRevisionId {
        &self.node().id
    }

    fn last_modified(&self) -> i64 {
        self.node().last_modified
    }

    fn dependency_descriptor(&self, parent: &Self) -> Option<&DependencyDescriptor> {
        let edge = self.graph.graph.find_edge(parent.idx, self.idx)?;
        Some(&self.graph.graph[edge])
    }

    fn callers(&self) -> Vec<ModuleRevisionId> {
        self.graph
            .dependents_of(self.idx)
            .into_iter()
            .map(|idx| self.graph.graph[idx].id.clone())
            .collect()
    }

    fn is_completely_evicted(&self) -> bool {
        self.node().evicted
    }
}
