//! Candidate-graph snapshot file format.
//!
//! A snapshot records the nodes a graph walk discovered for one resolve and
//! the dependency edges between them, so a conflict decision can be replayed
//! offline against a settings file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use keel_util::errors::KeelError;

/// The parsed representation of a snapshot TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Module revision id of the root module.
    pub root: String,

    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,

    #[serde(default)]
    pub edges: Vec<SnapshotEdge>,
}

/// A discovered module revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotNode {
    pub id: String,
    /// Publication timestamp in epoch milliseconds.
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub evicted: bool,
}

/// A dependency edge as declared by `from`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotEdge {
    pub from: String,
    pub to: String,
    /// Revision as written in the dependency declaration; defaults to the target's.
    #[serde(default)]
    pub requested: Option<String>,
    #[serde(default)]
    pub force: bool,
    /// Declared parent revision id; defaults to `from`.
    #[serde(default)]
    pub parent_revision: Option<String>,
}

impl Snapshot {
    pub fn parse_toml(content: &str) -> Result<Self, KeelError> {
        toml::from_str(content).map_err(|e| KeelError::Parse {
            message: format!("Failed to parse snapshot: {e}"),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, KeelError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }
}
