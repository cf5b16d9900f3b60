use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use keel_util::errors::KeelError;

/// Declarative resolution settings loaded from `keel.toml`.
///
/// Every section is optional; built-in matchers, latest strategies and
/// conflict managers exist even when the file declares nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SettingsConfig {
    #[serde(default)]
    pub default_latest_strategy: Option<String>,

    #[serde(default)]
    pub default_conflict_manager: Option<String>,

    #[serde(default)]
    pub default_matcher: Option<String>,

    #[serde(default)]
    pub matchers: Vec<MatcherDecl>,

    #[serde(default)]
    pub latest_strategies: Vec<LatestStrategyDecl>,

    #[serde(default)]
    pub conflict_managers: Vec<ConflictManagerDecl>,

    #[serde(default)]
    pub namespaces: Vec<NamespaceDecl>,

    #[serde(default)]
    pub module_rules: Vec<ModuleRuleDecl>,
}

/// The pattern language a matcher compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatcherKind {
    Exact,
    Regexp,
    Glob,
    #[serde(alias = "exactOrRegexp")]
    ExactOrRegexp,
    Any,
}

impl MatcherKind {
    /// The built-in registry name for this kind.
    pub fn builtin_name(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Regexp => "regexp",
            Self::Glob => "glob",
            Self::ExactOrRegexp => "exactOrRegexp",
            Self::Any => "any",
        }
    }
}

/// `[[matchers]]`: a named alias for a matcher kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherDecl {
    pub name: String,
    pub kind: MatcherKind,
}

/// The family a declared latest strategy belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LatestStrategyKind {
    LatestRevision,
    LatestLexico,
    LatestTime,
    Workspace,
}

/// `[[latest-strategies]]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LatestStrategyDecl {
    pub name: String,
    pub kind: LatestStrategyKind,
    #[serde(default = "default_true")]
    pub use_default_special_meanings: bool,
    /// Token to rank; merged over (or replacing) the built-in table.
    #[serde(default)]
    pub special_meanings: BTreeMap<String, i32>,
    /// Inner strategy name for `kind = "workspace"`.
    #[serde(default)]
    pub delegate: Option<String>,
}

/// The family a declared conflict manager belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictManagerKind {
    All,
    Fixed,
    Latest,
    Strict,
    Regexp,
}

/// `[[conflict-managers]]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConflictManagerDecl {
    pub name: String,
    pub kind: ConflictManagerKind,
    /// Allowed revisions for `kind = "fixed"`.
    #[serde(default)]
    pub revisions: Vec<String>,
    /// Latest strategy name for `kind = "latest"`.
    #[serde(default)]
    pub latest: Option<String>,
    /// Single-capturing-group pattern for `kind = "regexp"`.
    #[serde(default)]
    pub regexp: Option<String>,
    #[serde(default)]
    pub ignore_non_matching: bool,
}

/// `[[namespaces]]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NamespaceDecl {
    pub name: String,
    #[serde(default)]
    pub chain_rules: bool,
    #[serde(default)]
    pub rules: Vec<NamespaceRuleDecl>,
}

/// One namespace rule: a transformation per direction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NamespaceRuleDecl {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub from_system: TransformationDecl,
    #[serde(default)]
    pub to_system: TransformationDecl,
}

/// Source rules tried in order, and the destination template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformationDecl {
    #[serde(default)]
    pub src: Vec<MridRuleDecl>,
    #[serde(default)]
    pub dest: Option<MridRuleDecl>,
}

/// Four optional field patterns; an absent field matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MridRuleDecl {
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub rev: Option<String>,
}

/// `[[module-rules]]`: per-module conflict manager override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleRuleDecl {
    #[serde(default = "default_any")]
    pub organisation: String,
    #[serde(default = "default_any")]
    pub module: String,
    /// Matcher name used to compile `organisation` and `module`.
    #[serde(default)]
    pub matcher: Option<String>,
    pub conflict_manager: String,
}

fn default_true() -> bool {
    true
}

fn default_any() -> String {
    "*".to_string()
}

impl SettingsConfig {
    /// Parse settings from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, KeelError> {
        toml::from_str(content).map_err(|e| KeelError::Parse {
            message: format!("Failed to parse settings: {e}"),
        })
    }

    /// Load settings from a file, or return defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, KeelError> {
        if !path.is_file() {
            tracing::debug!("no settings at {}, using built-in defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| KeelError::Configuration {
            message: format!("Failed to read settings {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }
}
