//! Module and module-revision identifiers.
//!
//! The text form follows the `organisation#name[#branch];revision` convention
//! used in resolve reports and conflict messages.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use keel_util::errors::KeelError;

/// Attribute key for the organisation of a module.
pub const ORGANISATION_KEY: &str = "organisation";
/// Attribute key for the name of a module.
pub const MODULE_KEY: &str = "module";
/// Attribute key for the branch of a module revision.
pub const BRANCH_KEY: &str = "branch";
/// Attribute key for the revision of a module revision.
pub const REVISION_KEY: &str = "revision";

/// An `(organisation, name)` pair identifying a module regardless of revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    pub organisation: String,
    pub name: String,
}

impl ModuleId {
    pub fn new(organisation: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            organisation: organisation.into(),
            name: name.into(),
        }
    }

    /// Attribute view used by rule tables (`organisation`, `module`).
    pub fn attributes(&self) -> BTreeMap<&'static str, &str> {
        let mut attrs = BTreeMap::new();
        attrs.insert(ORGANISATION_KEY, self.organisation.as_str());
        attrs.insert(MODULE_KEY, self.name.as_str());
        attrs
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.organisation, self.name)
    }
}

/// A module id plus branch, revision and extra attributes.
///
/// Equality and hashing are structural over every field, so two ids that only
/// differ by an extra attribute are distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleRevisionId {
    module_id: ModuleId,
    branch: Option<String>,
    revision: String,
    /// Keyed by qualified name (`ns:attr` or plain `attr`).
    extra_attributes: BTreeMap<String, String>,
}

impl ModuleRevisionId {
    pub fn new(
        organisation: impl Into<String>,
        name: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            module_id: ModuleId::new(organisation, name),
            branch: None,
            revision: revision.into(),
            extra_attributes: BTreeMap::new(),
        }
    }

    /// Build an id from every component at once.
    pub fn from_parts(
        module_id: ModuleId,
        branch: Option<String>,
        revision: impl Into<String>,
        extra_attributes: BTreeMap<String, String>,
    ) -> Self {
        Self {
            module_id,
            branch: branch.filter(|b| !b.is_empty()),
            revision: revision.into(),
            extra_attributes,
        }
    }

    /// Returns a copy with the given branch. An empty branch means no branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        let branch = branch.into();
        self.branch = if branch.is_empty() { None } else { Some(branch) };
        self
    }

    pub fn with_extra_attribute(
        mut self,
        qualified_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.extra_attributes
            .insert(qualified_name.into(), value.into());
        self
    }

    /// Same module, branch and attributes, different revision.
    pub fn with_revision(&self, revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            ..self.clone()
        }
    }

    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    pub fn organisation(&self) -> &str {
        &self.module_id.organisation
    }

    pub fn name(&self) -> &str {
        &self.module_id.name
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Extra attributes keyed by their qualified names.
    pub fn qualified_extra_attributes(&self) -> &BTreeMap<String, String> {
        &self.extra_attributes
    }

    /// Extra attributes keyed by their unqualified names (namespace prefix dropped).
    pub fn extra_attributes(&self) -> BTreeMap<&str, &str> {
        self.extra_attributes
            .iter()
            .map(|(k, v)| (unqualified(k), v.as_str()))
            .collect()
    }

    /// Look up an extra attribute by qualified or unqualified name.
    pub fn extra_attribute(&self, name: &str) -> Option<&str> {
        if let Some(v) = self.extra_attributes.get(name) {
            return Some(v);
        }
        self.extra_attributes
            .iter()
            .find(|(k, _)| unqualified(k) == name)
            .map(|(_, v)| v.as_str())
    }

    /// Standard attributes plus unqualified extra attributes.
    pub fn attributes(&self) -> BTreeMap<&str, &str> {
        let mut attrs = self.extra_attributes();
        attrs.insert(ORGANISATION_KEY, self.organisation());
        attrs.insert(MODULE_KEY, self.name());
        if let Some(branch) = self.branch() {
            attrs.insert(BRANCH_KEY, branch);
        }
        attrs.insert(REVISION_KEY, self.revision());
        attrs
    }

    /// Parse `org#name;rev` or `org#name#branch;rev`.
    pub fn parse(s: &str) -> Result<Self, KeelError> {
        let s = s.trim();
        let (head, revision) = s.rsplit_once(';').ok_or_else(|| KeelError::Parse {
            message: format!("module revision id '{s}' has no ';revision' part"),
        })?;
        let parts: Vec<&str> = head.split('#').collect();
        let (org, name, branch) = match parts.as_slice() {
            [org, name] => (*org, *name, None),
            [org, name, branch] => (*org, *name, Some(*branch)),
            _ => {
                return Err(KeelError::Parse {
                    message: format!(
                        "module revision id '{s}' must look like org#name[#branch];revision"
                    ),
                })
            }
        };
        if org.is_empty() || name.is_empty() {
            return Err(KeelError::Parse {
                message: format!("module revision id '{s}' has an empty organisation or name"),
            });
        }
        let mrid = Self::new(org, name, revision);
        Ok(match branch {
            Some(b) => mrid.with_branch(b),
            None => mrid,
        })
    }
}

impl FromStr for ModuleRevisionId {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ModuleRevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.module_id)?;
        if let Some(branch) = &self.branch {
            write!(f, "#{branch}")?;
        }
        write!(f, ";{}", self.revision)
    }
}

fn unqualified(name: &str) -> &str {
    name.split_once(':').map(|(_, n)| n).unwrap_or(name)
}
