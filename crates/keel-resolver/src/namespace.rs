//! Namespaces: rewriting module revision ids between naming schemes.
//!
//! Each namespace rule carries two transformations, one per direction. A
//! transformation tries its source rules in order; the first one whose four
//! field patterns all match captures groups per field, and the destination
//! template builds the new id from them.
//!
//! Destination templates reference captured groups as `$o<n>`, `$m<n>`,
//! `$b<n>` and `$r<n>` (organisation, module, branch, revision). `\x`
//! produces a literal `x`.

use std::borrow::Cow;
use std::fmt;

use fancy_regex::Regex;
use keel_core::module_id::{ModuleId, ModuleRevisionId};
use keel_util::errors::{KeelError, KeelResult};

/// Which way an id crosses the namespace boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Foreign repository naming to the consumer's naming.
    ToSystem,
    /// Consumer naming to the foreign repository's naming.
    FromSystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Organisation,
    Module,
    Branch,
    Revision,
}

impl Field {
    const ALL: [Field; 4] = [
        Field::Organisation,
        Field::Module,
        Field::Branch,
        Field::Revision,
    ];

    fn from_placeholder(c: char) -> Option<Self> {
        match c {
            'o' => Some(Self::Organisation),
            'm' => Some(Self::Module),
            'b' => Some(Self::Branch),
            'r' => Some(Self::Revision),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Four optional field patterns (source) or templates (destination).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MridRule {
    pub org: Option<String>,
    pub module: Option<String>,
    pub branch: Option<String>,
    pub rev: Option<String>,
}

impl MridRule {
    pub fn new(
        org: Option<&str>,
        module: Option<&str>,
        branch: Option<&str>,
        rev: Option<&str>,
    ) -> Self {
        Self {
            org: org.map(str::to_string),
            module: module.map(str::to_string),
            branch: branch.map(str::to_string),
            rev: rev.map(str::to_string),
        }
    }

    fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Organisation => self.org.as_deref(),
            Field::Module => self.module.as_deref(),
            Field::Branch => self.branch.as_deref(),
            Field::Revision => self.rev.as_deref(),
        }
    }
}

impl fmt::Display for MridRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "*".to_string());
        write!(
            f,
            "[ {} {} {} {} ]",
            show(&self.org),
            show(&self.module),
            show(&self.branch),
            show(&self.rev)
        )
    }
}

/// A source rule with its field patterns compiled as full-match regexes.
#[derive(Debug, Clone)]
struct CompiledSource {
    rule: MridRule,
    patterns: [Regex; 4],
}

impl CompiledSource {
    fn compile(rule: MridRule) -> KeelResult<Self> {
        let compile = |field: Field| -> KeelResult<Regex> {
            let pattern = rule.field(field).unwrap_or(".*");
            Regex::new(&format!("^(?:{pattern})$")).map_err(|e| KeelError::InvalidPattern {
                kind: "regexp".to_string(),
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
        };
        let patterns = [
            compile(Field::Organisation)?,
            compile(Field::Module)?,
            compile(Field::Branch)?,
            compile(Field::Revision)?,
        ];
        Ok(Self { rule, patterns })
    }

    /// Captured groups per field, or `None` if any field fails to match.
    fn captures(&self, mrid: &ModuleRevisionId) -> Option<Captures> {
        let mut groups: [Option<Vec<Option<String>>>; 4] = Default::default();
        for field in Field::ALL {
            let value = match field {
                Field::Organisation => Some(mrid.organisation()),
                Field::Module => Some(mrid.name()),
                Field::Branch => mrid.branch(),
                Field::Revision => Some(mrid.revision()),
            };
            // Ids without a branch pass the branch pattern unconditionally.
            let Some(value) = value else { continue };
            let pattern = &self.patterns[field.index()];
            let caps = match pattern.captures(value) {
                Ok(caps) => caps?,
                Err(e) => {
                    tracing::warn!("pattern '{}' gave up on '{value}': {e}", pattern.as_str());
                    return None;
                }
            };
            groups[field.index()] = Some(
                caps.iter()
                    .map(|g| g.map(|m| m.as_str().to_string()))
                    .collect(),
            );
        }
        Some(Captures { groups })
    }
}

/// Captured groups of each field; `None` for a field that was not matched.
#[derive(Debug)]
struct Captures {
    groups: [Option<Vec<Option<String>>>; 4],
}

impl Captures {
    fn field(&self, field: Field) -> Option<&[Option<String>]> {
        self.groups[field.index()].as_deref()
    }

    /// Expand a destination template.
    fn substitute(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let chars: Vec<char> = template.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '$' {
                if let Some(consumed) = self.expand_placeholder(&chars[i + 1..], &mut out) {
                    i += 1 + consumed;
                    continue;
                }
            }
            out.push(c);
            i += 1;
        }
        out
    }

    /// Expands `<field><group>` at the start of `rest`; returns the number of
    /// chars consumed, or `None` to leave the `$` literal.
    fn expand_placeholder(&self, rest: &[char], out: &mut String) -> Option<usize> {
        let field = Field::from_placeholder(*rest.first()?)?;
        let groups = self.field(field)?;
        let first = rest.get(1)?.to_digit(10)? as usize;
        let group_count = groups.len() - 1;
        let mut number = first;
        let mut consumed = 2;
        while let Some(d) = rest.get(consumed).and_then(|c| c.to_digit(10)) {
            let next = number * 10 + d as usize;
            if next > group_count {
                break;
            }
            number = next;
            consumed += 1;
        }
        match groups.get(number) {
            Some(Some(value)) => out.push_str(value),
            Some(None) => {}
            None => tracing::warn!("no group {number} captured for ${}", rest[0]),
        }
        Some(consumed)
    }
}

/// Ordered source rules and one destination template.
#[derive(Debug, Clone, Default)]
pub struct MridTransformationRule {
    src: Vec<CompiledSource>,
    dest: Option<MridRule>,
}

impl MridTransformationRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_src(&mut self, rule: MridRule) -> KeelResult<()> {
        self.src.push(CompiledSource::compile(rule)?);
        Ok(())
    }

    pub fn add_dest(&mut self, rule: MridRule) -> KeelResult<()> {
        if let Some(existing) = &self.dest {
            return Err(KeelError::InvalidArgument {
                message: format!("only one dest is allowed per mapping, already have {existing}"),
            });
        }
        self.dest = Some(rule);
        Ok(())
    }

    pub fn dest(&self) -> Option<&MridRule> {
        self.dest.as_ref()
    }

    pub fn sources(&self) -> impl Iterator<Item = &MridRule> {
        self.src.iter().map(|s| &s.rule)
    }

    /// The rewritten id, or `None` if no source rule matches.
    pub fn transform(&self, mrid: &ModuleRevisionId) -> Option<ModuleRevisionId> {
        let dest = self.dest.as_ref()?;
        let (source, captures) = self
            .src
            .iter()
            .find_map(|s| s.captures(mrid).map(|caps| (s, caps)))?;

        let render = |field: Field| -> Option<String> {
            match dest.field(field) {
                Some(template) => Some(captures.substitute(template)),
                None => captures
                    .field(field)
                    .and_then(|groups| groups.first().cloned().flatten()),
            }
        };
        let org = render(Field::Organisation).unwrap_or_default();
        let module = render(Field::Module).unwrap_or_default();
        let branch = render(Field::Branch);
        let revision = render(Field::Revision).unwrap_or_default();

        let transformed = ModuleRevisionId::from_parts(
            ModuleId::new(org, module),
            branch,
            revision,
            mrid.qualified_extra_attributes().clone(),
        );
        tracing::debug!(
            "{mrid} matched {} -> {dest}: {transformed}",
            source.rule
        );
        Some(transformed)
    }
}

/// One rule of a namespace: a transformation per direction.
#[derive(Debug, Clone, Default)]
pub struct NamespaceRule {
    pub name: Option<String>,
    pub description: Option<String>,
    pub from_system: MridTransformationRule,
    pub to_system: MridTransformationRule,
}

impl NamespaceRule {
    fn transformation(&self, direction: Direction) -> &MridTransformationRule {
        match direction {
            Direction::ToSystem => &self.to_system,
            Direction::FromSystem => &self.from_system,
        }
    }
}

/// A named, ordered list of namespace rules.
#[derive(Debug, Clone)]
pub struct Namespace {
    name: String,
    chain_rules: bool,
    rules: Vec<NamespaceRule>,
}

impl Namespace {
    pub const SYSTEM: &'static str = "system";

    pub fn new(name: impl Into<String>, chain_rules: bool) -> Self {
        Self {
            name: name.into(),
            chain_rules,
            rules: Vec::new(),
        }
    }

    /// The identity namespace.
    pub fn system() -> Self {
        Self::new(Self::SYSTEM, false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain_rules(&self) -> bool {
        self.chain_rules
    }

    pub fn add_rule(&mut self, rule: NamespaceRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[NamespaceRule] {
        &self.rules
    }

    /// True iff the namespace has no rules; callers may skip it entirely.
    pub fn is_identity(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rewrite `mrid` in the given direction. Borrowed when nothing changed.
    pub fn transform<'a>(
        &self,
        direction: Direction,
        mrid: &'a ModuleRevisionId,
    ) -> Cow<'a, ModuleRevisionId> {
        if self.is_identity() {
            return Cow::Borrowed(mrid);
        }
        let mut current = Cow::Borrowed(mrid);
        for rule in &self.rules {
            let Some(next) = rule.transformation(direction).transform(&current) else {
                continue;
            };
            if self.chain_rules {
                current = Cow::Owned(next);
            } else if next != *mrid {
                return Cow::Owned(next);
            }
        }
        if *current == *mrid {
            Cow::Borrowed(mrid)
        } else {
            current
        }
    }

    pub fn to_system<'a>(&self, mrid: &'a ModuleRevisionId) -> Cow<'a, ModuleRevisionId> {
        self.transform(Direction::ToSystem, mrid)
    }

    pub fn from_system<'a>(&self, mrid: &'a ModuleRevisionId) -> Cow<'a, ModuleRevisionId> {
        self.transform(Direction::FromSystem, mrid)
    }

    /// Rewrite a module id, through an id with an empty revision.
    pub fn transform_module_id(&self, direction: Direction, module_id: &ModuleId) -> ModuleId {
        if self.is_identity() {
            return module_id.clone();
        }
        let mrid = ModuleRevisionId::from_parts(module_id.clone(), None, "", Default::default());
        self.transform(direction, &mrid).module_id().clone()
    }

    /// Rewrite an organisation alone.
    pub fn transform_organisation(&self, direction: Direction, organisation: &str) -> String {
        if self.is_identity() {
            return organisation.to_string();
        }
        self.transform_module_id(direction, &ModuleId::new(organisation, ""))
            .organisation
    }
}
