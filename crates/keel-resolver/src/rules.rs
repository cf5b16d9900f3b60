//! Per-module rule tables.
//!
//! A rule pairs a set of attribute patterns (`organisation`, `module`, ...)
//! with a payload such as a conflict manager. Lookups return the payload of
//! the first rule, in declaration order, whose patterns all match.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use keel_core::module_id::ModuleId;
use keel_util::errors::KeelResult;

use crate::matcher::{Matcher, PatternMatcher};

/// Attribute patterns compiled through one pattern matcher.
#[derive(Debug, Clone)]
pub struct MapMatcher {
    patterns: BTreeMap<String, String>,
    compiled: Vec<(String, Arc<Matcher>)>,
    matcher_name: String,
}

impl MapMatcher {
    /// Compiles every pattern up front; a malformed one is an error here,
    /// never at lookup time.
    pub fn new(patterns: BTreeMap<String, String>, matcher: &PatternMatcher) -> KeelResult<Self> {
        let compiled = patterns
            .iter()
            .map(|(attr, pattern)| Ok((attr.clone(), matcher.get_matcher(pattern)?)))
            .collect::<KeelResult<Vec<_>>>()?;
        Ok(Self {
            patterns,
            compiled,
            matcher_name: matcher.name().to_string(),
        })
    }

    /// Convenience for the common organisation/module pair.
    pub fn for_module(
        organisation: &str,
        module: &str,
        matcher: &PatternMatcher,
    ) -> KeelResult<Self> {
        let mut patterns = BTreeMap::new();
        patterns.insert("organisation".to_string(), organisation.to_string());
        patterns.insert("module".to_string(), module.to_string());
        Self::new(patterns, matcher)
    }

    /// True when every pattern matches its attribute. A missing attribute
    /// never matches.
    pub fn matches(&self, attributes: &BTreeMap<&str, &str>) -> bool {
        self.compiled.iter().all(|(attr, m)| {
            attributes
                .get(attr.as_str())
                .is_some_and(|value| m.matches(value))
        })
    }
}

impl fmt::Display for MapMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .patterns
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{{{}}} ({})", parts.join(", "), self.matcher_name)
    }
}

/// Ordered `(condition, payload)` pairs.
#[derive(Debug, Clone)]
pub struct ModuleRules<T> {
    rules: Vec<(MapMatcher, T)>,
}

impl<T> Default for ModuleRules<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> ModuleRules<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_rule(&mut self, condition: MapMatcher, rule: T) {
        self.rules.push((condition, rule));
    }

    /// Payload of the first rule matching the module.
    pub fn rule_for_module(&self, module_id: &ModuleId) -> Option<&T> {
        let attributes = module_id.attributes();
        self.rules
            .iter()
            .find(|(cond, _)| cond.matches(&attributes))
            .map(|(_, rule)| rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
