//! The resolution settings registry.
//!
//! Built once from a [`SettingsConfig`]: named matchers, latest strategies,
//! conflict managers and namespaces, plus the per-module conflict manager
//! table. Built-in entries are always present and can be replaced by name.

use std::collections::BTreeMap;
use std::sync::Arc;

use keel_core::config::{
    ConflictManagerDecl, ConflictManagerKind, LatestStrategyDecl, LatestStrategyKind,
    MatcherKind, MridRuleDecl, NamespaceDecl, SettingsConfig, TransformationDecl,
};
use keel_core::module_id::ModuleId;
use keel_util::errors::{KeelError, KeelResult};

use crate::conflict::{
    ConflictManager, FixedConflictManager, LatestConflictManager, NoConflictManager,
    RegexpConflictManager, StrictConflictManager, NO_CONFLICT, STRICT,
};
use crate::latest::{
    LatestLexicographicStrategy, LatestRevisionStrategy, LatestStrategy, LatestTimeStrategy,
    WorkspaceLatestStrategy, LATEST_REVISION,
};
use crate::matcher::PatternMatcher;
use crate::namespace::{MridRule, MridTransformationRule, Namespace, NamespaceRule};
use crate::rules::{MapMatcher, ModuleRules};
use crate::version::{ChainVersionMatcher, VersionMatcher};

/// Name of the conflict manager alias that always points at the default.
pub const DEFAULT: &str = "default";

#[derive(Debug)]
pub struct ResolutionSettings {
    version_matcher: Arc<dyn VersionMatcher>,
    revision_order: LatestRevisionStrategy,
    matchers: BTreeMap<String, Arc<PatternMatcher>>,
    latest_strategies: BTreeMap<String, Arc<LatestStrategy>>,
    conflict_managers: BTreeMap<String, Arc<ConflictManager>>,
    namespaces: BTreeMap<String, Arc<Namespace>>,
    module_conflict_managers: ModuleRules<Arc<ConflictManager>>,
    default_matcher: Arc<PatternMatcher>,
    default_latest_strategy: Arc<LatestStrategy>,
    default_conflict_manager: Arc<ConflictManager>,
}

impl ResolutionSettings {
    /// Built-in entries only.
    pub fn builtin() -> Self {
        let version_matcher: Arc<dyn VersionMatcher> = Arc::new(ChainVersionMatcher::default());

        let mut matchers = BTreeMap::new();
        for kind in [
            MatcherKind::Exact,
            MatcherKind::Regexp,
            MatcherKind::Glob,
            MatcherKind::ExactOrRegexp,
            MatcherKind::Any,
        ] {
            matchers.insert(
                kind.builtin_name().to_string(),
                Arc::new(PatternMatcher::builtin(kind)),
            );
        }
        let default_matcher = Arc::clone(&matchers[MatcherKind::Exact.builtin_name()]);

        let revision = Arc::new(LatestStrategy::Revision(LatestRevisionStrategy::new(
            LATEST_REVISION,
            Arc::clone(&version_matcher),
        )));
        let lexico = Arc::new(LatestStrategy::Lexicographic(
            LatestLexicographicStrategy::default(),
        ));
        let time = Arc::new(LatestStrategy::Time(LatestTimeStrategy::default()));

        let mut latest_strategies = BTreeMap::new();
        let mut conflict_managers = BTreeMap::new();
        for strategy in [&revision, &lexico, &time] {
            latest_strategies.insert(strategy.name().to_string(), Arc::clone(strategy));
            conflict_managers.insert(
                strategy.name().to_string(),
                Arc::new(ConflictManager::Latest(LatestConflictManager::new(
                    strategy.name(),
                    Arc::clone(strategy),
                ))),
            );
        }
        conflict_managers.insert(
            NO_CONFLICT.to_string(),
            Arc::new(ConflictManager::NoConflict(NoConflictManager::default())),
        );
        conflict_managers.insert(
            STRICT.to_string(),
            Arc::new(ConflictManager::Strict(StrictConflictManager::default())),
        );
        let default_conflict_manager = Arc::clone(&conflict_managers[LATEST_REVISION]);

        let revision_order =
            LatestRevisionStrategy::new(LATEST_REVISION, Arc::clone(&version_matcher));
        Self {
            version_matcher,
            revision_order,
            matchers,
            latest_strategies,
            conflict_managers,
            namespaces: BTreeMap::new(),
            module_conflict_managers: ModuleRules::new(),
            default_matcher,
            default_latest_strategy: revision,
            default_conflict_manager,
        }
    }

    /// Built-ins plus every declaration of `config`.
    pub fn from_config(config: &SettingsConfig) -> KeelResult<Self> {
        let mut settings = Self::builtin();

        unique_names("matcher", config.matchers.iter().map(|d| d.name.as_str()))?;
        for decl in &config.matchers {
            settings.add_matcher(Arc::new(PatternMatcher::new(&decl.name, decl.kind)));
        }
        if let Some(name) = &config.default_matcher {
            settings.default_matcher = settings.matcher_or_default(name, "default matcher");
        }

        unique_names(
            "latest strategy",
            config.latest_strategies.iter().map(|d| d.name.as_str()),
        )?;
        let (workspaces, plain): (Vec<_>, Vec<_>) = config
            .latest_strategies
            .iter()
            .partition(|d| d.kind == LatestStrategyKind::Workspace);
        for decl in plain.into_iter().chain(workspaces) {
            let strategy = settings.build_latest_strategy(decl)?;
            settings.add_latest_strategy(Arc::new(strategy));
        }
        if let Some(name) = &config.default_latest_strategy {
            settings.default_latest_strategy =
                settings.latest_strategy_or_default(name, "default latest strategy");
        }

        unique_names(
            "conflict manager",
            config.conflict_managers.iter().map(|d| d.name.as_str()),
        )?;
        for decl in &config.conflict_managers {
            let manager = settings.build_conflict_manager(decl)?;
            settings.add_conflict_manager(Arc::new(manager));
        }
        if let Some(name) = &config.default_conflict_manager {
            settings.default_conflict_manager =
                settings.conflict_manager_or_default(name, "default conflict manager");
        }

        unique_names("namespace", config.namespaces.iter().map(|d| d.name.as_str()))?;
        for decl in &config.namespaces {
            settings.add_namespace(Arc::new(build_namespace(decl)?));
        }

        for decl in &config.module_rules {
            let matcher = match &decl.matcher {
                Some(name) => settings.matcher_or_default(name, "module rule"),
                None => Arc::clone(&settings.default_matcher),
            };
            let condition = MapMatcher::for_module(&decl.organisation, &decl.module, &matcher)
                .map_err(|e| KeelError::Configuration {
                    message: format!("invalid module rule: {e}"),
                })?;
            let manager =
                settings.conflict_manager_or_default(&decl.conflict_manager, "module rule");
            settings.add_module_conflict_manager(condition, manager);
        }

        tracing::debug!(
            matchers = settings.matchers.len(),
            latest_strategies = settings.latest_strategies.len(),
            conflict_managers = settings.conflict_managers.len(),
            namespaces = settings.namespaces.len(),
            module_rules = settings.module_conflict_managers.len(),
            "settings loaded"
        );
        Ok(settings)
    }

    fn build_latest_strategy(&self, decl: &LatestStrategyDecl) -> KeelResult<LatestStrategy> {
        Ok(match decl.kind {
            LatestStrategyKind::LatestRevision => {
                let mut strategy =
                    LatestRevisionStrategy::new(&decl.name, Arc::clone(&self.version_matcher));
                strategy.set_use_default_special_meanings(decl.use_default_special_meanings);
                for (token, rank) in &decl.special_meanings {
                    strategy.add_special_meaning(token, *rank)?;
                }
                LatestStrategy::Revision(strategy)
            }
            LatestStrategyKind::LatestLexico => {
                LatestStrategy::Lexicographic(LatestLexicographicStrategy::new(&decl.name))
            }
            LatestStrategyKind::LatestTime => {
                LatestStrategy::Time(LatestTimeStrategy::new(&decl.name))
            }
            LatestStrategyKind::Workspace => {
                let delegate = match &decl.delegate {
                    Some(name) => self.latest_strategy_or_default(name, &decl.name),
                    None => Arc::clone(&self.default_latest_strategy),
                };
                LatestStrategy::Workspace(WorkspaceLatestStrategy::new(&decl.name, delegate))
            }
        })
    }

    fn build_conflict_manager(&self, decl: &ConflictManagerDecl) -> KeelResult<ConflictManager> {
        Ok(match decl.kind {
            ConflictManagerKind::All => {
                ConflictManager::NoConflict(NoConflictManager::new(&decl.name))
            }
            ConflictManagerKind::Fixed => ConflictManager::Fixed(FixedConflictManager::new(
                &decl.name,
                decl.revisions.iter().cloned(),
            )),
            ConflictManagerKind::Latest => {
                let strategy = match &decl.latest {
                    Some(name) => self.latest_strategy_or_default(name, &decl.name),
                    None => Arc::clone(&self.default_latest_strategy),
                };
                ConflictManager::Latest(LatestConflictManager::new(&decl.name, strategy))
            }
            ConflictManagerKind::Strict => {
                ConflictManager::Strict(StrictConflictManager::new(&decl.name))
            }
            ConflictManagerKind::Regexp => {
                let pattern = decl.regexp.as_deref().ok_or_else(|| KeelError::Configuration {
                    message: format!("conflict manager '{}' needs a regexp", decl.name),
                })?;
                let manager =
                    RegexpConflictManager::new(&decl.name, pattern, decl.ignore_non_matching)
                        .map_err(|e| match e {
                            KeelError::Configuration { .. } => e,
                            other => KeelError::Configuration {
                                message: format!("conflict manager '{}': {other}", decl.name),
                            },
                        })?;
                ConflictManager::Regexp(manager)
            }
        })
    }

    pub fn add_matcher(&mut self, matcher: Arc<PatternMatcher>) {
        self.matchers.insert(matcher.name().to_string(), matcher);
    }

    pub fn add_latest_strategy(&mut self, strategy: Arc<LatestStrategy>) {
        self.latest_strategies
            .insert(strategy.name().to_string(), strategy);
    }

    pub fn add_conflict_manager(&mut self, manager: Arc<ConflictManager>) {
        self.conflict_managers
            .insert(manager.name().to_string(), manager);
    }

    pub fn add_namespace(&mut self, namespace: Arc<Namespace>) {
        self.namespaces
            .insert(namespace.name().to_string(), namespace);
    }

    /// Route conflicts of matching modules to `manager`.
    pub fn add_module_conflict_manager(
        &mut self,
        condition: MapMatcher,
        manager: Arc<ConflictManager>,
    ) {
        self.module_conflict_managers.define_rule(condition, manager);
    }

    pub fn matcher(&self, name: &str) -> Option<Arc<PatternMatcher>> {
        self.matchers.get(name).cloned()
    }

    pub fn latest_strategy(&self, name: &str) -> Option<Arc<LatestStrategy>> {
        self.latest_strategies.get(name).cloned()
    }

    /// Named conflict manager; `default` names the configured default.
    pub fn conflict_manager(&self, name: &str) -> Option<Arc<ConflictManager>> {
        if name == DEFAULT {
            return Some(Arc::clone(&self.default_conflict_manager));
        }
        self.conflict_managers.get(name).cloned()
    }

    pub fn namespace(&self, name: &str) -> Option<Arc<Namespace>> {
        self.namespaces.get(name).cloned()
    }

    /// Whether the concrete `found` satisfies `asked` under the version
    /// matcher, bounds ranked by the built-in revision order.
    pub fn accepts(&self, asked: &str, found: &str) -> bool {
        self.revision_order.accepts(asked, found)
    }

    pub fn default_matcher(&self) -> Arc<PatternMatcher> {
        Arc::clone(&self.default_matcher)
    }

    pub fn default_latest_strategy(&self) -> Arc<LatestStrategy> {
        Arc::clone(&self.default_latest_strategy)
    }

    pub fn default_conflict_manager(&self) -> Arc<ConflictManager> {
        Arc::clone(&self.default_conflict_manager)
    }

    /// The conflict manager governing a module: first matching module rule,
    /// else the default.
    pub fn conflict_manager_for(&self, module_id: &ModuleId) -> Arc<ConflictManager> {
        self.module_conflict_managers
            .rule_for_module(module_id)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default_conflict_manager))
    }

    pub fn matcher_names(&self) -> impl Iterator<Item = &str> {
        self.matchers.keys().map(String::as_str)
    }

    pub fn latest_strategy_names(&self) -> impl Iterator<Item = &str> {
        self.latest_strategies.keys().map(String::as_str)
    }

    pub fn conflict_manager_names(&self) -> impl Iterator<Item = &str> {
        self.conflict_managers.keys().map(String::as_str)
    }

    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    fn matcher_or_default(&self, name: &str, context: &str) -> Arc<PatternMatcher> {
        self.matcher(name).unwrap_or_else(|| {
            tracing::error!(
                "unknown matcher '{name}' in {context}, using '{}'",
                self.default_matcher.name()
            );
            Arc::clone(&self.default_matcher)
        })
    }

    fn latest_strategy_or_default(&self, name: &str, context: &str) -> Arc<LatestStrategy> {
        self.latest_strategy(name).unwrap_or_else(|| {
            tracing::error!(
                "unknown latest strategy '{name}' in {context}, using '{}'",
                self.default_latest_strategy.name()
            );
            Arc::clone(&self.default_latest_strategy)
        })
    }

    fn conflict_manager_or_default(&self, name: &str, context: &str) -> Arc<ConflictManager> {
        self.conflict_manager(name).unwrap_or_else(|| {
            tracing::error!(
                "unknown conflict manager '{name}' in {context}, using '{}'",
                self.default_conflict_manager.name()
            );
            Arc::clone(&self.default_conflict_manager)
        })
    }
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self::builtin()
    }
}

fn unique_names<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> KeelResult<()> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(KeelError::Configuration {
                message: format!("{kind} declared without a name"),
            });
        }
        if !seen.insert(name) {
            return Err(KeelError::Configuration {
                message: format!("{kind} '{name}' declared twice"),
            });
        }
    }
    Ok(())
}

fn build_namespace(decl: &NamespaceDecl) -> KeelResult<Namespace> {
    let mut namespace = Namespace::new(&decl.name, decl.chain_rules);
    for (i, rule) in decl.rules.iter().enumerate() {
        let label = rule
            .name
            .clone()
            .unwrap_or_else(|| format!("#{}", i + 1));
        let context = format!("namespace '{}' rule {label}", decl.name);
        namespace.add_rule(NamespaceRule {
            name: rule.name.clone(),
            description: rule.description.clone(),
            from_system: build_transformation(&rule.from_system, &context, "from-system")?,
            to_system: build_transformation(&rule.to_system, &context, "to-system")?,
        });
    }
    Ok(namespace)
}

fn build_transformation(
    decl: &TransformationDecl,
    context: &str,
    direction: &str,
) -> KeelResult<MridTransformationRule> {
    let mut transformation = MridTransformationRule::new();
    if decl.src.is_empty() && decl.dest.is_none() {
        return Ok(transformation);
    }
    let configuration = |e: KeelError| KeelError::Configuration {
        message: format!("{context} {direction}: {e}"),
    };
    let Some(dest) = &decl.dest else {
        return Err(KeelError::Configuration {
            message: format!("{context} {direction}: a dest is required"),
        });
    };
    for src in &decl.src {
        transformation.add_src(mrid_rule(src)).map_err(configuration)?;
    }
    transformation.add_dest(mrid_rule(dest)).map_err(configuration)?;
    Ok(transformation)
}

fn mrid_rule(decl: &MridRuleDecl) -> MridRule {
    MridRule {
        org: decl.org.clone(),
        module: decl.module.clone(),
        branch: decl.branch.clone(),
        rev: decl.rev.clone(),
    }
}
