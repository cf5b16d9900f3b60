use std::collections::HashSet;
use std::sync::Arc;

use keel_core::config::SettingsConfig;
use keel_core::module_id::ModuleRevisionId;
use keel_core::snapshot::Snapshot;
use keel_resolver::conflict::{
    ConflictManager, ConflictNode, ConflictReport, FixedConflictManager, LatestConflictManager,
    NoConflictManager, RegexpConflictManager, StrictConflictManager,
};
use keel_resolver::graph::{CandidateGraph, NodeRef};
use keel_resolver::latest::{LatestLexicographicStrategy, LatestStrategy, LatestTimeStrategy};
use keel_resolver::settings::ResolutionSettings;
use keel_util::errors::KeelError;

const SNAPSHOT: &str = r#"
root = "acme#app;1.0"

[[nodes]]
id = "acme#web;1.0"

[[nodes]]
id = "org#lib;1.0"
last-modified = 3000

[[nodes]]
id = "org#lib;1.2"
last-modified = 1000

[[nodes]]
id = "org#lib;1.10"
last-modified = 2000

[[edges]]
from = "acme#app;1.0"
to = "acme#web;1.0"

[[edges]]
from = "acme#app;1.0"
to = "org#lib;1.0"

[[edges]]
from = "acme#app;1.0"
to = "org#lib;1.2"
requested = "1.+"

[[edges]]
from = "acme#app;1.0"
to = "org#lib;1.10"

[[edges]]
from = "acme#web;1.0"
to = "org#lib;1.10"
"#;

fn graph() -> CandidateGraph {
    CandidateGraph::from_snapshot(&Snapshot::parse_toml(SNAPSHOT).unwrap()).unwrap()
}

fn lib_candidates(g: &CandidateGraph) -> Vec<NodeRef<'_>> {
    ["org#lib;1.0", "org#lib;1.2", "org#lib;1.10"]
        .iter()
        .map(|id| g.node_ref(g.find(&ModuleRevisionId::parse(id).unwrap()).unwrap()))
        .collect()
}

fn all_managers() -> Vec<ConflictManager> {
    vec![
        ConflictManager::NoConflict(NoConflictManager::default()),
        ConflictManager::Fixed(FixedConflictManager::new(
            "fixed",
            ["1.2".to_string(), "9.9".to_string()],
        )),
        ConflictManager::Latest(LatestConflictManager::new(
            "lexico",
            Arc::new(LatestStrategy::Lexicographic(
                LatestLexicographicStrategy::default(),
            )),
        )),
        ConflictManager::Latest(LatestConflictManager::new(
            "time",
            Arc::new(LatestStrategy::Time(LatestTimeStrategy::default())),
        )),
        ConflictManager::Strict(StrictConflictManager::default()),
        ConflictManager::Regexp(RegexpConflictManager::new("api", r"(\d+)\..*", false).unwrap()),
    ]
}

#[test]
fn every_manager_returns_a_subset() {
    let g = graph();
    let root = g.node_ref(g.root.unwrap());
    let candidates = lib_candidates(&g);
    let input: HashSet<_> = candidates.iter().map(|n| n.index()).collect();
    for manager in all_managers() {
        if let Ok(kept) = manager.resolve_conflicts(&root, &candidates) {
            for node in kept {
                assert!(input.contains(&node.index()), "{manager} invented {node}");
            }
        }
    }
}

#[test]
fn managers_pick_expected_winners() {
    let g = graph();
    let root = g.node_ref(g.root.unwrap());
    let candidates = lib_candidates(&g);
    let winners: Vec<Option<Vec<String>>> = all_managers()
        .iter()
        .map(|m| {
            m.resolve_conflicts(&root, &candidates).ok().map(|kept| {
                kept.iter()
                    .map(|n| n.resolved_id().revision().to_string())
                    .collect()
            })
        })
        .collect();
    let expect = |revs: &[&str]| Some(revs.iter().map(|r| r.to_string()).collect::<Vec<_>>());
    assert_eq!(winners[0], expect(&["1.0", "1.2", "1.10"]));
    assert_eq!(winners[1], expect(&["1.2"]));
    assert_eq!(winners[2], expect(&["1.2"]));
    assert_eq!(winners[3], expect(&["1.0"]));
    assert_eq!(winners[4], None);
    assert_eq!(winners[5], expect(&["1.10"]));
}

#[test]
fn strict_error_names_both_sides_and_callers() {
    let g = graph();
    let root = g.node_ref(g.root.unwrap());
    let candidates = lib_candidates(&g);
    let err = ConflictManager::Strict(StrictConflictManager::default())
        .resolve_conflicts(&root, &candidates)
        .unwrap_err();
    assert!(matches!(err, KeelError::StrictConflict { .. }));
    assert_eq!(
        err.to_string(),
        "org#lib;1.0 (needed by [acme#app;1.0]) conflicts with \
         org#lib;1.2 (needed by [acme#app;1.0])"
    );
}

#[test]
fn strict_error_lists_every_caller() {
    let g = graph();
    let root = g.node_ref(g.root.unwrap());
    let candidates = lib_candidates(&g);
    let reordered = [candidates[2], candidates[0]];
    let err = ConflictManager::Strict(StrictConflictManager::default())
        .resolve_conflicts(&root, &reordered)
        .unwrap_err();
    assert!(err
        .to_string()
        .starts_with("org#lib;1.10 (needed by [acme#app;1.0, acme#web;1.0])"));
}

#[test]
fn graph_conflict_pass_uses_module_rules() {
    let config = SettingsConfig::from_toml_str(
        r#"
[[module-rules]]
organisation = "org"
conflict-manager = "latest-time"
"#,
    )
    .unwrap();
    let settings = ResolutionSettings::from_config(&config).unwrap();
    let mut g = graph();
    let mut report = ConflictReport::new();
    g.resolve_all(&settings, &mut report).unwrap();
    let evicted: Vec<String> = g.evicted().iter().map(|n| n.id.revision().to_string()).collect();
    assert_eq!(evicted, ["1.2", "1.10"]);
    assert_eq!(report.evictions[0].manager, "latest-time");
}

#[test]
fn graph_conflict_pass_reports_strict_failure() {
    let config = SettingsConfig::from_toml_str(r#"default-conflict-manager = "strict""#).unwrap();
    let settings = ResolutionSettings::from_config(&config).unwrap();
    let mut g = graph();
    let mut report = ConflictReport::new();
    assert!(g.resolve_all(&settings, &mut report).is_err());
    assert!(report.has_problems());
    assert!(report.to_string().contains("conflicts with"));
}

#[test]
fn forced_dependency_wins_in_graph() {
    let forced = SNAPSHOT.replace(
        "to = \"org#lib;1.0\"\n",
        "to = \"org#lib;1.0\"\nforce = true\n",
    );
    let mut g = CandidateGraph::from_snapshot(&Snapshot::parse_toml(&forced).unwrap()).unwrap();
    let mut report = ConflictReport::new();
    g.resolve_all(&ResolutionSettings::builtin(), &mut report)
        .unwrap();
    let evicted: Vec<String> = g.evicted().iter().map(|n| n.id.revision().to_string()).collect();
    assert_eq!(evicted, ["1.2", "1.10"]);
}
