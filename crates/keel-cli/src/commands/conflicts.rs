//! Handler for `keel conflicts`.

use std::path::Path;

use miette::Result;

use keel_core::snapshot::Snapshot;
use keel_resolver::conflict::ConflictReport;
use keel_resolver::graph::CandidateGraph;
use keel_resolver::settings::ResolutionSettings;

pub fn exec(settings: &ResolutionSettings, snapshot: &Path, depth: Option<usize>) -> Result<()> {
    let snapshot = Snapshot::from_path(snapshot)?;
    let mut graph = CandidateGraph::from_snapshot(&snapshot)?;
    let mut report = ConflictReport::new();
    let outcome = graph.resolve_all(settings, &mut report);

    print!("{}", graph.print_tree(depth));
    println!();
    println!("{report}");
    outcome?;
    Ok(())
}
