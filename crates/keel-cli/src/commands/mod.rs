//! Command dispatch and handler modules.

mod compare;
mod conflicts;
mod latest;
mod matches;
mod sort;
mod transform;

use std::path::Path;
use std::sync::Arc;

use miette::Result;

use keel_core::artifact::RevisionInfo;
use keel_core::config::SettingsConfig;
use keel_resolver::latest::LatestStrategy;
use keel_resolver::settings::ResolutionSettings;
use keel_util::errors::{KeelError, KeelResult};

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli.settings)?;
    match cli.command {
        Command::Sort {
            strategy,
            revisions,
        } => sort::exec(&settings, strategy.as_deref(), &revisions),
        Command::Latest {
            strategy,
            before,
            matching,
            revisions,
        } => latest::exec(
            &settings,
            strategy.as_deref(),
            before,
            matching.as_deref(),
            &revisions,
        ),
        Command::Compare {
            strategy,
            first,
            second,
        } => compare::exec(&settings, strategy.as_deref(), &first, &second),
        Command::Match {
            matcher,
            pattern,
            candidates,
        } => matches::exec(&settings, &matcher, &pattern, &candidates),
        Command::Transform {
            namespace,
            from_system,
            mrid,
        } => transform::exec(&settings, &namespace, from_system, &mrid),
        Command::Conflicts { snapshot, depth } => conflicts::exec(&settings, &snapshot, depth),
    }
}

fn load_settings(path: &Path) -> KeelResult<ResolutionSettings> {
    let config = SettingsConfig::load(path)?;
    ResolutionSettings::from_config(&config)
}

/// The named latest strategy, or the configured default.
fn strategy(settings: &ResolutionSettings, name: Option<&str>) -> KeelResult<Arc<LatestStrategy>> {
    let Some(name) = name else {
        return Ok(settings.default_latest_strategy());
    };
    settings.latest_strategy(name).ok_or_else(|| {
        let known: Vec<&str> = settings.latest_strategy_names().collect();
        KeelError::InvalidArgument {
            message: format!(
                "unknown latest strategy '{name}' (known: {})",
                known.join(", ")
            ),
        }
    })
}

/// `REV` or `REV@MILLIS`; a suffix that is not a number stays part of the revision.
fn parse_revision(arg: &str) -> RevisionInfo {
    if let Some((revision, millis)) = arg.rsplit_once('@') {
        if let Ok(millis) = millis.parse::<i64>() {
            return RevisionInfo::new(revision, millis);
        }
    }
    RevisionInfo::undated(arg)
}

fn parse_revisions(args: &[String]) -> Vec<RevisionInfo> {
    args.iter().map(|a| parse_revision(a)).collect()
}
