//! CLI argument definitions for Keel.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "keel",
    version,
    about = "Inspect dependency resolution policies",
    long_about = "Keel exercises the resolution policy core (pattern matchers, latest \
                  strategies, conflict managers and namespaces) against a settings file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file; built-in defaults are used when it does not exist
    #[arg(short, long, global = true, env = "KEEL_SETTINGS", default_value = "keel.toml")]
    pub settings: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sort revisions from oldest to latest
    Sort {
        /// Latest strategy name
        #[arg(long)]
        strategy: Option<String>,
        /// Revisions, optionally suffixed with @<epoch millis>
        #[arg(required = true)]
        revisions: Vec<String>,
    },

    /// Pick the latest revision
    Latest {
        /// Latest strategy name
        #[arg(long)]
        strategy: Option<String>,
        /// Only consider revisions published before this epoch millis
        #[arg(long)]
        before: Option<i64>,
        /// Only consider revisions satisfying this request, e.g. `1.+` or `[1.0,2.0[`
        #[arg(long)]
        matching: Option<String>,
        /// Revisions, optionally suffixed with @<epoch millis>
        #[arg(required = true)]
        revisions: Vec<String>,
    },

    /// Compare two revisions
    Compare {
        /// Latest strategy name
        #[arg(long)]
        strategy: Option<String>,
        first: String,
        second: String,
    },

    /// Test candidates against a pattern
    Match {
        /// Matcher name
        #[arg(short, long, default_value = "exact")]
        matcher: String,
        pattern: String,
        #[arg(required = true)]
        candidates: Vec<String>,
    },

    /// Translate a module revision id through a namespace
    Transform {
        /// Namespace name
        #[arg(short, long)]
        namespace: String,
        /// Translate out of the system namespace instead of into it
        #[arg(long)]
        from_system: bool,
        /// Module revision id: org#name[#branch];rev
        mrid: String,
    },

    /// Replay conflict resolution over a candidate graph snapshot
    Conflicts {
        /// Snapshot TOML file
        snapshot: PathBuf,
        /// Maximum tree depth to print
        #[arg(short, long)]
        depth: Option<usize>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
