//! Resolution policy engine: which competing revisions of a module survive,
//! what "latest" means, and how module identifiers cross namespaces.
//!
//! Everything here is built once from settings and is then stateless per
//! call, apart from lazily compiled pattern caches that are safe to share
//! across resolve threads.

pub mod conflict;
pub mod graph;
pub mod latest;
pub mod matcher;
pub mod namespace;
pub mod rules;
pub mod settings;
pub mod version;
