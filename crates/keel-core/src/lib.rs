//! Core data types for keel.
//!
//! This crate defines the values the resolution policy core reasons about:
//! module and module-revision identifiers, the revision/timestamp view shared
//! by graph nodes and plain artifact descriptors, and the declarative file
//! formats (settings and candidate-graph snapshots) loaded once per session.
//!
//! This crate is intentionally free of pattern compilation and policy logic.

pub mod artifact;
pub mod config;
pub mod module_id;
pub mod snapshot;
