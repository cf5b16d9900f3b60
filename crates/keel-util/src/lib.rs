//! Shared utilities for keel.
//!
//! This crate provides the cross-cutting error type used by every other keel
//! crate, so that configuration, matching, and conflict failures surface with
//! the same shape from the library and from the `keel` binary.

pub mod errors;
