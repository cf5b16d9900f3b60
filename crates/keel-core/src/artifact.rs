//! The revision/timestamp view shared by everything a latest strategy ranks.

use std::fmt;

/// Anything exposing a revision string and a last-modified timestamp.
///
/// Graph nodes and plain artifact descriptors both implement this, so the
/// latest strategies never need to know where a candidate came from.
pub trait ArtifactInfo {
    fn revision(&self) -> &str;

    /// Epoch milliseconds; `0` when unknown.
    fn last_modified(&self) -> i64;
}

/// A plain artifact descriptor: a revision published at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionInfo {
    pub revision: String,
    pub last_modified: i64,
}

impl RevisionInfo {
    pub fn new(revision: impl Into<String>, last_modified: i64) -> Self {
        Self {
            revision: revision.into(),
            last_modified,
        }
    }

    /// A descriptor with an unknown timestamp.
    pub fn undated(revision: impl Into<String>) -> Self {
        Self::new(revision, 0)
    }
}

impl ArtifactInfo for RevisionInfo {
    fn revision(&self) -> &str {
        &self.revision
    }

    fn last_modified(&self) -> i64 {
        self.last_modified
    }
}

impl<T: ArtifactInfo + ?Sized> ArtifactInfo for &T {
    fn revision(&self) -> &str {
        (**self).revision()
    }

    fn last_modified(&self) -> i64 {
        (**self).last_modified()
    }
}

impl fmt::Display for RevisionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.revision)
    }
}
