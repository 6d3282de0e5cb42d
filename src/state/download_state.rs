//! Outcome states for a client entry
//!
//! Every client entry processed by the resolver ends in exactly one of these
//! states, which is what the ledger records.

use std::fmt;

/// Represents how processing a client entry ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadState {
    // ===== Success States =====
    /// Artifact was fetched and landed in the download directory
    Downloaded,

    /// Artifact file was already on disk, no navigation needed
    AlreadyPresent,

    // ===== Skip States =====
    /// Ledger already holds a successful download for this client
    Skipped,

    // ===== Error States =====
    /// The "latest release" link could not be found on the client page
    VersionUnresolved,

    /// No artifact link was found on the version page
    ArtifactUnresolved,

    /// The download was triggered but did not complete
    Failed,
}

impl DownloadState {
    /// Returns true if the artifact is on disk after this outcome
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded | Self::AlreadyPresent)
    }

    /// Returns true if this represents a skipped entry
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::VersionUnresolved | Self::ArtifactUnresolved | Self::Failed
        )
    }

    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Downloaded => "downloaded",
            Self::AlreadyPresent => "already_present",
            Self::Skipped => "skipped",
            Self::VersionUnresolved => "version_unresolved",
            Self::ArtifactUnresolved => "artifact_unresolved",
            Self::Failed => "failed",
        }
    }

    /// Parses a state from its database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "downloaded" => Some(Self::Downloaded),
            "already_present" => Some(Self::AlreadyPresent),
            "skipped" => Some(Self::Skipped),
            "version_unresolved" => Some(Self::VersionUnresolved),
            "artifact_unresolved" => Some(Self::ArtifactUnresolved),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Downloaded,
            Self::AlreadyPresent,
            Self::Skipped,
            Self::VersionUnresolved,
            Self::ArtifactUnresolved,
            Self::Failed,
        ]
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
