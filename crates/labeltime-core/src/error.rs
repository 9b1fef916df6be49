use std::fmt;
use std::path::PathBuf;

use crate::duration::DurationError;

/// Machine-readable error codes for scripts and agents driving `glt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ProjectNotConfigured,
    ConfigParseError,
    ItemNotFound,
    SnapshotUnreadable,
    SnapshotVersionUnsupported,
    TrackerAuthFailed,
    TrackerRequestFailed,
    ReportWriteFailed,
    DurationOverflow,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ProjectNotConfigured => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ItemNotFound => "E2001",
            Self::SnapshotUnreadable => "E3001",
            Self::SnapshotVersionUnsupported => "E3002",
            Self::TrackerAuthFailed => "E4001",
            Self::TrackerRequestFailed => "E4002",
            Self::ReportWriteFailed => "E5001",
            Self::DurationOverflow => "E6001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ProjectNotConfigured => "No GitLab project configured",
            Self::ConfigParseError => "Config file parse error",
            Self::ItemNotFound => "Issue not found",
            Self::SnapshotUnreadable => "Snapshot file unreadable",
            Self::SnapshotVersionUnsupported => "Snapshot version unsupported",
            Self::TrackerAuthFailed => "GitLab authentication failed",
            Self::TrackerRequestFailed => "GitLab request failed",
            Self::ReportWriteFailed => "Report file write failed",
            Self::DurationOverflow => "Duration arithmetic overflowed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ProjectNotConfigured => Some(
                "Pass --project, set GLT_PROJECT, or add [gitlab] project to .glt/config.toml.",
            ),
            Self::ConfigParseError => Some("Fix syntax in .glt/config.toml and retry."),
            Self::ItemNotFound => Some("Check the issue id, or widen the window with --days."),
            Self::SnapshotUnreadable => {
                Some("Regenerate the file with `glt snapshot --output <PATH>`.")
            }
            Self::SnapshotVersionUnsupported => {
                Some("Regenerate the snapshot with this version of glt.")
            }
            Self::TrackerAuthFailed => Some("Pass --token or set GITLAB_TOKEN to a valid token."),
            Self::TrackerRequestFailed => {
                Some("Check the GitLab URL and project id, then retry.")
            }
            Self::ReportWriteFailed => Some("Check the --file path and write permissions."),
            Self::DurationOverflow => {
                Some("Event timestamps are implausible; inspect the item's label history.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors the CLI surfaces with a stable code and a suggestion.
#[derive(Debug, thiserror::Error)]
pub enum LabeltimeError {
    #[error("no GitLab project configured")]
    ProjectNotConfigured,

    #[error("failed to parse {}: {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },

    #[error("issue #{0} not found")]
    ItemNotFound(u64),

    #[error("snapshot {} is unreadable: {reason}", path.display())]
    SnapshotUnreadable { path: PathBuf, reason: String },

    #[error("snapshot version {found} is not supported (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },

    #[error("GitLab rejected the credentials for {url} (HTTP {status})")]
    TrackerAuth { url: String, status: u16 },

    #[error("GitLab request to {url} failed: {reason}")]
    TrackerRequest { url: String, reason: String },

    #[error("failed to write report to {}: {reason}", path.display())]
    ReportWrite { path: PathBuf, reason: String },

    #[error(transparent)]
    Duration(#[from] DurationError),
}

impl LabeltimeError {
    /// The stable [`ErrorCode`] for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ProjectNotConfigured => ErrorCode::ProjectNotConfigured,
            Self::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Self::ItemNotFound(_) => ErrorCode::ItemNotFound,
            Self::SnapshotUnreadable { .. } => ErrorCode::SnapshotUnreadable,
            Self::SnapshotVersion { .. } => ErrorCode::SnapshotVersionUnsupported,
            Self::TrackerAuth { .. } => ErrorCode::TrackerAuthFailed,
            Self::TrackerRequest { .. } => ErrorCode::TrackerRequestFailed,
            Self::ReportWrite { .. } => ErrorCode::ReportWriteFailed,
            Self::Duration(DurationError::Overflow) => ErrorCode::DurationOverflow,
            Self::Duration(DurationError::EmptyInput) => ErrorCode::InternalUnexpected,
        }
    }

    /// Remediation text, falling back to the code's message.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.error_code();
        code.hint().unwrap_or(code.message()).to_string()
    }
}
