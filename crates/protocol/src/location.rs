use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How a location was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    /// Derived from source map data.
    SourceMap,
    /// Heuristic text/tag matching.
    Fallback,
}

impl Accuracy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceMap => "source_map",
            Self::Fallback => "fallback",
        }
    }
}

/// Final answer of one resolution. Line and column are 0-based.
///
/// When `position_unknown` is set the file was identified but no line could be
/// located; `line` and `column` are then `0` and callers should open the file
/// without moving the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    pub file_path: PathBuf,
    pub line: u32,
    pub column: u32,
    pub accuracy: Accuracy,
    pub confidence_note: String,
    #[serde(default)]
    pub position_unknown: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoMatch,
    FileUnreadable,
    WorkspaceMissing,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoMatch => "no_match",
            Self::FileUnreadable => "file_unreadable",
            Self::WorkspaceMissing => "workspace_missing",
        }
    }
}

/// Structured, non-fatal failure of one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ResolveFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn no_match(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NoMatch, message)
    }

    pub fn workspace_missing() -> Self {
        Self::new(
            FailureKind::WorkspaceMissing,
            "No workspace root configured",
        )
    }
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for ResolveFailure {}

pub type Resolution = std::result::Result<ResolvedLocation, ResolveFailure>;

/// JSON envelope returned by the HTTP endpoint and the one-shot CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionResponse {
    Resolved { location: ResolvedLocation },
    Failed { failure: ResolveFailure },
}

impl ResolutionResponse {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

impl From<Resolution> for ResolutionResponse {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Ok(location) => Self::Resolved { location },
            Err(failure) => Self::Failed { failure },
        }
    }
}
