use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceMapError>;

#[derive(Error, Debug)]
pub enum SourceMapError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed source map {path}: {reason}")]
    MapParse { path: PathBuf, reason: String },

    #[error("Unsupported source map version {0} (expected 3)")]
    UnsupportedVersion(u32),

    #[error("Invalid mappings: {0}")]
    InvalidMappings(String),

    #[error("Source path {0} escapes the workspace root")]
    PathTraversalRejected(String),

    #[error("Invalid workspace root: {0}")]
    InvalidRoot(String),
}
