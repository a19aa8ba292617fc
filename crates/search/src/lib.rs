//! # Find Code Search
//!
//! Heuristic half of the resolver: find the file most likely to contain a
//! clicked element, then the line inside it.
//!
//! ```text
//! WorkspaceFileSet ──> CandidateFileRanker ──> best file
//!                                                 │
//!                                                 └─> locate() ──> Position
//! ```

mod error;
mod locator;
mod profile;
mod ranker;

pub use error::{Result, SearchError};
pub use locator::{locate, split_lines, Position, Strategy};
pub use profile::{ScoreWeights, ScoringProfile};
pub use ranker::{CandidateFileRanker, FileScore, RankOutcome, RankedFile};
