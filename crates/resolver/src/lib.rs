//! # Find Code Resolver
//!
//! Turns an [`ElementDescriptor`](findcode_protocol::ElementDescriptor) into a
//! source location.
//!
//! ```text
//! descriptor ──> SourceMapIndex ──hit, inside root──> Resolved(source_map)
//!                     │ miss
//!                     └─> CandidateFileRanker ──none──> Failed(no_match)
//!                              │ best file
//!                              └─> locate() ──> Resolved(fallback)
//! ```

mod coordinator;
mod session;

pub use coordinator::ResolutionCoordinator;
pub use session::ResolverSession;
