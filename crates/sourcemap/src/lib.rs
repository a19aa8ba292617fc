//! # Find Code Source Maps
//!
//! Parses Source Map v3 artifacts found in a workspace and answers
//! "generated position → original position" queries.
//!
//! ```text
//! *.map ──> SourceMapRecord (VLQ decoded, sections flattened)
//!              │
//!              └─> IndexSnapshot ──(Arc swap)──> SourceMapIndex
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use findcode_protocol::ElementDescriptor;
//! use findcode_sourcemap::SourceMapIndex;
//!
//! fn main() -> findcode_sourcemap::Result<()> {
//!     let index = SourceMapIndex::new();
//!     index.initialize("/path/to/project")?;
//!
//!     let descriptor = ElementDescriptor::new("button")
//!         .source_file_hint("app.js")
//!         .generated_position(40, 3);
//!     if let Some(hit) = index.find_original_position(&descriptor) {
//!         println!("{}:{}:{}", hit.source, hit.line, hit.column);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod index;
mod paths;
mod record;
mod vlq;

pub use error::{Result, SourceMapError};
pub use index::{IndexSnapshot, IndexStats, SourceMapIndex};
pub use paths::{normalize_lexically, resolve_within_root};
pub use record::{GeneratedQuery, OriginalPosition, QueryKind, SourceMapRecord};
