//! # Find Code Indexer
//!
//! Enumerates the files the resolver looks at.
//!
//! ```text
//! Workspace root
//!     │
//!     ├──> FileScanner (html/js/ts/jsx/tsx/vue, .gitignore aware)
//!     │      └─> WorkspaceFileSet (ordered, read lazily)
//!     │
//!     ├──> discover_source_maps (*.map, build output included)
//!     │
//!     └──> WorkspaceWatcher (debounced change batches)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use findcode_indexer::WorkspaceFileSet;
//!
//! fn main() -> findcode_indexer::Result<()> {
//!     let files = WorkspaceFileSet::scan("/path/to/project")?;
//!     for path in files.iter() {
//!         println!("{}", files.display_path(path));
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod file_set;
mod scanner;
mod watcher;

pub use error::{IndexerError, Result};
pub use file_set::WorkspaceFileSet;
pub use scanner::{
    discover_source_maps, FileScanner, ScanOptions, SOURCE_MAP_EXTENSION, WORKSPACE_EXTENSIONS,
};
pub use watcher::{WorkspaceChange, WorkspaceWatcher, WorkspaceWatcherConfig};
