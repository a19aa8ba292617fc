use crate::paths::resolve_within_root;
use crate::record::{GeneratedQuery, OriginalPosition, QueryKind, SourceMapRecord};
use crate::{Result, SourceMapError};
use findcode_indexer::discover_source_maps;
use findcode_protocol::ElementDescriptor;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Counts from one index build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub discovered: usize,
    pub loaded: usize,
    pub skipped: usize,
}

/// Immutable set of parsed maps for one workspace root.
///
/// Queries hold an `Arc` to a snapshot, so a rebuild running next to them never
/// changes what they see.
#[derive(Debug)]
pub struct IndexSnapshot {
    root: PathBuf,
    records: Vec<SourceMapRecord>,
}

impl IndexSnapshot {
    /// Parse every discovered map under `root`. Maps that fail to parse are
    /// logged and left out.
    pub fn build(root: impl AsRef<Path>) -> Result<(Self, IndexStats)> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|e| SourceMapError::InvalidRoot(format!("{}: {e}", root.display())))?;

        let paths = discover_source_maps(&root);
        let mut stats = IndexStats {
            discovered: paths.len(),
            ..IndexStats::default()
        };
        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match SourceMapRecord::load(&path) {
                Ok(record) => {
                    debug!(
                        "Loaded {} ({} sources, {} mappings)",
                        path.display(),
                        record.sources().len(),
                        record.mapping_count()
                    );
                    records.push(record);
                    stats.loaded += 1;
                }
                Err(err) => {
                    warn!("Skipping source map {}: {err}", path.display());
                    stats.skipped += 1;
                }
            }
        }

        Ok((Self { root, records }, stats))
    }

    pub fn from_records(root: PathBuf, records: Vec<SourceMapRecord>) -> Self {
        Self { root, records }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn records(&self) -> &[SourceMapRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First hit across records in discovery order. Within a record the exact
    /// coordinates are tried first, then line 1 of the hinted file, then line 1
    /// under each declared source.
    pub fn find_original_position(&self, descriptor: &ElementDescriptor) -> Option<OriginalPosition> {
        let hint = descriptor.source_file_hint.as_deref().unwrap_or_default();

        self.records.iter().find_map(|record| {
            let exact = descriptor.generated_line.and_then(|line| {
                let query = GeneratedQuery {
                    source: hint,
                    line,
                    column: descriptor.generated_column.unwrap_or(1),
                };
                record.query(query, QueryKind::ExactCoordinates)
            });
            exact
                .or_else(|| {
                    let query = GeneratedQuery {
                        source: hint,
                        line: 1,
                        column: 1,
                    };
                    record.query(query, QueryKind::FirstLine)
                })
                .or_else(|| {
                    record.sources().iter().find_map(|source| {
                        let query = GeneratedQuery {
                            source,
                            line: 1,
                            column: 1,
                        };
                        record.query(query, QueryKind::DeclaredSource)
                    })
                })
        })
    }

    /// Absolute path for a source name from a map, or `None` when it would
    /// leave the workspace root.
    pub fn resolve_source_path(&self, source: &str) -> Option<PathBuf> {
        match resolve_within_root(&self.root, source) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("{err}");
                None
            }
        }
    }
}

/// Process-wide source map state, replaced wholesale on every rebuild.
#[derive(Debug, Default)]
pub struct SourceMapIndex {
    current: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl SourceMapIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh snapshot for `root` and swap it in. The previous snapshot
    /// stays visible until the new one is complete.
    pub fn initialize(&self, root: impl AsRef<Path>) -> Result<IndexStats> {
        let (snapshot, stats) = IndexSnapshot::build(root)?;
        info!(
            "Source map index for {}: {} found, {} loaded, {} skipped",
            snapshot.root.display(),
            stats.discovered,
            stats.loaded,
            stats.skipped
        );
        self.install(snapshot);
        Ok(stats)
    }

    pub fn install(&self, snapshot: IndexSnapshot) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Some(Arc::new(snapshot));
    }

    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.snapshot().map(|s| s.root.clone())
    }

    pub fn len(&self) -> usize {
        self.snapshot().map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find_original_position(&self, descriptor: &ElementDescriptor) -> Option<OriginalPosition> {
        self.snapshot()?.find_original_position(descriptor)
    }

    pub fn resolve_source_path(&self, source: &str) -> Option<PathBuf> {
        self.snapshot()?.resolve_source_path(source)
    }

    /// Drop all parsed maps. Queries return nothing until the next
    /// [`SourceMapIndex::initialize`].
    pub fn dispose(&self) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            debug!("Disposed source map index for {}", previous.root.display());
        }
    }
}
