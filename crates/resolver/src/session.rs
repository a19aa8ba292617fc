use crate::ResolutionCoordinator;
use findcode_indexer::WorkspaceFileSet;
use findcode_protocol::{ElementDescriptor, FailureKind, Resolution, ResolveFailure};
use findcode_search::ScoringProfile;
use findcode_sourcemap::{IndexStats, SourceMapIndex};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Process-wide resolver state: the source map index for the current
/// workspace and the coordinator that reads it.
///
/// Constructed once at startup, re-initialized wholesale when the workspace
/// changes and disposed on shutdown.
#[derive(Debug, Default)]
pub struct ResolverSession {
    index: SourceMapIndex,
    coordinator: ResolutionCoordinator,
}

impl ResolverSession {
    /// A session without a workspace. Every resolution reports
    /// [`FailureKind::WorkspaceMissing`] until [`ResolverSession::initialize`].
    pub fn new(profile: ScoringProfile) -> Self {
        Self {
            index: SourceMapIndex::new(),
            coordinator: ResolutionCoordinator::new(profile),
        }
    }

    pub fn open(root: impl AsRef<Path>, profile: ScoringProfile) -> findcode_sourcemap::Result<Self> {
        let session = Self::new(profile);
        session.initialize(root)?;
        Ok(session)
    }

    /// (Re)build the source map index for `root`. In-flight resolutions keep
    /// the snapshot they started with.
    pub fn initialize(&self, root: impl AsRef<Path>) -> findcode_sourcemap::Result<IndexStats> {
        self.index.initialize(root)
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.index.root()
    }

    pub fn index(&self) -> &SourceMapIndex {
        &self.index
    }

    pub fn map_count(&self) -> usize {
        self.index.len()
    }

    /// Resolve against a fresh enumeration of the workspace.
    pub fn resolve(&self, descriptor: &ElementDescriptor) -> Resolution {
        let Some(snapshot) = self.index.snapshot() else {
            warn!("Resolution requested without a workspace root");
            return Err(ResolveFailure::workspace_missing());
        };
        let files = WorkspaceFileSet::scan(snapshot.root()).map_err(|err| {
            ResolveFailure::new(
                FailureKind::WorkspaceMissing,
                format!("Workspace root is not usable: {err}"),
            )
        })?;
        self.coordinator.resolve(descriptor, Some(&*snapshot), &files)
    }

    /// Resolve against a caller-provided file set, e.g. a live enumeration
    /// kept by an editor.
    pub fn resolve_in(&self, descriptor: &ElementDescriptor, files: &WorkspaceFileSet) -> Resolution {
        let snapshot = self.index.snapshot();
        self.coordinator.resolve(descriptor, snapshot.as_deref(), files)
    }

    pub fn dispose(&self) {
        if let Some(root) = self.index.root() {
            info!("Closing resolver session for {}", root.display());
        }
        self.index.dispose();
    }
}
