use findcode_indexer::WorkspaceFileSet;
use findcode_protocol::{
    Accuracy, ElementDescriptor, FailureKind, Resolution, ResolveFailure, ResolvedLocation,
};
use findcode_search::{locate, CandidateFileRanker, RankedFile, ScoringProfile};
use findcode_sourcemap::{IndexSnapshot, OriginalPosition};
use log::{debug, info};
use std::path::PathBuf;

/// Runs one resolution: source maps first, then the heuristic search.
///
/// Holds no per-click state; the same coordinator serves concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCoordinator {
    ranker: CandidateFileRanker,
}

impl ResolutionCoordinator {
    pub fn new(profile: ScoringProfile) -> Self {
        Self {
            ranker: CandidateFileRanker::new(profile),
        }
    }

    pub fn profile(&self) -> &ScoringProfile {
        self.ranker.profile()
    }

    pub fn resolve(
        &self,
        descriptor: &ElementDescriptor,
        maps: Option<&IndexSnapshot>,
        files: &WorkspaceFileSet,
    ) -> Resolution {
        if let Some(location) = maps.and_then(|maps| self.from_source_maps(descriptor, maps)) {
            info!(
                "Resolved <{}> via source map: {}:{}:{}",
                descriptor.tag_name,
                files.display_path(&location.file_path),
                location.line,
                location.column
            );
            return Ok(location);
        }

        let result = self.heuristic(descriptor, files);
        match &result {
            Ok(location) => info!(
                "Resolved <{}> heuristically: {} ({})",
                descriptor.tag_name,
                files.display_path(&location.file_path),
                location.confidence_note
            ),
            Err(failure) => info!("No location for <{}>: {failure}", descriptor.tag_name),
        }
        result
    }

    fn from_source_maps(
        &self,
        descriptor: &ElementDescriptor,
        maps: &IndexSnapshot,
    ) -> Option<ResolvedLocation> {
        let hit = maps.find_original_position(descriptor)?;
        let Some(path) = maps.resolve_source_path(&hit.source) else {
            debug!("Source map hit {} is outside the workspace", hit.source);
            return None;
        };
        if !path.is_file() {
            debug!(
                "Source map hit {} does not exist on disk, falling back",
                path.display()
            );
            return None;
        }
        Some(source_map_location(path, &hit, maps))
    }

    fn heuristic(&self, descriptor: &ElementDescriptor, files: &WorkspaceFileSet) -> Resolution {
        let outcome = self.ranker.rank(files, descriptor);
        let Some(RankedFile { path, score, text }) = outcome.best else {
            if outcome.all_unreadable() {
                return Err(ResolveFailure::new(
                    FailureKind::FileUnreadable,
                    format!("None of the {} candidate files could be read", outcome.scanned),
                ));
            }
            return Err(ResolveFailure::no_match(format!(
                "No file mentions <{}> with the given id, class or text ({} scanned)",
                descriptor.tag_name, outcome.scanned
            )));
        };

        let location = match locate(&text, descriptor, self.profile()) {
            Some(position) => ResolvedLocation {
                file_path: path,
                line: to_u32(position.line),
                column: to_u32(position.column),
                accuracy: Accuracy::Fallback,
                confidence_note: format!(
                    "Matched by {} (file score {})",
                    position.strategy.as_str(),
                    score.total()
                ),
                position_unknown: false,
            },
            None => ResolvedLocation {
                file_path: path,
                line: 0,
                column: 0,
                accuracy: Accuracy::Fallback,
                confidence_note: format!(
                    "File matched (score {}) but no line could be located",
                    score.total()
                ),
                position_unknown: true,
            },
        };
        Ok(location)
    }
}

fn source_map_location(
    path: PathBuf,
    hit: &OriginalPosition,
    maps: &IndexSnapshot,
) -> ResolvedLocation {
    let map = hit
        .map_path
        .strip_prefix(maps.root())
        .unwrap_or(&hit.map_path)
        .display()
        .to_string();
    ResolvedLocation {
        file_path: path,
        line: hit.line.saturating_sub(1),
        column: hit.column.saturating_sub(1),
        accuracy: Accuracy::SourceMap,
        confidence_note: format!("Source map {map} ({})", hit.matched_by.describe()),
        position_unknown: false,
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
