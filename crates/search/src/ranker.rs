use crate::profile::ScoringProfile;
use findcode_indexer::WorkspaceFileSet;
use findcode_protocol::ElementDescriptor;
use log::debug;
use std::path::{Path, PathBuf};

/// Points one file earned against one descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileScore {
    /// Tag, class, id and text evidence.
    pub content: u32,
    /// Extension bonus. Never qualifies a file on its own.
    pub extension: u32,
}

impl FileScore {
    pub fn total(&self) -> u32 {
        self.content.saturating_add(self.extension)
    }

    pub fn qualifies(&self) -> bool {
        self.content > 0
    }
}

/// The winning file, with the text it was scored on.
#[derive(Debug, Clone)]
pub struct RankedFile {
    pub path: PathBuf,
    pub score: FileScore,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct RankOutcome {
    pub best: Option<RankedFile>,
    pub scanned: usize,
    pub unreadable: usize,
}

impl RankOutcome {
    /// Every candidate failed to read, so "no match" would be misleading.
    pub fn all_unreadable(&self) -> bool {
        self.scanned > 0 && self.unreadable == self.scanned
    }
}

/// Scores whole files by verbatim evidence of the clicked element.
#[derive(Debug, Clone, Default)]
pub struct CandidateFileRanker {
    profile: ScoringProfile,
}

impl CandidateFileRanker {
    pub fn new(profile: ScoringProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ScoringProfile {
        &self.profile
    }

    pub fn score(&self, path: &Path, text: &str, descriptor: &ElementDescriptor) -> FileScore {
        let weights = self.profile.weights();
        let mut score = FileScore::default();

        if descriptor
            .tag_needle()
            .is_some_and(|needle| text.contains(&needle))
        {
            score.content = score.content.saturating_add(weights.tag);
        }
        if descriptor
            .class_name
            .as_deref()
            .is_some_and(|class| text.contains(class))
        {
            score.content = score.content.saturating_add(weights.class_name);
        }
        if descriptor.id.as_deref().is_some_and(|id| text.contains(id)) {
            score.content = score.content.saturating_add(weights.id);
        }
        let trimmed = descriptor.trimmed_text();
        if !trimmed.is_empty() && text.contains(trimmed) {
            score.content = score.content.saturating_add(weights.text);
        }

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        score.extension = match extension.as_deref() {
            Some("html") => weights.html_extension,
            Some("jsx" | "tsx") => weights.component_extension,
            _ => 0,
        };
        score
    }

    /// Pick the highest scoring file. Ties keep the file that comes first in
    /// the set; files without any content evidence never win.
    pub fn rank(&self, files: &WorkspaceFileSet, descriptor: &ElementDescriptor) -> RankOutcome {
        let mut outcome = RankOutcome::default();

        for path in files.iter() {
            outcome.scanned += 1;
            let text = match files.read(path) {
                Ok(text) => text,
                Err(err) => {
                    debug!("Skipping candidate: {err}");
                    outcome.unreadable += 1;
                    continue;
                }
            };

            let score = self.score(path, &text, descriptor);
            if !score.qualifies() {
                continue;
            }
            let better = outcome
                .best
                .as_ref()
                .map_or(true, |best| score.total() > best.score.total());
            if better {
                outcome.best = Some(RankedFile {
                    path: path.to_path_buf(),
                    score,
                    text,
                });
            }
        }

        if let Some(best) = &outcome.best {
            debug!(
                "Best candidate {} (score {}) out of {} file(s)",
                files.display_path(&best.path),
                best.score.total(),
                outcome.scanned
            );
        }
        outcome
    }
}
