use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Extensions of files that may contain the markup of a clicked element.
pub const WORKSPACE_EXTENSIONS: &[&str] = &["html", "js", "ts", "jsx", "tsx", "vue"];

pub const SOURCE_MAP_EXTENSION: &str = "map";

const MAX_WORKSPACE_FILE_BYTES: u64 = 1_048_576; // 1 MB
const MAX_SOURCE_MAP_BYTES: u64 = 64 * 1_048_576;

/// What a [`FileScanner`] collects and how it walks.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub extensions: Vec<String>,
    /// Honour `.gitignore`, hidden-file rules and build-output scopes.
    pub source_tree_only: bool,
    pub max_file_size: u64,
}

impl ScanOptions {
    /// Candidate files for the heuristic search.
    pub fn workspace_files() -> Self {
        Self {
            extensions: WORKSPACE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            source_tree_only: true,
            max_file_size: MAX_WORKSPACE_FILE_BYTES,
        }
    }

    /// Source map artifacts. Build output is usually gitignored, so the walk
    /// only skips VCS metadata and dependency folders.
    pub fn source_maps() -> Self {
        Self {
            extensions: vec![SOURCE_MAP_EXTENSION.to_string()],
            source_tree_only: false,
            max_file_size: MAX_SOURCE_MAP_BYTES,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::workspace_files()
    }
}

/// Scanner for finding candidate files under a workspace root
pub struct FileScanner {
    root: PathBuf,
    options: ScanOptions,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_options(root, ScanOptions::workspace_files())
    }

    pub fn with_options(root: impl AsRef<Path>, options: ScanOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root and return matching files sorted by path within each
    /// directory, so the enumeration order is stable across runs.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let source_tree_only = self.options.source_tree_only;
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(source_tree_only)
            .hidden(source_tree_only)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.filter_entry(move |entry| {
            !FileScanner::is_ignored_scope(entry.path(), &root, source_tree_only)
        });

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if !self.has_wanted_extension(path) {
                        continue;
                    }

                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > self.options.max_file_size {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                self.options.max_file_size
                            );
                            continue;
                        }
                    }

                    files.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        log::debug!(
            "Found {} files ({}) under {}",
            files.len(),
            self.options.extensions.join(","),
            self.root.display()
        );
        files
    }

    fn has_wanted_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.options
                    .extensions
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(ext))
            })
    }

    /// Dependency and VCS folders are skipped at any depth. Build output is
    /// skipped only directly under the root.
    pub(crate) fn is_ignored_scope(path: &Path, root: &Path, source_tree_only: bool) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        relative
            .components()
            .enumerate()
            .any(|(depth, component)| {
                let std::path::Component::Normal(name) = component else {
                    return false;
                };
                let lowered = name.to_string_lossy().to_lowercase();
                ALWAYS_IGNORED.contains(&lowered.as_str())
                    || (source_tree_only
                        && depth == 0
                        && BUILD_OUTPUT_SCOPES.contains(&lowered.as_str()))
            })
    }
}

/// Enumerate `*.map` artifacts under `root` in discovery order.
pub fn discover_source_maps(root: impl AsRef<Path>) -> Vec<PathBuf> {
    FileScanner::with_options(root, ScanOptions::source_maps()).scan()
}

pub(crate) const ALWAYS_IGNORED: &[&str] = &[
    // VCS
    ".git",
    ".hg",
    ".svn",
    // dependencies
    "node_modules",
    "bower_components",
    "jspm_packages",
];

const BUILD_OUTPUT_SCOPES: &[&str] = &[
    "dist",
    "build",
    "out",
    "coverage",
    ".next",
    ".nuxt",
    ".output",
    ".svelte-kit",
    ".vite",
    ".parcel-cache",
    ".turbo",
    ".cache",
];
