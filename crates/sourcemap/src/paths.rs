use crate::{Result, SourceMapError};
use std::path::{Component, Path, PathBuf};

/// Resolve a source name from a map against `root` and require the result to
/// stay inside it. `root` is expected to be canonical.
///
/// `file://` names are taken as absolute paths; any other `scheme://` prefix
/// (`webpack:///`, `vite://`) is dropped and the rest is read as root-relative.
/// Existing paths are canonicalized again so a symlink cannot lead outside.
pub fn resolve_within_root(root: &Path, source: &str) -> Result<PathBuf> {
    let rejected = || SourceMapError::PathTraversalRejected(source.to_string());

    let trimmed = source
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    if trimmed.is_empty() {
        return Err(rejected());
    }

    let candidate = if let Some(rest) = trimmed.strip_prefix("file://") {
        PathBuf::from(rest)
    } else if let Some((_, rest)) = trimmed.split_once("://") {
        root.join(rest.trim_start_matches('/'))
    } else {
        root.join(trimmed)
    };

    let normalized = normalize_lexically(&candidate).ok_or_else(rejected)?;
    if !normalized.starts_with(root) || normalized == root {
        return Err(rejected());
    }

    match normalized.canonicalize() {
        Ok(real) if real.starts_with(root) => Ok(real),
        Ok(_) => Err(rejected()),
        Err(_) => Ok(normalized),
    }
}

/// Collapse `.` and `..` without touching the filesystem. Returns `None` when
/// `..` would climb above the first component.
pub fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    return None;
                }
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn normalizes_dots() {
        assert_eq!(
            normalize_lexically(Path::new("/w/src/../lib/./a.ts")),
            Some(PathBuf::from("/w/lib/a.ts"))
        );
        assert_eq!(normalize_lexically(Path::new("/../etc")), None);
        assert_eq!(normalize_lexically(Path::new("../a")), None);
    }

    #[test]
    fn relative_and_scheme_sources_resolve_under_root() {
        let temp = tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/Form.tsx"), "").unwrap();

        let expected = root.join("src/Form.tsx");
        assert_eq!(resolve_within_root(&root, "src/Form.tsx").unwrap(), expected);
        assert_eq!(resolve_within_root(&root, "./src/Form.tsx").unwrap(), expected);
        assert_eq!(
            resolve_within_root(&root, "webpack:///./src/Form.tsx").unwrap(),
            expected
        );
        assert_eq!(
            resolve_within_root(&root, "src/Form.tsx?v=3").unwrap(),
            expected
        );
        let file_url = format!("file://{}", expected.display());
        assert_eq!(resolve_within_root(&root, &file_url).unwrap(), expected);
    }

    #[test]
    fn escapes_are_rejected() {
        let temp = tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();

        for source in ["../../etc/passwd", "src/../../x.ts", "/etc/passwd", "file:///etc/passwd", "", "."] {
            let err = resolve_within_root(&root, source).unwrap_err();
            assert!(
                matches!(err, SourceMapError::PathTraversalRejected(_)),
                "{source}: {err}"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_out_of_root_are_rejected() {
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("secret.ts"), "").unwrap();
        let temp = tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("linked")).unwrap();

        assert!(resolve_within_root(&root, "linked/secret.ts").is_err());
    }
}
