use std::path::{Path, PathBuf};

use crate::error::Result;

/// A discovered document file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the document store root.
    pub relative_path: PathBuf,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
}

impl DiscoveredFile {
    /// The file name shown to users.
    pub fn file_name(&self) -> String {
        self.relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Relative path with `/` separators on every platform.
    pub fn relative_str(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Extensions recognized as documents (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf"];

/// Recursively walk a directory and discover eligible document files.
///
/// Skips hidden files/directories (names starting with `.`) and only
/// returns files with supported extensions. Results are sorted by relative
/// path so every scan of the same tree yields the same order.
pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
    let canonical_root = root.canonicalize()?;
    let mut results = Vec::new();
    walk_dir(&canonical_root, &canonical_root, &mut results)?;
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    results: &mut Vec<DiscoveredFile>,
) -> Result<()> {
    let entries = std::fs::read_dir(current)?;

    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        if name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_dir(root, &entry.path(), results)?;
        } else if file_type.is_symlink() {
            let Ok(resolved) = entry.path().canonicalize() else {
                continue; // broken symlink
            };
            // Directory symlinks are not followed (cycle prevention).
            if resolved.is_file() && is_supported(&resolved) {
                results.push(make_discovered(root, &entry.path(), &resolved));
            }
        } else if file_type.is_file() && is_supported(&entry.path()) {
            let abs = entry.path().canonicalize()?;
            results.push(make_discovered(root, &entry.path(), &abs));
        }
    }

    Ok(())
}

/// Whether `path` carries a recognized document extension.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

fn make_discovered(
    root: &Path,
    original_path: &Path,
    absolute_path: &Path,
) -> DiscoveredFile {
    let relative_path = original_path
        .strip_prefix(root)
        .unwrap_or(original_path)
        .to_path_buf();

    DiscoveredFile {
        relative_path,
        absolute_path: absolute_path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(files: &[DiscoveredFile]) -> Vec<String> {
        files.iter().map(DiscoveredFile::relative_str).collect()
    }

    #[test]
    fn discovers_only_pdfs() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("report.pdf"), "%PDF").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(tmp.path().join("image.png"), "binary").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["report.pdf"]);
    }

    #[test]
    fn extension_is_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("LOUD.PDF"), "%PDF").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name(), "LOUD.PDF");
    }

    #[test]
    fn skips_hidden_files_and_directories() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(".hidden.pdf"), "%PDF").unwrap();
        let hidden = tmp.path().join(".cache");
        std::fs::create_dir(&hidden).unwrap();
        std::fs::write(hidden.join("cached.pdf"), "%PDF").unwrap();
        std::fs::write(tmp.path().join("visible.pdf"), "%PDF").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["visible.pdf"]);
    }

    #[test]
    fn recurses_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("2024");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("annual.pdf"), "%PDF").unwrap();
        std::fs::write(tmp.path().join("top.pdf"), "%PDF").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["2024/annual.pdf", "top.pdf"]);
        assert_eq!(files[0].file_name(), "annual.pdf");
    }

    #[test]
    fn results_are_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["z.pdf", "a.pdf", "m.pdf"] {
            std::fs::write(tmp.path().join(name), "%PDF").unwrap();
        }

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["a.pdf", "m.pdf", "z.pdf"]);
    }

    #[test]
    fn absolute_paths_are_resolved() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), "%PDF").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert!(files[0].absolute_path.is_absolute());
        assert!(files[0].absolute_path.exists());
    }

    #[test]
    fn empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_files(tmp.path()).unwrap().is_empty());
    }
}
