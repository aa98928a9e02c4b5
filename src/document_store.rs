use std::path::{Component, Path, PathBuf};

use crate::{
    error::{Error, Result},
    walker,
};

pub const DOCS_DIR_ENV_VAR: &str = "SEMSEARCH_DOCS_DIR";

/// The directory holding the source documents.
///
/// Everything the engine indexes lives here; uploads are written here and raw
/// fetches are served from here.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Resolve the document directory from, in order of priority:
    /// 1. An explicit path (from --docs-dir)
    /// 2. The SEMSEARCH_DOCS_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/semsearch/documents/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var(DOCS_DIR_ENV_VAR) {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("semsearch")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
                .join("documents")
        };

        Self::open(&root)
    }

    /// Use `root` as the store, creating it if missing.
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .map_err(|_| Error::DocsDir(root.to_path_buf()))?;
        let root = root
            .canonicalize()
            .map_err(|_| Error::DocsDir(root.to_path_buf()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a store-relative path to an existing file inside the store.
    ///
    /// Absolute paths, `..` components and anything resolving outside the
    /// root are reported as not found.
    pub fn resolve_relative(&self, relative: &str) -> Result<PathBuf> {
        let not_found = || Error::not_found("document", relative);

        let candidate = Path::new(relative);
        let escapes = candidate.components().any(|c| {
            !matches!(c, Component::Normal(_) | Component::CurDir)
        });
        if relative.is_empty() || escapes {
            return Err(not_found());
        }

        let full = self.root.join(candidate);
        let resolved = full.canonicalize().map_err(|_| not_found())?;
        if !resolved.starts_with(&self.root) || !resolved.is_file() {
            return Err(not_found());
        }
        Ok(resolved)
    }

    /// Read a store-relative file.
    pub fn read(&self, relative: &str) -> Result<Vec<u8>> {
        let path = self.resolve_relative(relative)?;
        Ok(std::fs::read(path)?)
    }

    /// Write an uploaded document into the store root.
    ///
    /// Only the final component of `filename` is used. The returned
    /// [`SavedUpload`] can undo the write with [`DocumentStore::revert`].
    pub fn save_upload(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<SavedUpload> {
        let name = sanitize_filename(filename).ok_or_else(|| {
            Error::UnsupportedInput(format!("invalid file name: {filename:?}"))
        })?;
        if !walker::is_supported(Path::new(&name)) {
            return Err(Error::UnsupportedInput(
                "Only PDF files are supported".to_string(),
            ));
        }

        let path = self.root.join(&name);
        let previous = match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        self.write_atomic(&path, bytes)?;
        Ok(SavedUpload {
            name,
            path,
            previous,
        })
    }

    /// Undo an upload: restore the file it replaced, or remove it.
    pub fn revert(&self, saved: &SavedUpload) -> Result<()> {
        match &saved.previous {
            Some(bytes) => self.write_atomic(&saved.path, bytes),
            None => match std::fs::remove_file(&saved.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    Err(e.into())
                }
                _ => Ok(()),
            },
        }
    }

    // Write to a sibling temp file first so a concurrent scan never sees a
    // half-written document.
    fn write_atomic(&self, dest: &Path, bytes: &[u8]) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        std::io::Write::write_all(&mut tmp, bytes)?;
        tmp.persist(dest).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// An upload written into the store.
#[derive(Debug, Clone)]
pub struct SavedUpload {
    /// Stored file name, relative to the store root.
    pub name: String,
    pub path: PathBuf,
    /// Contents of the file this upload replaced, if any.
    previous: Option<Vec<u8>>,
}

impl SavedUpload {
    pub fn replaced_existing(&self) -> bool {
        self.previous.is_some()
    }
}

/// Strip directories from a client-supplied file name.
fn sanitize_filename(filename: &str) -> Option<String> {
    let last = filename.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." || last.starts_with('.')
    {
        return None;
    }
    Some(last.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_with_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::resolve(Some(tmp.path())).unwrap();
        assert_eq!(store.root(), tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn open_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let store = DocumentStore::open(&nested).unwrap();
        assert!(store.root().is_dir());
    }

    #[test]
    fn read_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("a.pdf"), b"%PDF-1.4").unwrap();

        assert_eq!(store.read("a.pdf").unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn read_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();
        assert!(matches!(
            store.read("missing.pdf"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn traversal_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let inner = tmp.path().join("store");
        let store = DocumentStore::open(&inner).unwrap();
        std::fs::write(tmp.path().join("secret.pdf"), b"secret").unwrap();

        for path in ["../secret.pdf", "/etc/passwd", "sub/../../secret.pdf", ""] {
            assert!(
                matches!(store.read(path), Err(Error::NotFound { .. })),
                "{path} should not resolve"
            );
        }
    }

    #[test]
    fn directories_are_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        assert!(matches!(store.read("sub"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn save_upload_writes_into_root() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();

        let saved =
            store.save_upload("../../evil/report.pdf", b"%PDF").unwrap();
        assert_eq!(saved.name, "report.pdf");
        assert!(!saved.replaced_existing());
        assert_eq!(std::fs::read(tmp.path().join("report.pdf")).unwrap(), b"%PDF");
    }

    #[test]
    fn save_upload_rejects_non_pdf() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();

        let err = store.save_upload("notes.txt", b"hello").unwrap_err();
        assert!(matches!(err, Error::UnsupportedInput(_)));
        assert!(!tmp.path().join("notes.txt").exists());
    }

    #[test]
    fn save_upload_rejects_empty_name() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();

        for name in ["", "dir/", "..", ".hidden.pdf"] {
            assert!(matches!(
                store.save_upload(name, b"%PDF"),
                Err(Error::UnsupportedInput(_))
            ));
        }
    }

    #[test]
    fn revert_removes_new_upload() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();

        let saved = store.save_upload("fresh.pdf", b"%PDF").unwrap();
        store.revert(&saved).unwrap();
        assert!(!tmp.path().join("fresh.pdf").exists());
        // Reverting twice is harmless.
        store.revert(&saved).unwrap();
    }

    #[test]
    fn revert_restores_overwritten_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("a.pdf"), b"original").unwrap();

        let saved = store.save_upload("a.pdf", b"replacement").unwrap();
        assert!(saved.replaced_existing());
        assert_eq!(store.read("a.pdf").unwrap(), b"replacement");

        store.revert(&saved).unwrap();
        assert_eq!(store.read("a.pdf").unwrap(), b"original");
    }
}
