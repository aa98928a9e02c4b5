use std::{path::Path, process::Command};

use crate::error::{Error, Result, Stage};

/// Renders 144 DPI, twice PDF's native 72 units per inch.
pub const DEFAULT_THUMBNAIL_DPI: u32 = 144;

/// Produces a PNG preview of a document's first page.
pub trait ThumbnailRenderer: Send + Sync {
    fn render_first_page(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Renders through poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    program: String,
    dpi: u32,
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_DPI)
    }
}

impl PdftoppmRenderer {
    pub fn new(dpi: u32) -> Self {
        Self {
            program: "pdftoppm".to_string(),
            dpi: dpi.max(1),
        }
    }

    /// Use a different executable (e.g. an absolute path to `pdftoppm`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl ThumbnailRenderer for PdftoppmRenderer {
    fn render_first_page(&self, path: &Path) -> Result<Vec<u8>> {
        let fail = |message: String| {
            Error::collaborator(Stage::Thumbnail, path, message)
        };

        let out_dir = tempfile::tempdir()?;
        let out_root = out_dir.path().join("page");

        let output = Command::new(&self.program)
            .arg("-png")
            .args(["-f", "1", "-l", "1"])
            .arg("-singlefile")
            .args(["-r", &self.dpi.to_string()])
            .arg(path)
            .arg(&out_root)
            .output()
            .map_err(|e| fail(format!("could not run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        std::fs::read(out_root.with_extension("png"))
            .map_err(|e| fail(format!("missing rendered page: {e}")))
    }
}
