use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage a collaborator failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Embed,
    Tag,
    Thumbnail,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Extract => "text extraction",
            Stage::Embed => "embedding",
            Stage::Tag => "tag extraction",
            Stage::Thumbnail => "thumbnail rendering",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("{stage} failed for {}: {message}", path.display())]
    Collaborator {
        stage: Stage,
        path: PathBuf,
        message: String,
    },

    #[error("model error: {0}")]
    Model(String),

    #[error("invalid vector: {0}")]
    InvalidVector(String),

    #[error("document directory does not exist and could not be created: {0}")]
    DocsDir(PathBuf),
}

impl Error {
    pub fn collaborator(
        stage: Stage,
        path: impl Into<PathBuf>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Collaborator {
            stage,
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}
