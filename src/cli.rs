use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use semsearch::{
    config::{DEFAULT_TOP_K, EmbedderKind, EngineConfig, FailurePolicy},
    embedding::DEFAULT_HASHING_DIMENSION,
    extract::DEFAULT_MAX_PAGES,
    tags::DEFAULT_TAG_COUNT,
    text_util::DEFAULT_PREVIEW_CHARS,
    thumbnail::DEFAULT_THUMBNAIL_DPI,
};

#[derive(Debug, Parser)]
#[command(
    name = "semsearch",
    about = "Semantic search over a directory of PDF documents"
)]
pub struct Cli {
    /// Directory holding the documents (created if missing)
    #[arg(long, global = true, env = "SEMSEARCH_DOCS_DIR")]
    pub docs_dir: Option<PathBuf>,

    /// Embedding backend
    #[arg(long, global = true, value_enum, default_value_t = EmbedderKind::Model)]
    pub embedder: EmbedderKind,

    /// Override the ColBERT model ID or local model path
    #[arg(long, global = true, env = "SEMSEARCH_MODEL")]
    pub model: Option<String>,

    /// Vector dimension of the hashing embedder
    #[arg(long, global = true, default_value_t = DEFAULT_HASHING_DIMENSION)]
    pub dimension: usize,

    /// What to do with a document that fails to process
    #[arg(long, global = true, value_enum, default_value_t = FailurePolicy::Skip)]
    pub failure_policy: FailurePolicy,

    /// Pages of each document read for indexing
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    /// Tags computed per document
    #[arg(long, global = true, default_value_t = DEFAULT_TAG_COUNT)]
    pub tag_count: usize,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_pages: self.max_pages.max(1),
            preview_chars: DEFAULT_PREVIEW_CHARS,
            tag_count: self.tag_count,
            failure_policy: self.failure_policy,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index the document directory and serve the HTTP API
    Serve(ServeArgs),
    /// Index the document directory and run one search
    Search(SearchArgs),
    /// Index the document directory and list what was indexed
    List(ListArgs),
    /// Index the document directory and report the outcome
    Rebuild,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Serve --

#[derive(Debug, Parser)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "SEMSEARCH_BIND", default_value = "0.0.0.0:8000")]
    pub bind: String,

    /// Thumbnail resolution in DPI
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_DPI)]
    pub thumbnail_dpi: u32,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Number of results to return
    #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_K)]
    pub count: i64,

    /// Only return documents carrying one of these tags (repeatable)
    #[arg(short = 't', long = "tag")]
    pub tags: Vec<String>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- List --

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "semsearch",
            &mut std::io::stdout(),
        );
    }
}
