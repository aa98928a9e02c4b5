use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command, ListArgs, SearchArgs, ServeArgs};
use semsearch::{
    Collaborators,
    DocumentStore,
    Error,
    ModelManager,
    Result,
    SearchEngine,
    config::EmbedderKind,
    embedding::{Embedder, HashingEmbedder, ModelEmbedder},
    extract::PdfTextExtractor,
    http,
    search::{self, SearchRequest},
    tags::KeyphraseTagger,
    thumbnail::{DEFAULT_THUMBNAIL_DPI, PdftoppmRenderer},
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("SEMSEARCH_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        Command::Serve(args) => cmd_serve(&cli, args)?,
        Command::Search(args) => cmd_search(&cli, args)?,
        Command::List(args) => cmd_list(&cli, args)?,
        Command::Rebuild => cmd_rebuild(&cli)?,
        Command::Completions(args) => args.generate(),
    }

    Ok(())
}

/// Wire the configured collaborators into an engine over the resolved
/// document directory.
fn build_engine(cli: &Cli, thumbnail_dpi: u32) -> Result<SearchEngine> {
    let store = DocumentStore::resolve(cli.docs_dir.as_deref())?;

    let embedder: Arc<dyn Embedder> = match cli.embedder {
        EmbedderKind::Model => {
            let model = match &cli.model {
                Some(id) => ModelManager::with_model_id(id.clone()),
                None => ModelManager::new(),
            };
            Arc::new(ModelEmbedder::new(model))
        }
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(cli.dimension)),
    };
    tracing::info!(
        docs_dir = %store.root().display(),
        embedder = %embedder.describe(),
        "engine configured"
    );

    let collaborators = Collaborators {
        extractor: Arc::new(PdfTextExtractor::new()),
        tagger: Arc::new(KeyphraseTagger::new(Arc::clone(&embedder))),
        embedder,
    };

    Ok(SearchEngine::new(
        store,
        collaborators,
        Arc::new(PdftoppmRenderer::new(thumbnail_dpi)),
        cli.engine_config(),
    ))
}

fn cmd_serve(cli: &Cli, args: &ServeArgs) -> Result<()> {
    let addr: SocketAddr = args.bind.parse().map_err(|e| {
        Error::Config(format!("invalid bind address {}: {e}", args.bind))
    })?;

    let engine = Arc::new(build_engine(cli, args.thumbnail_dpi)?);
    engine.rebuild()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(http::serve(engine, addr))
}

fn cmd_search(cli: &Cli, args: &SearchArgs) -> Result<()> {
    let engine = build_engine(cli, DEFAULT_THUMBNAIL_DPI)?;
    engine.rebuild()?;

    let mut request = SearchRequest::new(args.query.clone(), args.count);
    if !args.tags.is_empty() {
        request = request.with_tags(args.tags.clone());
    }
    let outcome = engine.search(&request)?;

    if args.json {
        search::format_json(&outcome, &args.query)?;
    } else {
        search::format_human(&outcome);
    }
    Ok(())
}

fn cmd_list(cli: &Cli, args: &ListArgs) -> Result<()> {
    let engine = build_engine(cli, DEFAULT_THUMBNAIL_DPI)?;
    engine.rebuild()?;
    let documents = engine.list_documents();

    if args.json {
        let value = serde_json::json!({ "documents": documents });
        println!("{}", serde_json::to_string(&value)?);
        return Ok(());
    }

    if documents.is_empty() {
        println!("No documents indexed.");
        return Ok(());
    }
    for doc in &documents {
        println!("{:>3}. {} #{}", doc.id, doc.metadata.filename, doc.key);
        if !doc.metadata.tags.is_empty() {
            println!("     tags: {}", doc.metadata.tags.join(", "));
        }
    }
    println!("\n{} document(s)", documents.len());
    Ok(())
}

fn cmd_rebuild(cli: &Cli) -> Result<()> {
    let engine = build_engine(cli, DEFAULT_THUMBNAIL_DPI)?;
    let summary = engine.rebuild()?;
    println!(
        "Indexed {} of {} document(s) from {} ({} skipped)",
        summary.indexed,
        summary.discovered,
        engine.store().root().display(),
        summary.skipped
    );
    Ok(())
}
