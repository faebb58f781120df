mod config;
mod database;
mod embedding;
mod error;
mod extract;
mod files;
mod ingest;
mod persist;
mod prompt;
mod search;
mod splitter;
mod vector_entry;
mod vector_ops;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;

use crate::config::Settings;
use crate::database::VectorStore;
use crate::ingest::{run_ingest_session, IngestPipeline};
use crate::persist::{load_if_present, merge_and_persist};
use crate::search::{run_search_session, OutputFormat};
use crate::vector_ops::compute_cosine_similarity_simd;

#[derive(Parser)]
#[command(name = "embedstore")]
#[command(version = "0.1")]
#[command(about = "Embed text, keep it in a vector store file, search it", long_about = None)]
struct Cli {
    /// Config file (defaults to embedstore.{toml,json,yaml,ini} if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk and embed every matching document under a directory
    Ingest {
        directory: PathBuf,
        /// File extensions to pick up (defaults to the configured list)
        #[arg(long = "ext")]
        extensions: Vec<String>,
    },
    /// Prompt for file paths and ingest them sentence by sentence
    IngestFiles,
    /// Prompt for queries and search the store
    Search {
        /// One JSON object per query instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print a directory tree, marking files with the given extensions
    ListFiles {
        start_directory: Option<PathBuf>,
        extensions: Vec<String>,
    },
    /// Print the embedding of a piece of text
    Embed { text: String },
    /// Cosine similarity between the embeddings of two texts
    Compare { first: String, second: String },
    /// Print the effective configuration
    Config,
}

fn ingest_command(settings: &Settings, directory: PathBuf, extensions: Vec<String>) -> Result<()> {
    let provider = embedding::from_settings(&settings.embedding)?;
    let extensions = if extensions.is_empty() {
        settings.ingest.extensions.clone()
    } else {
        extensions
    };

    let mut store = VectorStore::new();
    let report = IngestPipeline::new(&mut store, provider.as_ref(), settings.ingest.clone())
        .ingest_documents(&directory, &extensions)
        .with_context(|| format!("Failed to ingest '{}'", directory.display()))?;

    println!(
        "Loaded {} documents into the vector store [{}]",
        report.documents,
        settings.store_path.display()
    );
    if !report.skipped.is_empty() {
        eprintln!("Skipped {} documents:", report.skipped.len());
        for (path, reason) in &report.skipped {
            eprintln!("  {}: {}", path.display(), reason);
        }
    }

    merge_and_persist(&store, &settings.store_path)
        .with_context(|| format!("Failed to persist '{}'", settings.store_path.display()))?;
    Ok(())
}

fn ingest_files_command(settings: &Settings) -> Result<()> {
    let provider = embedding::from_settings(&settings.embedding)?;
    let stdin = io::stdin();
    let store = run_ingest_session(stdin.lock(), io::stdout(), provider.as_ref(), settings)?;
    println!("Ingested {} segments into [{}]", store.len(), settings.store_path.display());
    Ok(())
}

fn search_command(settings: &Settings, json: bool) -> Result<()> {
    let store = match load_if_present(&settings.store_path)? {
        Some(store) => store,
        None => {
            eprintln!(
                "Vector store [{}] does not exist or has 0 length.",
                settings.store_path.display()
            );
            std::process::exit(0);
        }
    };
    let provider = embedding::from_settings(&settings.embedding)?;
    if store.dimension() != Some(provider.dimensions()) {
        log::warn!(
            "Store holds {:?}-dimensional vectors but the provider produces {}",
            store.dimension(),
            provider.dimensions()
        );
    }
    let format = if json { OutputFormat::Json } else { OutputFormat::Text };

    let stdin = io::stdin();
    run_search_session(stdin.lock(), io::stdout(), &store, provider.as_ref(), settings, format)?;
    Ok(())
}

fn list_files_command(start_directory: Option<PathBuf>, extensions: Vec<String>) -> Result<()> {
    let Some(root) = start_directory else {
        eprintln!("Usage: embedstore list-files <start-directory> [extensions...]");
        std::process::exit(1);
    };
    if !root.is_dir() {
        eprintln!("Invalid directory: {}", root.display());
        return Ok(());
    }
    files::list_tree(&root, &extensions, &mut io::stdout().lock())?;
    Ok(())
}

fn embed_command(settings: &Settings, text: &str) -> Result<()> {
    let provider = embedding::from_settings(&settings.embedding)?;
    let embedding = provider.embed(text)?;
    println!("{} elements: {:?}", embedding.len(), embedding);
    Ok(())
}

fn compare_command(settings: &Settings, first: &str, second: &str) -> Result<()> {
    let provider = embedding::from_settings(&settings.embedding)?;
    let a = provider.embed(first)?;
    let b = provider.embed(second)?;
    let similarity = compute_cosine_similarity_simd(&a, &b)
        .context("Provider returned embeddings of different lengths")?;
    println!("Cosine Similarity: {}", similarity);
    Ok(())
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(&args);
    let settings = Settings::load(args.config.as_deref())?;

    match args.command {
        Commands::Ingest {
            directory,
            extensions,
        } => ingest_command(&settings, directory, extensions)?,
        Commands::IngestFiles => ingest_files_command(&settings)?,
        Commands::Search { json } => search_command(&settings, json)?,
        Commands::ListFiles {
            start_directory,
            extensions,
        } => list_files_command(start_directory, extensions)?,
        Commands::Embed { text } => embed_command(&settings, &text)?,
        Commands::Compare { first, second } => compare_command(&settings, &first, &second)?,
        Commands::Config => settings.print_config(),
    }
    Ok(())
}
