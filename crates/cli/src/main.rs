use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cli::reader::{self, Extracted};
use docsort_core::config::{self, AppConfig};
use docsort_core::corpus::{self, Corpus};
use docsort_core::lexicon::CategoryLabel;
use docsort_core::models::{QaQuery, QueryScope, StoredDocument};
use docsort_core::pipeline::{self, Pipeline};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Classify { file, json } => run_classify(cfg, file, json),
        Commands::Analyze { file, json } => run_analyze(cfg, file, json),
        Commands::Ingest { files, json } => run_ingest(cfg, files, json).await,
        Commands::List { category, json } => run_list(cfg, category, json).await,
        Commands::Search {
            keyword,
            category,
            json,
        } => run_search(cfg, keyword, category, json).await,
        Commands::Show { id } => run_show(cfg, id).await,
        Commands::Delete { id } => run_delete(cfg, id).await,
        Commands::Ask {
            question,
            category,
            external,
            json,
        } => run_ask(cfg, question, category, external, json).await,
        Commands::Stats { json } => run_stats(cfg, json).await,
    }
}

#[derive(Parser)]
#[command(name = "docsort")]
#[command(about = "Classify, analyze and query project documents", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a file without storing it
    Classify {
        file: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Classify and analyze a file without storing it
    Analyze {
        file: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Classify, analyze and store files under their primary category
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored documents
    List {
        /// Category folder key or alias (metro, tender, apartment, social-housing, other)
        #[arg(long)]
        category: Option<CategoryLabel>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Find stored documents whose filename or text contains a keyword
    Search {
        keyword: String,
        /// Restrict the search to one category
        #[arg(long)]
        category: Option<CategoryLabel>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a stored document's analysis as JSON
    Show { id: i64 },
    /// Delete a stored document
    Delete { id: i64 },
    /// Ask a question against the stored documents
    Ask {
        question: String,
        /// Restrict retrieval to one category
        #[arg(long)]
        category: Option<CategoryLabel>,
        /// Let the configured language model phrase the answer
        #[arg(long)]
        external: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Stored document count per category
    Stats {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

fn process_file(pipeline: &Pipeline, file: &Path) -> Result<(Extracted, StoredDocument)> {
    let extracted = reader::read_document(file)?;
    let stored = pipeline.process_text(&extracted.filename, extracted.format, &extracted.text);
    Ok((extracted, stored))
}

fn run_classify(cfg: AppConfig, file: PathBuf, json: bool) -> Result<()> {
    let pipeline = Pipeline::new(cfg)?;
    let (_, stored) = process_file(&pipeline, &file)?;
    let c = &stored.classification;
    if json {
        println!("{}", serde_json::to_string_pretty(c)?);
        return Ok(());
    }
    println!("file:       {}", stored.document.filename);
    println!("category:   {} ({})", c.primary.display_name(), c.primary);
    if let Some(secondary) = c.secondary {
        println!("secondary:  {} ({})", secondary.display_name(), secondary);
    }
    println!("confidence: {:.2} ({:?})", c.confidence, c.level);
    if !c.matched_phrases.is_empty() {
        println!("matched:    {}", c.matched_phrases.join(", "));
    }
    for category in CategoryLabel::ALL {
        println!(
            "  {:<24} score {:>4}  matches {:>4}",
            category.folder(),
            c.score(category),
            c.match_counts.get(&category).copied().unwrap_or(0)
        );
    }
    Ok(())
}

fn run_analyze(cfg: AppConfig, file: PathBuf, json: bool) -> Result<()> {
    let pipeline = Pipeline::new(cfg)?;
    let (_, stored) = process_file(&pipeline, &file)?;
    if json {
        let out = serde_json::json!({
            "filename": stored.document.filename,
            "classification": stored.classification,
            "analysis": stored.analysis,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    print_analysis(&stored);
    Ok(())
}

fn print_analysis(stored: &StoredDocument) {
    let c = &stored.classification;
    let a = &stored.analysis;
    println!("file:        {}", stored.document.filename);
    println!(
        "category:    {} ({:.2}, {:?})",
        c.primary.display_name(),
        c.confidence,
        c.level
    );
    println!("sensitivity: {}", a.sensitivity);
    if let Some(t) = &a.metadata.document_type {
        println!("type:        {}", t);
    }
    if let Some(agency) = &a.metadata.issuing_agency {
        println!("agency:      {}", agency);
    }
    if let Some(date) = &a.metadata.issue_date {
        println!("issued:      {}", date);
    }
    println!("summary:     {}", a.summary);
    println!("keywords:    {}", a.keywords.join(", "));
    println!("tags:        {}", a.tags.join(", "));
    if !a.projects.is_empty() {
        println!("projects:    {}", a.projects.join(", "));
    }
    if !a.locations.is_empty() {
        println!("locations:   {}", a.locations.join(", "));
    }
    if !a.legal_references.is_empty() {
        println!("references:  {}", a.legal_references.join(", "));
    }
    println!("actions:");
    for action in &a.suggested_actions {
        println!("  - {}", action);
    }
}

async fn run_ingest(cfg: AppConfig, files: Vec<PathBuf>, json: bool) -> Result<()> {
    let repo = pipeline::open_repository(&cfg).await?;
    let pipeline = Pipeline::new(cfg)?;
    let mut results = Vec::new();
    let mut failed = 0usize;
    for file in &files {
        let extracted = match reader::read_document(file) {
            Ok(e) => e,
            Err(e) => {
                error!(file = %file.display(), error = %e, "skipping file");
                failed += 1;
                continue;
            }
        };
        let outcome = pipeline
            .ingest(&repo, &extracted.filename, extracted.format, &extracted.text)
            .await
            .with_context(|| format!("storing {}", file.display()))?;
        let c = &outcome.stored.classification;
        if !json {
            println!(
                "#{} {} -> {} ({:.2}){}",
                outcome.row_id,
                extracted.filename,
                c.primary,
                c.confidence,
                if outcome.duplicates.is_empty() {
                    String::new()
                } else {
                    format!(" [duplicate of {:?}]", outcome.duplicates)
                }
            );
        }
        results.push(serde_json::json!({
            "id": outcome.row_id,
            "filename": extracted.filename,
            "category": c.primary,
            "secondary": c.secondary,
            "confidence": c.confidence,
            "duplicates": outcome.duplicates,
        }));
    }
    if json {
        let out = serde_json::json!({ "stored": results, "failed": failed });
        println!("{}", serde_json::to_string_pretty(&out)?);
    }
    if failed > 0 {
        bail!("{} of {} files could not be read", failed, files.len());
    }
    Ok(())
}

async fn run_list(cfg: AppConfig, category: Option<CategoryLabel>, json: bool) -> Result<()> {
    let repo = pipeline::open_repository(&cfg).await?;
    let docs = corpus::list(&repo, category).await?;
    print_documents(&docs, json, "no documents stored")
}

async fn run_search(
    cfg: AppConfig,
    keyword: String,
    category: Option<CategoryLabel>,
    json: bool,
) -> Result<()> {
    let repo = pipeline::open_repository(&cfg).await?;
    let docs = corpus::search(&repo, &keyword, category).await?;
    print_documents(&docs, json, "no matching documents")
}

fn print_documents(docs: &[StoredDocument], json: bool, empty: &str) -> Result<()> {
    if json {
        let rows: Vec<_> = docs
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.row_id,
                    "filename": d.document.filename,
                    "format": d.document.format,
                    "category": d.category(),
                    "confidence": d.classification.confidence,
                    "ingested_at": d.document.ingested_at,
                    "document_type": d.analysis.metadata.document_type,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if docs.is_empty() {
        println!("{}", empty);
        return Ok(());
    }
    for d in docs {
        println!(
            "{:>5}  {:<24} {:.2}  {}  {}",
            d.row_id.unwrap_or_default(),
            d.category().folder(),
            d.classification.confidence,
            d.document.ingested_at.format("%Y-%m-%d %H:%M"),
            d.document.filename
        );
    }
    Ok(())
}

async fn run_show(cfg: AppConfig, id: i64) -> Result<()> {
    let repo = pipeline::open_repository(&cfg).await?;
    let Some(doc) = corpus::get(&repo, id).await? else {
        bail!("no stored document with id {}", id);
    };
    let out = serde_json::json!({
        "id": doc.row_id,
        "document_id": doc.document.id,
        "filename": doc.document.filename,
        "format": doc.document.format,
        "size": doc.document.size,
        "content_hash": doc.document.content_hash,
        "ingested_at": doc.document.ingested_at,
        "classification": doc.classification,
        "analysis": doc.analysis,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn run_delete(cfg: AppConfig, id: i64) -> Result<()> {
    let repo = pipeline::open_repository(&cfg).await?;
    if !corpus::delete(&repo, id).await? {
        bail!("no stored document with id {}", id);
    }
    println!("deleted #{}", id);
    Ok(())
}

async fn run_ask(
    cfg: AppConfig,
    question: String,
    category: Option<CategoryLabel>,
    external: bool,
    json: bool,
) -> Result<()> {
    let repo = pipeline::open_repository(&cfg).await?;
    let snapshot = Corpus::load(&repo).await?;
    let pipeline = Pipeline::new(cfg)?;
    let engine = pipeline.qa_engine();
    let query = QaQuery {
        question,
        scope: category.map(QueryScope::Category).unwrap_or(QueryScope::All),
        use_external_synthesis: external,
    };
    let result = engine.answer(&query, &snapshot).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    println!("{}", result.answer);
    if !result.citations.is_empty() {
        println!();
        println!("sources ({:?}):", result.method);
        for c in &result.citations {
            println!("  - {} [{}] relevance {:.3}", c.filename, c.category, c.relevance);
        }
    }
    Ok(())
}

async fn run_stats(cfg: AppConfig, json: bool) -> Result<()> {
    let repo = pipeline::open_repository(&cfg).await?;
    let counts = corpus::category_counts(&repo).await?;
    if json {
        let out: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(c, n)| (c.folder().to_string(), serde_json::json!(n)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    for (category, n) in counts {
        println!("{:<24} {:>5}  {}", category.folder(), n, category.display_name());
    }
    Ok(())
}
