use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use codefix_core::{
    evaluate_cases, load_cases, BugReport, EmbeddingCache, EmbeddingProvider, EvaluationRun,
    HashEmbeddingProvider, KnowledgeBase, MiniLmEmbeddingProvider, RunStatus, SolutionEngine,
    DEFAULT_CACHE_PATH, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_EXAMPLES_PATH,
    DEFAULT_REQUIRED_PASS_RATE,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "codefix")]
#[command(about = "Bug report solution matcher CLI")]
struct Cli {
    /// Path to the curated examples JSON file.
    #[arg(long, global = true, default_value = DEFAULT_EXAMPLES_PATH)]
    examples: PathBuf,

    /// Path to the embedding cache file.
    #[arg(long, global = true, default_value = DEFAULT_CACHE_PATH)]
    cache: PathBuf,

    /// Skip the neural model and use hashed bag-of-words embeddings.
    #[arg(long, global = true)]
    offline: bool,

    /// Directory where the embedding model files are kept.
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Embed every example description and write the cache file.
    Index,
    /// Match a bug report against the knowledge base.
    Analyze {
        /// Short title for the report.
        #[arg(long)]
        title: Option<String>,
        /// Free-text description of the bug.
        #[arg(long)]
        description: Option<String>,
        /// Read the full bug report from a JSON file instead.
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
        threshold: f32,
        /// Print the full match outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Grade the matcher against a labelled case file.
    Eval {
        #[arg(long)]
        cases: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
        threshold: f32,
        #[arg(long, default_value_t = DEFAULT_REQUIRED_PASS_RATE)]
        min_pass_rate: f32,
    },
    /// List the knowledge-base entries.
    Examples,
    /// Report model, knowledge base and cache state.
    Status,
}

fn read_report_json(path: &Path) -> Result<BugReport> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let report: BugReport = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse bug report {}", path.display()))?;
    Ok(report)
}

/// Interactive commands keep working without the model: a load failure drops
/// to hashed embeddings with a warning.
fn make_embedder(cli: &Cli) -> Result<Box<dyn EmbeddingProvider>> {
    if cli.offline {
        return Ok(Box::new(HashEmbeddingProvider::default()));
    }
    match MiniLmEmbeddingProvider::load_with_cache_dir(cli.model_dir.clone()) {
        Ok(provider) => Ok(Box::new(provider)),
        Err(err) => {
            tracing::warn!(
                error = %format!("{err:#}"),
                "embedding model unavailable, falling back to hashed embeddings"
            );
            Ok(Box::new(HashEmbeddingProvider::default()))
        }
    }
}

/// Eval never falls back silently; scores from the wrong embedder would be
/// meaningless.
fn make_embedder_strict(cli: &Cli) -> Result<Box<dyn EmbeddingProvider>> {
    if cli.offline {
        Ok(Box::new(HashEmbeddingProvider::default()))
    } else {
        Ok(Box::new(MiniLmEmbeddingProvider::load_with_cache_dir(
            cli.model_dir.clone(),
        )?))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Index => {
            let kb = KnowledgeBase::load(&cli.examples)?;
            let embedder = make_embedder(&cli)?;
            let descriptions = kb.descriptions();
            let embeddings = embedder.embed_all(&descriptions)?;
            let cache = EmbeddingCache::build(
                embedder.name(),
                embedder.dimension(),
                &descriptions,
                embeddings,
            )?;
            cache.save(&cli.cache)?;

            println!(
                "model={} indexed_examples={} cache={}",
                embedder.name(),
                kb.len(),
                cli.cache.display()
            );
        }
        Commands::Analyze {
            title,
            description,
            report,
            threshold,
            json,
        } => {
            let report = match (description, report) {
                (Some(_), Some(_)) => {
                    bail!("--description and --report are mutually exclusive")
                }
                (Some(description), None) => BugReport::new(
                    title.clone().unwrap_or_else(|| "ad-hoc report".to_string()),
                    description.clone(),
                ),
                (None, Some(path)) => read_report_json(path)?,
                (None, None) => bail!("provide --description or --report"),
            };

            let kb = KnowledgeBase::load(&cli.examples)?;
            let embedder = make_embedder(&cli)?;
            let engine = SolutionEngine::with_cache(kb, embedder, *threshold, &cli.cache)?;
            let outcome = engine.analyze(&report)?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }

            println!(
                "model={} decision={:?} similarity={:.4} confidence={:.4} closest={}",
                engine.status().model,
                outcome.decision,
                outcome.similarity,
                outcome.confidence,
                outcome.best_title.as_deref().unwrap_or("null")
            );
            match &outcome.solution {
                Some(solution) => {
                    println!("title={}", solution.title);
                    println!("solution={}", solution.solution);
                    println!("code_example={}", solution.code_example);
                    println!("source={}", solution.source);
                }
                None => {
                    println!(
                        "hint=no confident match found, try providing more details about the error"
                    );
                }
            }
        }
        Commands::Eval {
            cases,
            threshold,
            min_pass_rate,
        } => {
            let run_id = format!("eval-{}", chrono::Utc::now().timestamp_millis());
            let mut run = EvaluationRun::start(
                run_id,
                cases.to_string_lossy().into_owned(),
                *threshold,
                *min_pass_rate,
            );

            let embedder = match make_embedder_strict(&cli) {
                Ok(embedder) => {
                    run.on_model_ready();
                    embedder
                }
                Err(err) => {
                    run.on_model_failed(format!("{err:#}"));
                    println!(
                        "run_id={} status={:?} required={:.4} error={}",
                        run.run_id,
                        run.status,
                        run.required_pass_rate,
                        run.error.as_deref().unwrap_or("unknown")
                    );
                    std::process::exit(1);
                }
            };

            let kb = KnowledgeBase::load(&cli.examples)?;
            let model_name = embedder.name().to_string();
            let engine = SolutionEngine::with_cache(kb, embedder, *threshold, &cli.cache)?;
            let cases = load_cases(cases)?;
            let summary = evaluate_cases(&engine, &cases)?;
            run.on_completed(&summary);

            println!(
                "run_id={} model={} status={:?} total={} passed={} failed={} pass_rate={:.4} required={:.4} meets_required_rate={}",
                run.run_id,
                model_name,
                run.status,
                summary.total,
                summary.passed,
                summary.failed,
                summary.pass_rate,
                run.required_pass_rate,
                run.meets_required_rate()
            );

            for outcome in &summary.outcomes {
                println!(
                    "case={} passed={} decision={:?} matched={} confidence={:.4} latency={:.1}ms",
                    outcome.case_id,
                    outcome.passed,
                    outcome.actual_decision,
                    outcome.actual_title.as_deref().unwrap_or("null"),
                    outcome.confidence,
                    outcome.latency_ms
                );
            }
            println!("mean_latency={:.1}ms", summary.mean_latency_ms);

            if run.status == RunStatus::Completed && !run.meets_required_rate() {
                std::process::exit(1);
            }
        }
        Commands::Examples => {
            let kb = KnowledgeBase::load(&cli.examples)?;
            println!("examples={}", kb.len());
            for (position, example) in kb.examples().iter().enumerate() {
                println!(
                    "example={} title={} tags={} source={}",
                    position,
                    example.title,
                    example.tags.join(","),
                    example.source
                );
            }
        }
        Commands::Status => {
            // Read-only: report state without embedding or touching the cache.
            let kb = KnowledgeBase::load(&cli.examples)?;
            let embedder = make_embedder(&cli)?;
            let cache_state = match EmbeddingCache::load(&cli.cache) {
                Some(cache)
                    if cache.matches(embedder.name(), embedder.dimension(), &kb.descriptions()) =>
                {
                    "warm"
                }
                Some(_) => "stale",
                None => "missing",
            };

            println!(
                "model={} dimension={} examples={} threshold={:.2} cache={} cache_state={}",
                embedder.name(),
                embedder.dimension(),
                kb.len(),
                DEFAULT_CONFIDENCE_THRESHOLD,
                cli.cache.display(),
                cache_state
            );
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
