//! rustpapertask - Academic paper task classification
//!
//! Classifies papers into research-task categories with an LLM and exports
//! the structured analysis as CSV.
//!
//! ## Usage
//!
//! ### Analyze papers found on OpenAlex
//! ```bash
//! rustpapertask analyze --preset embodied_ai --extended
//! ```
//!
//! ### Analyze a local file
//! ```bash
//! rustpapertask analyze --input papers.json --output ./output
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rustpapertask::config::{default_config_path, UserConfig};
use rustpapertask::export::{self, CsvRecordSink};
use rustpapertask::gateway::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use rustpapertask::report::{export_report, RunInfo, RunReport};
use rustpapertask::sources::{self, file, openalex};
use rustpapertask::stats::{self, Summary, HIGH_NOVELTY_THRESHOLD};
use rustpapertask::taxonomy::format_taxonomy;
use rustpapertask::{presets, GatewayConfig, ModelGateway, PaperAnalyzer, PaperInput, Taxonomy};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Academic paper task classification with LLMs
#[derive(Parser)]
#[command(name = "rustpapertask")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify papers and export the analysis
    Analyze(AnalyzeArgs),

    /// Print the effective task taxonomy
    Taxonomy {
        /// Config file (default: ~/.rustpapertask/config.json)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Merge the categories of this preset
        #[arg(long)]
        preset: Option<String>,
    },

    /// List search presets
    Presets,

    /// Manage the user config file
    Config {
        /// Config file (default: ~/.rustpapertask/config.json)
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Start from this preset
        #[arg(long)]
        preset: Option<String>,
    },
    /// Print the effective config
    Show,
    /// Show config file path
    Path,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Papers to analyze (.json or .csv); searches OpenAlex when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Search keywords, comma-separated (overrides config)
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,

    /// arXiv subject codes such as cs.AI,cs.RO, comma-separated (overrides config)
    #[arg(long, value_delimiter = ',')]
    research_categories: Vec<String>,

    /// Start of the publication window, YYYY-MM-DD
    #[arg(long)]
    start_date: Option<String>,

    /// End of the publication window, YYYY-MM-DD
    #[arg(long)]
    end_date: Option<String>,

    /// Maximum number of papers to analyze
    #[arg(long)]
    max_papers: Option<usize>,

    /// Apply a named preset before other overrides
    #[arg(long)]
    preset: Option<String>,

    /// Config file (default: ~/.rustpapertask/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep only input-file papers mentioning a keyword and, when they carry
    /// categories, falling in the configured research categories
    #[arg(long)]
    filter: bool,

    /// Contact email for the OpenAlex polite pool
    #[arg(long, env = "OPENALEX_MAILTO")]
    mailto: Option<String>,

    // === Model Gateway ===
    /// API key for the chat-completion endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_API_BASE", default_value = DEFAULT_BASE_URL)]
    api_base: String,

    /// Model name
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL)]
    model: String,

    /// Language of free-text answers (overrides config)
    #[arg(long, env = "OUTPUT_LANGUAGE")]
    language: Option<String>,

    /// Also ask for research field and novelty score
    #[arg(long)]
    extended: bool,

    /// Minimum novelty score for the high-novelty export
    #[arg(long, default_value_t = HIGH_NOVELTY_THRESHOLD)]
    min_novelty: u8,

    /// Also write a Markdown and JSON run report
    #[arg(long)]
    report: bool,

    /// Output directory
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Analyze(args) => run_analyze(args).await,
        Commands::Taxonomy { config, preset } => print_taxonomy(config, preset),
        Commands::Presets => {
            list_presets();
            Ok(())
        }
        Commands::Config { config, action } => handle_config(config, action),
    }
}

// ============================================================================
// Analysis Pipeline
// ============================================================================

async fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config_path = resolve_config_path(args.config.clone())?;
    let mut config = UserConfig::load(&config_path).context("Failed to load config")?;

    if let Some(name) = &args.preset {
        find_preset(name)?.apply_to(&mut config);
    }
    if !args.keywords.is_empty() {
        config.search_keywords = args.keywords.clone();
    }
    if !args.research_categories.is_empty() {
        config.research_categories = args.research_categories.clone();
    }
    if let Some(start) = &args.start_date {
        config.start_date = start.clone();
    }
    if let Some(end) = &args.end_date {
        config.end_date = end.clone();
    }
    if let Some(max) = args.max_papers {
        config.max_papers = max;
    }
    if let Some(language) = &args.language {
        config.output_language = language.clone();
    }
    let extended = args.extended || config.extended_analysis;

    let taxonomy = config.taxonomy().context("Invalid task taxonomy")?;
    info!(categories = taxonomy.len(), extended = extended, "Loaded taxonomy");

    // ===========================================
    // STAGE 1: Collect papers
    // ===========================================
    let mut papers = collect_papers(&args, &config).await?;
    if !config.include_author_affiliations {
        papers.iter_mut().for_each(PaperInput::drop_affiliations);
    }
    if papers.is_empty() {
        println!("No papers to analyze.");
        return Ok(());
    }
    println!("Collected {} papers.", papers.len());

    // ===========================================
    // STAGE 2: Classify
    // ===========================================
    let api_key = args
        .api_key
        .context("Missing API key: pass --api-key or set OPENAI_API_KEY")?;
    let gateway_config = GatewayConfig::new(api_key)
        .with_base_url(args.api_base)
        .with_model(args.model.clone())
        .with_language(config.output_language.clone());
    let gateway = ModelGateway::connect(gateway_config).context("Invalid model gateway settings")?;
    let analyzer = PaperAnalyzer::new(gateway, taxonomy, extended);

    let results_path = export::timestamped_path(&args.output, "analysis_results")
        .context("Failed to create output directory")?;
    println!("Writing records to {}", results_path.display());
    let mut sink =
        CsvRecordSink::create(&results_path, extended).context("Failed to create CSV writer")?;

    let outcome = analyzer.run_with_sink(&papers, &mut sink).await;
    let rows = sink.finish().context("Failed to close CSV writer")?;
    let report = outcome.with_context(|| {
        format!(
            "Analysis aborted; {} records kept in {}",
            rows,
            results_path.display()
        )
    })?;
    if rows == 0 {
        println!("No records written.");
    }

    for skipped in &report.skipped {
        warn!(title = %skipped.title, reason = %skipped.reason, "Skipped");
    }
    println!("{}", report.summary_line());

    // ===========================================
    // STAGE 3: Summaries
    // ===========================================
    let summary = Summary::from_records(&report.records);
    stats::log_summary(&summary);

    let summary_path = export::timestamped_path(&args.output, "analysis_summary")?;
    if export::export_summary(&summary_path, &summary).context("Failed to write summary")? {
        println!("Saved: {}", summary_path.display());
    }

    if extended {
        let novel_path = export::timestamped_path(&args.output, "high_novelty_papers")?;
        let count = export::export_high_novelty(&novel_path, &report.records, args.min_novelty)
            .context("Failed to write high-novelty papers")?;
        if count > 0 {
            println!("Saved {} high-novelty papers: {}", count, novel_path.display());
        }
    }

    if args.report {
        let run = RunInfo::new(&config, args.model.clone(), extended).with_preset(args.preset.clone());
        let run_report = RunReport {
            run: &run,
            summary: &summary,
            records: &report.records,
            attempted: report.attempted,
            min_novelty: args.min_novelty,
        };
        let (markdown, json) =
            export_report(&args.output, &run_report).context("Failed to write run report")?;
        println!("Saved: {}", markdown.display());
        println!("Saved: {}", json.display());
    }

    let usage = analyzer.gateway().token_usage();
    info!(
        requests = analyzer.gateway().request_count(),
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        "Model usage"
    );
    Ok(())
}

async fn collect_papers(args: &AnalyzeArgs, config: &UserConfig) -> Result<Vec<PaperInput>> {
    match &args.input {
        Some(path) => {
            let papers = file::load_papers(path)
                .with_context(|| format!("Failed to load papers from {}", path.display()))?;
            Ok(sources::narrow(papers, config, args.filter))
        }
        None => {
            let options = openalex::SearchOptions::from_config(config)
                .context("Invalid search settings")?
                .with_mailto(args.mailto.clone());
            openalex::search(&options)
                .await
                .context("OpenAlex search failed")
        }
    }
}

// ============================================================================
// Taxonomy, Presets, Config
// ============================================================================

fn print_taxonomy(config: Option<PathBuf>, preset: Option<String>) -> Result<()> {
    let config = UserConfig::load(&resolve_config_path(config)?).context("Failed to load config")?;
    let base = config.taxonomy().context("Invalid task taxonomy")?;
    let overrides = match preset {
        Some(name) => Some(Taxonomy::from_categories(find_preset(&name)?.custom_categories())?),
        None => None,
    };
    print!("{}", format_taxonomy(&base, overrides.as_ref()));
    Ok(())
}

fn list_presets() {
    for preset in presets::PRESETS {
        println!("{:<24} {}", preset.key, preset.name);
        println!("{:<24} {}", "", preset.description);
        println!("{:<24} keywords: {}", "", preset.keywords.join(", "));
    }
}

fn handle_config(path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    let path = resolve_config_path(path)?;

    match action {
        ConfigAction::Init { force, preset } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            let mut config = UserConfig::default();
            if let Some(name) = preset {
                find_preset(&name)?.apply_to(&mut config);
            }
            config.save(&path).context("Failed to save config")?;
            println!("Config written to {}", path.display());
        }
        ConfigAction::Show => {
            let config = UserConfig::load(&path).context("Failed to load config")?;
            if let Err(e) = config.validate() {
                warn!(error = %e, "Config does not validate");
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("Config file: {}", path.display());
        }
    }

    Ok(())
}

fn resolve_config_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => Ok(default_config_path()?),
    }
}

fn find_preset(name: &str) -> Result<&'static presets::Preset> {
    presets::find(name).with_context(|| {
        let known: Vec<&str> = presets::PRESETS.iter().map(|p| p.key).collect();
        format!("Unknown preset '{}' (known: {})", name, known.join(", "))
    })
}
