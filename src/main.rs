//! docrouter command line
//!
//! Operator entry points for the document routing pipeline: prepare the
//! folder layout, process the input folder, route a single file, work the
//! exception review queue and show processing stats.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use docrouter::ai::OpenAiClassifier;
use docrouter::extract::DocumentExtractor;
use docrouter::review::{self, ManualReview, ReviewCursor, ReviewQueue};
use docrouter::routing::Dispatcher;
use docrouter::{batch, stats, Category, ClassifierConfig, Router, RouterConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "docrouter")]
#[command(about = "Classify scanned documents and route them into category folders")]
struct Cli {
    #[command(flatten)]
    folders: FolderArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the folder layout (env and defaults apply otherwise)
#[derive(Args)]
struct FolderArgs {
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    exception_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Per-document classifier budget in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the input, exception and output folders
    Init,

    /// Route every file waiting in the input folder
    Process,

    /// Route a single file
    Route { file: PathBuf },

    /// Work the exception review queue
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },

    /// Show routed and exception counts
    Stats,
}

#[derive(Subcommand)]
enum ReviewAction {
    /// Show the document at a queue position
    Show {
        #[arg(long, default_value_t = 0)]
        position: usize,
    },

    /// Print the position of the next document (wraps around)
    Skip {
        #[arg(long, default_value_t = 0)]
        position: usize,
    },

    /// Route the document at a position with a manual classification
    Approve {
        #[arg(long, default_value_t = 0)]
        position: usize,

        /// Memberdoc, Loans or Statements
        #[arg(long)]
        category: Category,

        #[arg(long, default_value = "")]
        member_name: String,

        #[arg(long, default_value = "")]
        member_number: String,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        loan_type: Option<String>,
    },
}

impl FolderArgs {
    fn apply(self, config: &mut RouterConfig) {
        if let Some(dir) = self.input_dir {
            config.input_dir = dir;
        }
        if let Some(dir) = self.exception_dir {
            config.exception_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_root = dir;
        }
        if let Some(dir) = self.log_dir {
            config.log_dir = dir;
        }
        if let Some(secs) = self.timeout_secs {
            config.classifier_timeout = Duration::from_secs(secs);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    docrouter::load_env();
    let cli = Cli::parse();

    let mut config = RouterConfig::from_env().context("Invalid configuration")?;
    cli.folders.apply(&mut config);

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log dir {}", config.log_dir.display()))?;
    let _guard = docrouter::init_tracing(&config.log_dir).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Init => {
            config.ensure_dirs()?;
            for category in Category::ALL {
                std::fs::create_dir_all(config.category_dir(category))?;
            }
            println!("Input:      {}", config.input_dir.display());
            println!("Exceptions: {}", config.exception_dir.display());
            println!("Output:     {}", config.output_root.display());
            println!("Logs:       {}", config.log_dir.display());
        }
        Commands::Process => {
            config.ensure_dirs()?;
            let router = build_router(config.clone())?;
            let summary = batch::run(&router, &config.input_dir, |progress| {
                println!(
                    "[{}/{}] {}: {}",
                    progress.index, progress.total, progress.filename, progress.outcome.message
                );
            })
            .await?;

            if summary.total == 0 {
                println!("No files found in {}", config.input_dir.display());
            } else {
                println!(
                    "Processed {} files ({} routed, {} exceptions) in {:.2}s, {:.2}s per file",
                    summary.total,
                    summary.routed,
                    summary.exceptioned,
                    summary.elapsed.as_secs_f64(),
                    summary.average_per_file().as_secs_f64()
                );
            }
        }
        Commands::Route { file } => {
            config.ensure_dirs()?;
            let filename = file_name(&file)?;
            let router = build_router(config)?;
            let outcome = router.route(&file, &filename).await;
            println!("{}: {}", outcome.filename, outcome.message);
            if let Some(location) = &outcome.location {
                println!("  -> {}", location.display());
            }
        }
        Commands::Review { action } => run_review(&config, action)?,
        Commands::Stats => {
            let stats = stats::collect(&config)?;
            for (category, count) in &stats.per_category {
                println!("{:<12}{}", category, count);
            }
            println!("{:<12}{}", "Total", stats.total_routed);
            println!("{:<12}{}", "Exceptions", stats.exception_count);
        }
    }

    Ok(())
}

fn build_router(config: RouterConfig) -> Result<Router> {
    let classifier_config = ClassifierConfig::from_env()?;
    let classifier = OpenAiClassifier::new(classifier_config)?;
    Ok(Router::new(
        config,
        Arc::new(DocumentExtractor::new()),
        Arc::new(classifier),
    ))
}

fn run_review(config: &RouterConfig, action: ReviewAction) -> Result<()> {
    let queue = ReviewQueue::load(&config.exception_dir)?;

    match action {
        ReviewAction::Show { position } => match queue.current(ReviewCursor::at(position)) {
            Some(item) => {
                println!("File {}: {}", item.position_label(), item.filename);
                println!("  type: {}", item.mime);
                println!("  path: {}", item.path.display());
            }
            None => println!("No exception files to review."),
        },
        ReviewAction::Skip { position } => {
            let next = queue.skip(ReviewCursor::at(position));
            match queue.current(next) {
                Some(item) => println!("{} ({})", next.position, item.filename),
                None => println!("No exception files to review."),
            }
        }
        ReviewAction::Approve {
            position,
            category,
            member_name,
            member_number,
            date,
            loan_type,
        } => {
            if queue.is_empty() {
                bail!("No exception files to review.");
            }
            let dispatcher = Dispatcher::new(config.clone());
            let manual = ManualReview {
                category,
                member_name,
                member_number,
                document_date: date,
                loan_type,
            };
            let step = review::approve(&dispatcher, &queue, ReviewCursor::at(position), manual)?;

            if let Some(location) = &step.record.final_location {
                println!("Routed to {}", location.display());
            }
            match step.queue.current(step.cursor) {
                Some(item) => println!("Next: {} ({})", item.position_label(), item.filename),
                None => println!("Review queue is empty."),
            }
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> Result<String> {
    match path.file_name() {
        Some(name) => Ok(name.to_string_lossy().to_string()),
        None => bail!("Not a file path: {}", path.display()),
    }
}
