pub mod ai;
pub mod batch;
pub mod config;
pub mod detect;
pub mod extract;
mod fsops;
pub mod index;
pub mod models;
pub mod quarantine;
pub mod review;
pub mod routing;
pub mod stats;

pub use config::{ClassifierConfig, RouterConfig};
pub use models::{Category, ClassificationResult};
pub use routing::{RouteOutcome, Router};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Load `.env` from the working directory, falling back to its parent.
pub fn load_env() {
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path("../.env");
    }
}

/// Initialize tracing: stderr plus a daily audit file in `log_dir`.
///
/// Filter comes from RUST_LOG; default is warn for dependencies and info for
/// this crate. Keep the returned guard alive until exit so buffered lines are
/// flushed.
pub fn init_tracing(log_dir: &Path) -> Result<WorkerGuard, InitError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("docrouter")
        .filename_suffix("log")
        .build(log_dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,docrouter=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    Ok(guard)
}
