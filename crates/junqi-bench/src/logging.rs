use std::fs::{self, File};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LoggingConfig, ResolvedOutputs};

/// Dropping the guard flushes the telemetry file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Routes belief and game events as JSON lines into `outputs.telemetry`.
///
/// `RUST_LOG` wins over the configured level when it is set.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
) -> Result<Option<LoggingGuard>> {
    if !logging.structured {
        return Ok(None);
    }

    fs::create_dir_all(&outputs.dir)
        .with_context(|| format!("creating output directory {}", outputs.dir.display()))?;
    let file = File::create(&outputs.telemetry)
        .with_context(|| format!("creating telemetry file {}", outputs.telemetry.display()))?;
    let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(file);

    let level = logging.level.as_str();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("junqi_core={level},junqi_bench={level}")));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_writer(writer)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("WARN: tracing subscriber already installed; telemetry file stays empty");
    }

    Ok(Some(LoggingGuard { _guard: guard }))
}
