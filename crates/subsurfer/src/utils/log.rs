use crate::Result;
use std::io;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so that stdout only carries results. `RUST_LOG`
/// overrides `default_level`.
pub fn init_tracing_subscriber(
    default_level: &str,
    log_file: Option<(&Path, &str)>,
) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // base for the subscriber
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);

    match log_file {
        Some((output_dir, filename)) => {
            let filename = format!("{}.log", filename);
            let file_appender = RollingFileAppender::new(Rotation::NEVER, output_dir, filename);
            let subscriber = subscriber
                .with_ansi(false)
                .with_file(false)
                .with_target(false)
                .with_writer(file_appender)
                .finish();

            // terminal output as an additional layer
            let stderr_layer = layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_ansi(true)
                .with_file(false)
                .with_target(false)
                .with_writer(io::stderr);

            tracing::subscriber::set_global_default(subscriber.with(stderr_layer))?;
        }
        None => {
            let subscriber = subscriber
                .with_ansi(true)
                .with_file(false)
                .with_target(false)
                .with_writer(io::stderr)
                .finish();

            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}
