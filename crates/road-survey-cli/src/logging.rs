/*!
Logging (and optional profiling) setup for the command-line driver.

Without the `profiling` feature only a `fmt` layer filtered by `RUST_LOG` is
installed. With it, a `tracing-chrome` layer additionally records a trace file
that can be opened in Perfetto; the returned guard flushes it on drop.
*/

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Keeps the profiling trace file open until dropped
pub struct LoggingGuard {
    #[cfg(feature = "profiling")]
    _chrome: tracing_chrome::FlushGuard,
}

fn env_filter() -> EnvFilter {
    // Logs go to stderr, so the default leaves stdout to the results
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("info,road_survey_lib=debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

#[cfg(not(feature = "profiling"))]
pub fn setup_logging() -> LoggingGuard {
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_filter(env_filter());
    tracing_subscriber::registry().with(fmt_layer).init();
    LoggingGuard {}
}

#[cfg(feature = "profiling")]
pub fn setup_logging() -> LoggingGuard {
    use tracing_chrome::ChromeLayerBuilder;

    let trace_file = std::env::temp_dir().join(format!(
        "road-survey-trace-{}.json",
        std::process::id()
    ));
    let (chrome_layer, guard) = ChromeLayerBuilder::new()
        .file(trace_file.clone())
        .include_args(true)
        .build();
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_filter(env_filter());
    tracing_subscriber::registry()
        .with(chrome_layer)
        .with(fmt_layer)
        .init();

    tracing::info!(path = %trace_file.display(), "Recording profiling trace");
    LoggingGuard { _chrome: guard }
}
