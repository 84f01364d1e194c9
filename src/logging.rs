use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "JASON_VIEW_LOG";

/// Log to stderr, filtered by `JASON_VIEW_LOG` (default `warn`); `verbose`
/// raises the default to `debug`.
pub fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
