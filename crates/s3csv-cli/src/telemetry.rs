use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the stderr log subscriber for `s3csv-ctl`.
///
/// `RUST_LOG` takes precedence over `log_level` when set. Rows go to
/// stdout, so logs never interleave with them.
pub fn init(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(log_level)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}

fn parse_filter(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(log_level).map_err(|e| anyhow!("invalid log level '{}': {}", log_level, e))
}
