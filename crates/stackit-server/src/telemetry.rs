//! Log subscriber setup.

use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the filter. Setting `STACKIT_LOG_JSON` to `1` or
/// `true` switches to one JSON object per line for container log shippers.
pub fn init_logging() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| anyhow!("invalid log filter: {}", e))?;

    let json = std::env::var("STACKIT_LOG_JSON")
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE"))
        .unwrap_or(false);

    if json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| anyhow!("failed to install subscriber: {}", e))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| anyhow!("failed to install subscriber: {}", e))?;
    }
    Ok(())
}
