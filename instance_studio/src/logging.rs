use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Picks the filter directives: the explicit one when given, then `RUST_LOG`, then `info`.
pub fn resolve_filter(explicit: Option<&str>) -> Result<EnvFilter> {
    if let Some(directives) = explicit {
        return EnvFilter::try_new(directives).map_err(|err| anyhow!("Invalid log filter '{directives}': {err}"));
    }
    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
}

pub fn init(explicit: Option<&str>) -> Result<()> {
    let filter = resolve_filter(explicit)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("Failed to install log subscriber: {err}"))
}
