use tracing_subscriber::{fmt, EnvFilter};

use crate::{Error, Result};

/// Initialize tracing for one kinotip process.
///
/// Default: info for our crates, warn for everything else. Can be overridden
/// with `RUST_LOG`.
pub fn init(service_name: &str) -> Result<()> {
    let crate_target = service_name.replace('-', "_");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,kinotip_core=info,kinotip_channel=info,kinotip_http=info,kinotip_telegram=info,{crate_target}=info"
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::Config(format!("logging init failed: {e}")))
}
