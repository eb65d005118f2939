use tracing_subscriber::{fmt, EnvFilter};

/// Per-room tracing lives in the workspace crates, so the default filter
/// opens those targets up while keeping dependencies quiet. `RUST_LOG`
/// overrides the whole directive when set.
const DEBUG_FILTER: &str = "info,yaniv=debug,server=debug,game=debug,bot=debug";
const RELEASE_FILTER: &str = "warn,yaniv=info,server=info,game=info";

pub(crate) fn init() -> anyhow::Result<()> {
    let default = if cfg!(debug_assertions) {
        DEBUG_FILTER
    } else {
        RELEASE_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .compact()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}
