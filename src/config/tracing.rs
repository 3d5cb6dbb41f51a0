use tracing_forest::ForestLayer;
use tracing_subscriber::{prelude::*, EnvFilter};

/// `RUST_LOG` wins over the configured level.
pub fn init(default_directive: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_directive))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(ForestLayer::default())
        .try_init()?;
    Ok(())
}
