//! Tracing subscriber setup shared by the FBR binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `level` applies to the FBR crates.
/// Calling this twice is a no-op.
pub fn init_tracing(level: &str) {
    let default_filter = format!(
        "fbr_common={level},fbr_router={level},fbr_gen={level}",
        level = level
    );

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
