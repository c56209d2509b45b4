use std::sync::Once;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Cache decisions at info, HTTP plumbing only when it misbehaves.
const DEFAULT_FILTER: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,axum=warn";

static INIT_TRACING: Once = Once::new();

/// Install the global fmt subscriber for the video cache.
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]. Later calls, or an embedding app that
/// already installed its own subscriber, leave the existing one in place.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .is_ok();

        if installed {
            info!("video cache logging ready");
        }
    });
}
