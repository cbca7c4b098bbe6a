pub mod adherence;
pub mod config;
pub mod db;
pub mod display;
pub mod models;
pub mod schedule;
pub mod session;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries embedding this library. Honors RUST_LOG,
/// falling back to the crate-scoped default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} v{} logging initialized", config::APP_NAME, config::APP_VERSION);
}
