use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "COURSEGATE_LOG";

/// Install the stderr subscriber. `COURSEGATE_LOG` wins over the config filter.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
