use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber. `RUST_LOG` wins when set; otherwise
/// debug mode lowers the default level.
pub fn init(debug: bool) {
    let default = if debug { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
