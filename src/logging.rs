use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn";

/// Install the stderr fmt subscriber. `filter` uses `EnvFilter` syntax
/// (`info`, `todo_bot=debug`, ...); an unparsable filter falls back to the
/// default. Safe to call more than once.
pub fn init(filter: Option<&str>) {
    let filter = filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
