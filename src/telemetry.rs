use once_cell::sync::OnceCell;

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global tracing subscriber: fmt layer to stderr, filtered by
/// RUST_LOG (default "warn"). Safe to call more than once; later calls are
/// no-ops, as is losing the race against an already-installed subscriber.
pub fn telemetry_init() {
    if INIT.get().is_some() {
        return;
    }

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = tracing_subscriber::EnvFilter::new(filter);

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        return;
    }

    let _ = INIT.set(());
}
