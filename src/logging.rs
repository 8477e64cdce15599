use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Map a `LOG_LEVEL` value onto a tracing level. Unknown names fall back to INFO.
pub(crate) fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" | "CRITICAL" => Level::ERROR,
        _ => Level::INFO,
    }
}

pub(crate) fn init(level: &str) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(false)
        .finish();
    // A second init (e.g. serve restarting the worker) keeps the first subscriber.
    tracing::subscriber::set_global_default(subscriber).ok();
}
