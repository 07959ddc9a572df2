use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "smart_finance=info".parse() {
            filter = filter.add_directive(directive);
        }

        // Another subscriber may already be installed by the embedding process.
        let _ = fmt().with_env_filter(filter).try_init();
    });
}

/// Normalizes an optional secret, treating blanks and JS-style placeholders
/// (`undefined`, `null`) as absent.
pub fn present_secret(value: Option<String>) -> Option<String> {
    let trimmed = value?.trim().to_string();
    match trimmed.as_str() {
        "" | "undefined" | "null" => None,
        _ => Some(trimmed),
    }
}
