//! Tracing bootstrap for the binary and for ad-hoc test runs.

use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber filtered by `level`.
///
/// `level` accepts any `EnvFilter` directive (`info`, `study_buddy=debug`, ...);
/// invalid directives fall back to `info`. Calling this more than once is a
/// no-op, so tests and the binary can both call it.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing("debug");
        init_tracing("not a valid directive [");
    }
}
