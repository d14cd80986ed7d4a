//! Subscriber setup for the binary. The library only emits `tracing` events.

use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset: warn, then debug, then trace.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "pagegrab=warn",
        1 => "pagegrab=debug",
        _ => "pagegrab=trace",
    }
}

/// Install a stderr fmt subscriber. A second call is a no-op.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(default_directive(0), "pagegrab=warn");
        assert_eq!(default_directive(1), "pagegrab=debug");
        assert_eq!(default_directive(5), "pagegrab=trace");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(0);
        init(2);
    }
}
