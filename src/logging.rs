//! Tracing setup shared by the command-line tools

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber
///
/// `RUST_LOG` takes precedence; otherwise `DEBUG=true|1` selects debug
/// output and everything else info. Logs go to stderr so stdout only
/// carries program output.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_enabled(std::env::var("DEBUG").ok().as_deref()) {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

fn debug_enabled(value: Option<&str>) -> bool {
    value
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_enabled() {
        assert!(debug_enabled(Some("true")));
        assert!(debug_enabled(Some("1")));
        assert!(debug_enabled(Some("YES")));
        assert!(!debug_enabled(Some("false")));
        assert!(!debug_enabled(Some("")));
        assert!(!debug_enabled(None));
    }
}
