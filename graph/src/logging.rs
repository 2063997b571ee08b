//! Logging setup shared by the model builder binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse a `--log-level` value, falling back to INFO
pub fn parse_level(log_level: &str) -> tracing::Level {
    match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            eprintln!("Invalid log level: {}. Using 'info'", log_level);
            tracing::Level::INFO
        }
    }
}

/// Filter used when `RUST_LOG` is unset: every target plus this crate
pub fn default_directives(targets: &[&str], level: tracing::Level) -> String {
    targets
        .iter()
        .copied()
        .chain(std::iter::once("zkml_graph"))
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize logging
///
/// `RUST_LOG` wins when set; otherwise `targets` (the binary and the
/// library crates it drives) log at `log_level`.
pub fn init_logging(targets: &[&str], log_level: &str) {
    let level = parse_level(log_level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(targets, level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), tracing::Level::DEBUG);
        assert_eq!(parse_level("warn"), tracing::Level::WARN);
        assert_eq!(parse_level("loud"), tracing::Level::INFO);
    }

    #[test]
    fn test_default_directives() {
        let directives =
            default_directives(&["zkml_sentiment", "build_sentiment_model"], tracing::Level::DEBUG);
        assert_eq!(
            directives,
            "zkml_sentiment=DEBUG,build_sentiment_model=DEBUG,zkml_graph=DEBUG"
        );

        let filter = tracing_subscriber::EnvFilter::try_new(&directives);
        assert!(filter.is_ok());
    }
}
