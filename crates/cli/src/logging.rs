use multibeacon_core::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATES: [&str; 2] = ["multibeacon_core", "multibeacon"];

/// Builds the filter directive enabling `level` for this workspace's crates and `warn`
/// for everything else.
fn crate_filter(level: &str) -> String {
    let mut directive = String::from("warn");
    for name in CRATES {
        directive.push_str(&format!(",{name}={level}"));
    }
    directive
}

/// Installs the global subscriber. Logs go to stderr so command output stays parseable.
///
/// `RUST_LOG=debug` or `RUST_LOG=trace` raise this workspace's crates only; any other
/// `RUST_LOG` value is used as a full filter.
pub fn init_logging(config: &LoggingConfig) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(level) if level == "debug" || level == "trace" => EnvFilter::new(crate_filter(&level)),
        Ok(_) => EnvFilter::try_from_env("RUST_LOG")
            .unwrap_or_else(|_| EnvFilter::new(crate_filter(&config.level))),
        Err(_) => EnvFilter::new(crate_filter(&config.level)),
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    } else {
        // "pretty" and any other format default to pretty logging
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    }
}
