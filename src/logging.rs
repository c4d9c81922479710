use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::RuntimeEnvironment;

/// Default filter when `RUST_LOG` is unset.
pub fn default_filter(environment: RuntimeEnvironment) -> &'static str {
    match environment {
        RuntimeEnvironment::Production => "info",
        RuntimeEnvironment::Development | RuntimeEnvironment::Testing => "debug",
    }
}

/// Install the global subscriber: JSON lines in production, readable text
/// elsewhere. Logs go to stderr so command output stays clean.
///
/// Calling it twice is harmless; the second install is ignored.
pub fn init(environment: RuntimeEnvironment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(environment)));

    let installed = match environment {
        RuntimeEnvironment::Production => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
