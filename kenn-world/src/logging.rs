//! Tracing subscriber setup for hosts and tools.

use tracing_subscriber::EnvFilter;

use kenn_core::config::GeneralConfig;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured `log_level` applies.
/// Calling this twice is harmless: the second install is ignored.
pub fn init(general: &GeneralConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&general.log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Like [`init`], but emitting one JSON object per line.
pub fn init_json(general: &GeneralConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&general.log_level));
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_ignored() {
        let general = GeneralConfig::default();
        init(&general);
        init(&general);
        init_json(&general);
        tracing::info!("subscriber installed");
    }
}
