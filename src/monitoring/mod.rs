use anyhow::Result;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging setup for the bot
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub log_level: String,
    pub enable_json_logs: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_json_logs: false,
        }
    }
}

impl TracingConfig {
    pub fn new(verbose: bool, enable_json_logs: bool) -> Self {
        Self {
            log_level: if verbose { "debug" } else { "info" }.to_string(),
            enable_json_logs,
        }
    }

    /// `RUST_LOG` wins over the configured level
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Install the global subscriber
    pub fn init_tracing(&self) -> Result<()> {
        let env_filter = self.env_filter();

        if self.enable_json_logs {
            let json_layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true);

            Registry::default()
                .with(env_filter)
                .with(json_layer)
                .try_init()?;
        } else {
            let simple_layer = fmt::layer().with_target(false).compact();

            Registry::default()
                .with(env_filter)
                .with(simple_layer)
                .try_init()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(TracingConfig::new(true, false).log_level, "debug");
        assert_eq!(TracingConfig::new(false, true).log_level, "info");
        assert!(TracingConfig::new(false, true).enable_json_logs);
    }
}
