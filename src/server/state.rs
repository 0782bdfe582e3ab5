//! # Application State
//!
//! Shared state handed to every handler: the configuration and the single
//! Completion Gateway (which owns the process-wide HTTP client). Relay state
//! machines are per-request and never live here.

use crate::{config::Config, gateway::CompletionGateway};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: CompletionGateway,
}

impl AppState {
    /// Create application state from configuration.
    pub fn new(config: Config) -> Self {
        let gateway = CompletionGateway::from_config(&config)
            .unwrap_or_else(|_| CompletionGateway::new(config.clone(), reqwest::Client::new()));
        Self { config, gateway }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gateway(&self) -> &CompletionGateway {
        &self.gateway
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new(Config::for_test());
        assert!(!state.config().base_url.is_empty());
        assert!(state.gateway().config().streaming_enabled);
    }
}
