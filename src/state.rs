// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::provider::{ProviderClient, UnconfiguredProvider};
use crate::auth::LogtoClient;
use crate::config::Config;
use crate::session::SessionCodec;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub codec: SessionCodec,
    pub provider: Arc<dyn ProviderClient>,
}

impl AppState {
    /// Build state from configuration, constructing the provider client
    /// from the provider settings (or the unconfigured placeholder).
    pub fn new(config: Config) -> Self {
        let codec = SessionCodec::new(&config.session_secret);
        let provider: Arc<dyn ProviderClient> = match &config.provider {
            Some(settings) => Arc::new(LogtoClient::new(
                settings.endpoint.clone(),
                settings.app_id.clone(),
                settings.app_secret.clone(),
                config.callback_url(),
            )),
            None => Arc::new(UnconfiguredProvider),
        };

        Self {
            config: Arc::new(config),
            codec,
            provider,
        }
    }

    /// Replace the provider client (tests substitute a scripted one).
    pub fn with_provider(mut self, provider: Arc<dyn ProviderClient>) -> Self {
        self.provider = provider;
        self
    }
}
