use std::sync::Arc;

use crate::channels::ChatPlatform;
use crate::config::{AppConfig, SettingsStore};
use crate::discord::signature::{SignatureError, SignatureVerifier};
use crate::tickets::TicketController;

/// Shared by every request handler.
pub struct AppState {
    pub config: AppConfig,
    pub settings: Arc<SettingsStore>,
    pub controller: Arc<TicketController>,
    pub platform: Arc<dyn ChatPlatform>,
    pub verifier: SignatureVerifier,
}

impl AppState {
    pub fn new(config: AppConfig, platform: Arc<dyn ChatPlatform>) -> Result<Self, SignatureError> {
        let verifier = SignatureVerifier::from_hex(&config.discord.public_key)?;
        let settings = Arc::new(SettingsStore::new(config.tickets.clone()));
        let controller = Arc::new(TicketController::new(Arc::clone(&platform)));

        Ok(Self {
            config,
            settings,
            controller,
            platform,
            verifier,
        })
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            settings: Arc::clone(&self.settings),
            controller: Arc::clone(&self.controller),
            platform: Arc::clone(&self.platform),
            verifier: self.verifier.clone(),
        }
    }
}
