use std::sync::Arc;
use tokio::sync::RwLock;

use crate::channels::{ChannelId, RoleId};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub discord: DiscordConfig,
    pub tickets: TicketSettings,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub application_id: String,
    pub public_key: String,
    pub api_url: String,
    pub guild_id: Option<String>,
    pub register_commands: bool,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("application_id", &self.application_id)
            .field("public_key", &self.public_key)
            .field("api_url", &self.api_url)
            .field("guild_id", &self.guild_id)
            .field("register_commands", &self.register_commands)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Admin-controlled ticket settings. Transitions only ever see a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketSettings {
    pub staff_role_id: Option<RoleId>,
    pub transcripts_channel_id: Option<ChannelId>,
    pub panel_banner_url: Option<String>,
    pub ticket_category_id: Option<ChannelId>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server = ServerConfig {
            host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed("PORT", 3000u16)?,
        };

        let discord = DiscordConfig {
            token: required("DISCORD_TOKEN")?,
            application_id: required("DISCORD_APPLICATION_ID")?,
            public_key: required("DISCORD_PUBLIC_KEY")?,
            api_url: optional("DISCORD_API_URL")
                .unwrap_or_else(|| "https://discord.com/api/v10".to_string()),
            guild_id: optional("DISCORD_GUILD_ID"),
            register_commands: parsed("DISCORD_REGISTER_COMMANDS", false)?,
            timeout_secs: parsed("HTTP_TIMEOUT_SECS", 15u64)?,
        };

        let tickets = TicketSettings {
            staff_role_id: optional("TICKET_STAFF_ROLE_ID"),
            transcripts_channel_id: optional("TICKET_TRANSCRIPTS_CHANNEL_ID"),
            panel_banner_url: optional("TICKET_PANEL_BANNER_URL"),
            ticket_category_id: optional("TICKET_CATEGORY_ID"),
        };

        Ok(Self {
            server,
            discord,
            tickets,
        })
    }
}

/// Owner of the single mutable [`TicketSettings`] instance.
///
/// Readers get an `Arc` snapshot that never changes under them; updates swap
/// in a new snapshot.
#[derive(Debug, Default)]
pub struct SettingsStore {
    current: RwLock<Arc<TicketSettings>>,
}

impl SettingsStore {
    pub fn new(initial: TicketSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub async fn snapshot(&self) -> Arc<TicketSettings> {
        self.current.read().await.clone()
    }

    pub async fn update(&self, apply: impl FnOnce(&mut TicketSettings)) -> Arc<TicketSettings> {
        let mut current = self.current.write().await;
        let mut next = TicketSettings::clone(&current);
        apply(&mut next);
        *current = Arc::new(next);
        current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshots_are_isolated_from_updates() {
        let store = SettingsStore::new(TicketSettings::default());
        let before = store.snapshot().await;

        let after = store
            .update(|s| s.staff_role_id = Some("staff".to_string()))
            .await;

        assert_eq!(before.staff_role_id, None);
        assert_eq!(after.staff_role_id.as_deref(), Some("staff"));
        assert_eq!(store.snapshot().await.staff_role_id.as_deref(), Some("staff"));
    }

    #[test]
    fn test_discord_config_debug_redacts_token() {
        let config = DiscordConfig {
            token: "secret-token".to_string(),
            application_id: "1".to_string(),
            public_key: "ab".to_string(),
            api_url: "https://discord.com/api/v10".to_string(),
            guild_id: None,
            register_commands: false,
            timeout_secs: 15,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
