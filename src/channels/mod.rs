use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tickets::permissions::PermissionOverwrite;

pub mod discord;
pub mod message;

pub use discord::DiscordProvider;
pub use message::{
    ActionRow, Button, ButtonStyle, Component, Embed, EmbedAuthor, EmbedField, EmbedFooter,
    EmbedImage, MessagePayload, Modal, SelectMenu, SelectOption, TextInput,
};

pub type ChannelId = String;
pub type GuildId = String;
pub type MessageId = String;
pub type RoleId = String;
pub type UserId = String;

pub const CHANNEL_TYPE_TEXT: u8 = 0;
pub const CHANNEL_TYPE_CATEGORY: u8 = 4;
pub const CHANNEL_TYPE_ANNOUNCEMENT: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildChannel {
    pub id: ChannelId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: u8,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub parent_id: Option<ChannelId>,
    #[serde(default)]
    pub topic: Option<String>,
}

impl GuildChannel {
    pub fn is_category(&self) -> bool {
        self.channel_type == CHANNEL_TYPE_CATEGORY
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildInfo {
    pub id: GuildId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl GuildInfo {
    pub fn icon_url(&self) -> Option<String> {
        self.icon.as_ref().map(|hash| {
            format!(
                "https://cdn.discordapp.com/icons/{}/{}.png?size=128",
                self.id, hash
            )
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformUser {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl PlatformUser {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            global_name: None,
            discriminator: None,
            bot: false,
        }
    }

    /// `username#1234` for legacy accounts, plain `username` otherwise.
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(disc) if !disc.is_empty() && disc != "0" => format!("{}#{}", self.username, disc),
            _ => self.username.clone(),
        }
    }

    pub fn display_name(&self) -> &str {
        match self.global_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageAttachment {
    pub id: String,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub id: MessageId,
    #[serde(default)]
    pub channel_id: ChannelId,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub author: PlatformUser,
    #[serde(default)]
    pub attachments: Vec<MessageAttachment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateChannel {
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ChannelId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permission_overwrites: Vec<PermissionOverwrite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl CreateChannel {
    pub fn category(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel_type: CHANNEL_TYPE_CATEGORY,
            parent_id: None,
            permission_overwrites: Vec::new(),
            topic: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel_type: CHANNEL_TYPE_TEXT,
            parent_id: None,
            permission_overwrites: Vec::new(),
            topic: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_overwrites(mut self, overwrites: Vec<PermissionOverwrite>) -> Self {
        self.permission_overwrites = overwrites;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn html(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "text/html; charset=utf-8".to_string(),
            bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ChannelError {
    AuthenticationFailed(String),
    RateLimited { retry_after: Option<f64> },
    ContentTooLong { max_length: usize, actual_length: usize },
    NetworkError(String),
    ApiError { code: Option<String>, message: String },
    NotFound(String),
    InvalidResponse(String),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed(msg) => write!(f, "Authentication failed: {msg}"),
            Self::RateLimited { retry_after } => {
                if let Some(secs) = retry_after {
                    write!(f, "Rate limited, retry after {secs} seconds")
                } else {
                    write!(f, "Rate limited")
                }
            }
            Self::ContentTooLong { max_length, actual_length } => {
                write!(f, "Content too long: {actual_length} characters (max: {max_length})")
            }
            Self::NetworkError(msg) => write!(f, "Network error: {msg}"),
            Self::ApiError { code, message } => {
                if let Some(c) = code {
                    write!(f, "API error [{c}]: {message}")
                } else {
                    write!(f, "API error: {message}")
                }
            }
            Self::NotFound(what) => write!(f, "Not found: {what}"),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {msg}"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Everything the ticket core needs from the chat platform.
///
/// History pages come back newest first, the way Discord returns them.
#[async_trait::async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn guild(&self, guild_id: &str) -> Result<GuildInfo, ChannelError>;
    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<GuildChannel>, ChannelError>;
    async fn create_channel(
        &self,
        guild_id: &str,
        request: &CreateChannel,
    ) -> Result<GuildChannel, ChannelError>;
    async fn edit_overwrite(
        &self,
        channel_id: &str,
        overwrite: &PermissionOverwrite,
    ) -> Result<(), ChannelError>;
    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<(), ChannelError>;
    async fn delete_channel(&self, channel_id: &str) -> Result<(), ChannelError>;
    async fn send_message(
        &self,
        channel_id: &str,
        message: &MessagePayload,
    ) -> Result<ChannelMessage, ChannelError>;
    async fn send_file(
        &self,
        channel_id: &str,
        message: &MessagePayload,
        file: &FileUpload,
    ) -> Result<ChannelMessage, ChannelError>;
    async fn fetch_user(&self, user_id: &str) -> Result<PlatformUser, ChannelError>;
    async fn send_direct_message(
        &self,
        user_id: &str,
        message: &MessagePayload,
    ) -> Result<ChannelMessage, ChannelError>;
    async fn fetch_messages(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: u8,
    ) -> Result<Vec<ChannelMessage>, ChannelError>;
    async fn register_commands(
        &self,
        guild_id: Option<&str>,
        commands: &[serde_json::Value],
    ) -> Result<(), ChannelError>;
    /// Replaces the deferred response of an interaction.
    async fn edit_interaction_response(
        &self,
        interaction_token: &str,
        message: &MessagePayload,
    ) -> Result<(), ChannelError>;
    async fn send_interaction_followup(
        &self,
        interaction_token: &str,
        message: &MessagePayload,
    ) -> Result<(), ChannelError>;
}
