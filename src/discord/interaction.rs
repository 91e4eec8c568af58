use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::channels::{
    ChannelId, GuildId, MessagePayload, Modal, PlatformUser, RoleId,
    CHANNEL_TYPE_ANNOUNCEMENT, CHANNEL_TYPE_TEXT,
};
use crate::channels::message::MESSAGE_FLAG_EPHEMERAL;
use crate::discord::commands::AdminCommand;
use crate::tickets::permissions::Permissions;
use crate::tickets::{ui, Actor, TicketAction, TicketCategory};

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;
pub const INTERACTION_MESSAGE_COMPONENT: u8 = 3;
pub const INTERACTION_MODAL_SUBMIT: u8 = 5;

pub const RESPONSE_PONG: u8 = 1;
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
pub const RESPONSE_DEFERRED_CHANNEL_MESSAGE: u8 = 5;
pub const RESPONSE_DEFERRED_UPDATE_MESSAGE: u8 = 6;
pub const RESPONSE_MODAL: u8 = 9;

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub member: Option<InteractionMember>,
    #[serde(default)]
    pub user: Option<PlatformUser>,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionMember {
    pub user: PlatformUser,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    #[serde(default)]
    pub permissions: Option<Permissions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionData {
    /// Slash command name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
    /// Modal rows as submitted.
    #[serde(default)]
    pub components: Vec<SubmittedRow>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default)]
    pub resolved: Option<ResolvedData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedRow {
    #[serde(default)]
    pub components: Vec<SubmittedField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedField {
    #[serde(default)]
    pub custom_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolvedData {
    #[serde(default)]
    pub channels: HashMap<ChannelId, ResolvedChannel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolvedChannel {
    pub id: ChannelId,
    #[serde(rename = "type")]
    pub channel_type: u8,
    #[serde(default)]
    pub parent_id: Option<ChannelId>,
}

impl ResolvedChannel {
    pub fn is_text_like(&self) -> bool {
        self.channel_type == CHANNEL_TYPE_TEXT || self.channel_type == CHANNEL_TYPE_ANNOUNCEMENT
    }
}

/// Every inbound interaction the bot understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Ping,
    Ticket(TicketAction),
    Command(AdminCommand),
    Unsupported,
}

impl Interaction {
    pub fn classify(&self) -> InboundEvent {
        match self.kind {
            INTERACTION_PING => InboundEvent::Ping,
            INTERACTION_MESSAGE_COMPONENT => self
                .component_action()
                .map(InboundEvent::Ticket)
                .unwrap_or(InboundEvent::Unsupported),
            INTERACTION_MODAL_SUBMIT => self
                .modal_action()
                .map(InboundEvent::Ticket)
                .unwrap_or(InboundEvent::Unsupported),
            INTERACTION_APPLICATION_COMMAND => AdminCommand::parse(self)
                .map(InboundEvent::Command)
                .unwrap_or(InboundEvent::Unsupported),
            _ => InboundEvent::Unsupported,
        }
    }

    fn custom_id(&self) -> Option<&str> {
        self.data.as_ref()?.custom_id.as_deref()
    }

    fn component_action(&self) -> Option<TicketAction> {
        let action = match self.custom_id()? {
            ui::SELECT_CATEGORY_ID => {
                let value = self.data.as_ref()?.values.first()?;
                TicketAction::SelectCategory(TicketCategory::from_value(value)?)
            }
            ui::LOCK_ID => TicketAction::Lock,
            ui::UNLOCK_ID => TicketAction::Unlock,
            ui::CLAIM_ID => TicketAction::Claim,
            ui::DELETE_ID => TicketAction::RequestClose {
                with_transcript: false,
            },
            ui::DELETE_TRANSCRIPT_ID => TicketAction::RequestClose {
                with_transcript: true,
            },
            _ => return None,
        };
        Some(action)
    }

    fn modal_action(&self) -> Option<TicketAction> {
        let with_transcript = match self.custom_id()? {
            ui::CLOSE_MODAL_TRANSCRIPT_ID => true,
            ui::CLOSE_MODAL_PLAIN_ID => false,
            _ => return None,
        };
        let reason = self
            .modal_value(ui::CLOSE_REASON_ID)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        Some(TicketAction::SubmitClose {
            with_transcript,
            reason,
        })
    }

    pub fn modal_value(&self, custom_id: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .components
            .iter()
            .flat_map(|row| row.components.iter())
            .find(|field| field.custom_id == custom_id)
            .and_then(|field| field.value.as_deref())
    }

    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref()?.name.as_deref()
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|o| o.name == name)?
            .value
            .as_ref()?
            .as_str()
    }

    pub fn resolved_channel(&self, channel_id: &str) -> Option<&ResolvedChannel> {
        self.data.as_ref()?.resolved.as_ref()?.channels.get(channel_id)
    }

    /// The guild member behind the interaction. `None` outside a guild.
    pub fn actor(&self) -> Option<Actor> {
        let member = self.member.as_ref()?;
        Some(Actor {
            user_id: member.user.id.clone(),
            name: member.user.tag(),
            role_ids: member.roles.clone(),
            permissions: member.permissions.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Message(MessagePayload),
    Modal(Modal),
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: RESPONSE_PONG,
            data: None,
        }
    }

    pub fn message(message: MessagePayload) -> Self {
        Self {
            kind: RESPONSE_CHANNEL_MESSAGE,
            data: Some(ResponseData::Message(message)),
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::message(MessagePayload::ephemeral(content))
    }

    /// "Thinking..." placeholder only the actor sees; the real reply is
    /// written later through the interaction webhook.
    pub fn deferred_ephemeral() -> Self {
        Self {
            kind: RESPONSE_DEFERRED_CHANNEL_MESSAGE,
            data: Some(ResponseData::Message(
                MessagePayload::default().with_flags(MESSAGE_FLAG_EPHEMERAL),
            )),
        }
    }

    /// Acknowledges a button press; the message it sits on is edited later.
    pub fn deferred_update() -> Self {
        Self {
            kind: RESPONSE_DEFERRED_UPDATE_MESSAGE,
            data: None,
        }
    }

    pub fn modal(modal: Modal) -> Self {
        Self {
            kind: RESPONSE_MODAL,
            data: Some(ResponseData::Modal(modal)),
        }
    }
}
