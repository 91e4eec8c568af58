//! Slash commands for posting the panel and changing ticket settings.

use log::{error, info};
use serde_json::json;

use crate::channels::RoleId;
use crate::discord::interaction::{Interaction, InteractionResponse, ResolvedChannel};
use crate::shared::state::AppState;
use crate::tickets::permissions::Permissions;
use crate::tickets::ui;

const OPTION_CHANNEL: u8 = 7;
const OPTION_ROLE: u8 = 8;
const OPTION_STRING: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    PostPanel,
    SetTicketCategory { channel: Option<ResolvedChannel> },
    SetStaff { role_id: Option<RoleId> },
    SetTranscripts { channel: Option<ResolvedChannel> },
    SetBanner { url: Option<String> },
}

impl AdminCommand {
    pub fn parse(interaction: &Interaction) -> Option<Self> {
        let channel_option = || {
            interaction
                .option_str("channel")
                .and_then(|id| interaction.resolved_channel(id))
                .cloned()
        };

        let command = match interaction.command_name()? {
            "ticket" => Self::PostPanel,
            "ticketcategory" => Self::SetTicketCategory {
                channel: channel_option(),
            },
            "setstaff" => Self::SetStaff {
                role_id: interaction.option_str("role").map(str::to_string),
            },
            "settranscripts" => Self::SetTranscripts {
                channel: channel_option(),
            },
            "setbanner" => Self::SetBanner {
                url: interaction.option_str("url").map(str::to_string),
            },
            _ => return None,
        };
        Some(command)
    }

    pub fn requires_admin(&self) -> bool {
        !matches!(self, Self::PostPanel)
    }
}

/// Command definitions for bulk registration.
pub fn definitions() -> Vec<serde_json::Value> {
    let admin = Permissions::ADMINISTRATOR.bits().to_string();
    vec![
        json!({
            "name": "ticket",
            "description": "Post the ticket panel in this channel",
            "dm_permission": false
        }),
        json!({
            "name": "ticketcategory",
            "description": "Use the parent category of a channel for new tickets",
            "default_member_permissions": admin,
            "dm_permission": false,
            "options": [{
                "type": OPTION_CHANNEL,
                "name": "channel",
                "description": "A channel inside the category to use",
                "required": true
            }]
        }),
        json!({
            "name": "setstaff",
            "description": "Set the role allowed to manage tickets",
            "default_member_permissions": admin,
            "dm_permission": false,
            "options": [{
                "type": OPTION_ROLE,
                "name": "role",
                "description": "Staff role",
                "required": true
            }]
        }),
        json!({
            "name": "settranscripts",
            "description": "Set the channel transcripts are uploaded to",
            "default_member_permissions": admin,
            "dm_permission": false,
            "options": [{
                "type": OPTION_CHANNEL,
                "name": "channel",
                "description": "Transcripts channel",
                "required": true,
                "channel_types": [0, 5]
            }]
        }),
        json!({
            "name": "setbanner",
            "description": "Set the banner image shown on the ticket panel",
            "default_member_permissions": admin,
            "dm_permission": false,
            "options": [{
                "type": OPTION_STRING,
                "name": "url",
                "description": "Image URL (http/https)",
                "required": true
            }]
        }),
    ]
}

fn is_http_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub async fn handle(
    state: &AppState,
    interaction: &Interaction,
    command: AdminCommand,
) -> InteractionResponse {
    let Some(actor) = interaction.actor() else {
        return InteractionResponse::ephemeral("Ticket commands can only be used inside a server.");
    };

    if command.requires_admin() && !actor.is_admin() {
        return InteractionResponse::ephemeral("Only administrators can change ticket settings.");
    }

    match command {
        AdminCommand::PostPanel => post_panel(state, interaction).await,
        AdminCommand::SetTicketCategory { channel } => {
            let Some(channel) = channel else {
                return InteractionResponse::ephemeral(
                    "Please mention a channel that is inside the category you want to use (I will use its parent category).",
                );
            };
            let Some(parent_id) = channel.parent_id else {
                return InteractionResponse::ephemeral(
                    "That channel has no parent category. Put it inside a category and try again.",
                );
            };
            state
                .settings
                .update(|s| s.ticket_category_id = Some(parent_id.clone()))
                .await;
            info!("{} set the ticket category to {}", actor.user_id, parent_id);
            InteractionResponse::ephemeral(format!(
                "✅ Ticket parent category set to <#{parent_id}>."
            ))
        }
        AdminCommand::SetStaff { role_id } => {
            let Some(role_id) = role_id else {
                return InteractionResponse::ephemeral("Please mention a role to set as staff.");
            };
            state
                .settings
                .update(|s| s.staff_role_id = Some(role_id.clone()))
                .await;
            info!("{} set the staff role to {}", actor.user_id, role_id);
            InteractionResponse::ephemeral(format!("✅ Staff role set to <@&{role_id}>."))
        }
        AdminCommand::SetTranscripts { channel } => {
            let Some(channel) = channel else {
                return InteractionResponse::ephemeral(
                    "Please mention a channel to upload transcripts to.",
                );
            };
            if !channel.is_text_like() {
                return InteractionResponse::ephemeral(
                    "Transcripts channel must be a text channel.",
                );
            }
            state
                .settings
                .update(|s| s.transcripts_channel_id = Some(channel.id.clone()))
                .await;
            info!("{} set the transcripts channel to {}", actor.user_id, channel.id);
            InteractionResponse::ephemeral(format!(
                "✅ Transcripts channel set to <#{}>.",
                channel.id
            ))
        }
        AdminCommand::SetBanner { url } => {
            let Some(url) = url.filter(|u| is_http_url(u)) else {
                return InteractionResponse::ephemeral(
                    "Please provide a valid image URL (http/https).",
                );
            };
            state
                .settings
                .update(|s| s.panel_banner_url = Some(url))
                .await;
            InteractionResponse::ephemeral("✅ Panel banner image updated.")
        }
    }
}

async fn post_panel(state: &AppState, interaction: &Interaction) -> InteractionResponse {
    let (Some(guild_id), Some(channel_id)) = (
        interaction.guild_id.as_deref(),
        interaction.channel_id.as_deref(),
    ) else {
        return InteractionResponse::ephemeral("Ticket commands can only be used inside a server.");
    };

    let settings = state.settings.snapshot().await;
    let guild = match state.platform.guild(guild_id).await {
        Ok(guild) => guild,
        Err(e) => {
            error!("Failed to fetch guild {} for the ticket panel: {}", guild_id, e);
            return InteractionResponse::ephemeral(
                "An error occurred while processing that action.",
            );
        }
    };

    let panel = ui::panel_message(&guild, settings.panel_banner_url.as_deref());
    match state.platform.send_message(channel_id, &panel).await {
        Ok(_) => {
            info!("Ticket panel posted in channel {}", channel_id);
            InteractionResponse::ephemeral("✅ Ticket panel posted.")
        }
        Err(e) => {
            error!("Failed to post the ticket panel in {}: {}", channel_id, e);
            InteractionResponse::ephemeral("An error occurred while processing that action.")
        }
    }
}
