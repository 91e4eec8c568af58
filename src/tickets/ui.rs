//! Discord embeds, buttons and modals for tickets. Plain data in, payloads out.

use chrono::{Local, Utc};

use crate::channels::{
    ActionRow, Button, ButtonStyle, Component, Embed, EmbedAuthor, EmbedFooter, EmbedImage,
    GuildInfo, MessagePayload, Modal, SelectMenu, TextInput,
};
use crate::tickets::events::ClosureSummary;
use crate::tickets::TicketCategory;

pub const SELECT_CATEGORY_ID: &str = "ticket_select";
pub const LOCK_ID: &str = "ticket_lock";
pub const UNLOCK_ID: &str = "ticket_unlock";
pub const CLAIM_ID: &str = "ticket_claim";
pub const DELETE_ID: &str = "ticket_delete";
pub const DELETE_TRANSCRIPT_ID: &str = "ticket_delete_transcript";
pub const CLOSE_MODAL_TRANSCRIPT_ID: &str = "close_modal:trans";
pub const CLOSE_MODAL_PLAIN_ID: &str = "close_modal:notrans";
pub const CLOSE_REASON_ID: &str = "close_reason";

pub const COLOR_PANEL: u32 = 0xFF5050;

pub const EMOJI_LOCK: &str = "🔒";
pub const EMOJI_UNLOCK: &str = "🔓";
pub const EMOJI_CLAIM: &str = "✅";
pub const EMOJI_DELETE: &str = "🗑️";
pub const EMOJI_TRANSCRIPT: &str = "🧾";

/// Prefix put in front of a claimed ticket's channel name.
pub const CLAIMED_PREFIX: &str = "✅-";

fn category_emoji(category: TicketCategory) -> &'static str {
    match category {
        TicketCategory::Support => "📬",
        TicketCategory::Billings => "💵",
    }
}

fn category_description(category: TicketCategory) -> &'static str {
    match category {
        TicketCategory::Support => "General support & help",
        TicketCategory::Billings => "Payments & purchases help",
    }
}

fn now() -> Option<String> {
    Some(Utc::now().to_rfc3339())
}

pub fn panel_message(guild: &GuildInfo, banner_url: Option<&str>) -> MessagePayload {
    let embed = Embed {
        color: Some(COLOR_PANEL),
        author: Some(EmbedAuthor {
            name: format!("{} • Support", guild.name),
            icon_url: guild.icon_url(),
        }),
        title: Some("Open a Ticket".to_string()),
        description: Some(
            "Select a category from the menu below to open a private support ticket. \
             Our staff will respond as soon as possible."
                .to_string(),
        ),
        image: banner_url.map(|url| EmbedImage {
            url: url.to_string(),
        }),
        footer: Some(EmbedFooter {
            text: "Support • Select a category to start".to_string(),
        }),
        timestamp: now(),
        ..Embed::default()
    }
    .field(
        "How to create a ticket",
        "`1.` Choose the correct category\n`2.` Answer follow-up questions (if any)\n`3.` Wait for staff to respond",
        false,
    )
    .field(
        "Rules",
        "Don't open multiple tickets for the same issue. Abuse may lead to punishment.",
        false,
    );

    let menu = TicketCategory::ALL.into_iter().fold(
        SelectMenu::new(SELECT_CATEGORY_ID, "Choose a category to open a ticket"),
        |menu, category| {
            menu.option(
                category.label(),
                category.value(),
                category_description(category),
                category_emoji(category),
            )
        },
    );

    MessagePayload::default()
        .with_embed(embed)
        .with_components(vec![ActionRow::new(vec![Component::SelectMenu(menu)])])
}

pub fn ticket_buttons(locked: bool, claimed: bool) -> Vec<ActionRow> {
    let state_row = ActionRow::new(vec![
        Component::Button(
            Button::new(LOCK_ID, "Lock", ButtonStyle::Primary)
                .emoji(EMOJI_LOCK)
                .disabled(locked),
        ),
        Component::Button(
            Button::new(UNLOCK_ID, "Unlock", ButtonStyle::Secondary)
                .emoji(EMOJI_UNLOCK)
                .disabled(!locked),
        ),
        Component::Button(
            Button::new(
                CLAIM_ID,
                if claimed { "Claimed" } else { "Claim" },
                ButtonStyle::Success,
            )
            .emoji(EMOJI_CLAIM)
            .disabled(claimed),
        ),
    ]);
    let close_row = ActionRow::new(vec![
        Component::Button(
            Button::new(DELETE_ID, "Delete", ButtonStyle::Danger).emoji(EMOJI_DELETE),
        ),
        Component::Button(
            Button::new(DELETE_TRANSCRIPT_ID, "Delete & Transcript", ButtonStyle::Danger)
                .emoji(EMOJI_TRANSCRIPT),
        ),
    ]);
    vec![state_row, close_row]
}

pub fn header_message(
    channel_name: &str,
    opener_id: &str,
    category: TicketCategory,
    staff_role_id: Option<&str>,
) -> MessagePayload {
    let staff_mention = match staff_role_id {
        Some(role) => format!("<@&{role}>"),
        None => "`(Set a staff role with /setstaff)`".to_string(),
    };

    let embed = Embed {
        color: Some(COLOR_PANEL),
        title: Some(format!("#{channel_name}")),
        description: Some(format!(
            "<@{opener_id}> has created a ticket under **{}**.",
            category.label()
        )),
        timestamp: now(),
        ..Embed::default()
    }
    .field("Opened by", format!("<@{opener_id}>"), true)
    .field("Category", category.label(), true);

    MessagePayload::text(format!("<@{opener_id}> {staff_mention}"))
        .with_embed(embed)
        .with_components(ticket_buttons(false, false))
}

pub fn locked_notice(actor_id: &str) -> MessagePayload {
    MessagePayload::text(format!("{EMOJI_LOCK} Ticket locked by <@{actor_id}>."))
}

pub fn unlocked_notice(actor_id: &str) -> MessagePayload {
    MessagePayload::text(format!("{EMOJI_UNLOCK} Ticket unlocked by <@{actor_id}>."))
}

pub fn claimed_notice(actor_id: &str) -> MessagePayload {
    MessagePayload::text(format!("{EMOJI_CLAIM} Ticket claimed by <@{actor_id}>."))
}

pub fn closing_notice(actor_id: &str) -> MessagePayload {
    MessagePayload::text(format!(
        "{EMOJI_DELETE} Ticket closed by <@{actor_id}>. Deleting channel..."
    ))
}

pub fn claimed_channel_name(current: &str) -> Option<String> {
    if current.starts_with(CLAIMED_PREFIX) {
        None
    } else {
        Some(format!("{CLAIMED_PREFIX}{current}"))
    }
}

pub fn close_modal(with_transcript: bool) -> Modal {
    let mut reason = TextInput::paragraph(
        CLOSE_REASON_ID,
        "Please provide a reason to close the ticket (optional)",
    );
    reason.placeholder = Some("E.g. Issue resolved / Duplicate / Abusive behavior".to_string());
    reason.max_length = 1000;

    Modal {
        custom_id: if with_transcript {
            CLOSE_MODAL_TRANSCRIPT_ID
        } else {
            CLOSE_MODAL_PLAIN_ID
        }
        .to_string(),
        title: "Reason for closing ticket".to_string(),
        components: vec![ActionRow::new(vec![Component::TextInput(reason)])],
    }
}

pub fn transcript_upload_message(channel_id: &str, opener_id: &str) -> MessagePayload {
    MessagePayload::text(format!(
        "Transcript for <#{channel_id}> • Opened by <@{opener_id}>"
    ))
}

pub fn closed_dm(summary: &ClosureSummary, guild: Option<&GuildInfo>) -> MessagePayload {
    let embed = Embed {
        title: Some("Ticket Closed".to_string()),
        color: Some(COLOR_PANEL),
        author: guild.map(|g| EmbedAuthor {
            name: g.name.clone(),
            icon_url: g.icon_url(),
        }),
        timestamp: now(),
        ..Embed::default()
    }
    .field("🔢 Ticket ID", summary.ticket_number.to_string(), true)
    .field("✅ Opened By", format!("<@{}>", summary.opener_id), true)
    .field("🛑 Closed By", format!("<@{}>", summary.closed_by), true)
    .field(
        "🧰 Claimed By",
        summary
            .claimed_by
            .as_ref()
            .map(|id| format!("<@{id}>"))
            .unwrap_or_else(|| "Not claimed".to_string()),
        true,
    )
    .field(
        "⏰ Open Time",
        summary
            .opened_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        true,
    )
    .field(
        "📝 Reason",
        summary
            .reason
            .clone()
            .unwrap_or_else(|| "No reason provided".to_string()),
        false,
    );

    let mut message = MessagePayload::default().with_embed(embed);
    if let Some(url) = &summary.transcript_url {
        message = message.with_components(vec![ActionRow::new(vec![Component::Button(
            Button::link("View Online Transcript", url.as_str()),
        )])]);
    }
    message
}
