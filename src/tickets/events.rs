use chrono::{DateTime, Utc};

use crate::channels::{ChannelId, RoleId, UserId};
use crate::tickets::TicketCategory;

/// A classified inbound ticket interaction. One variant per transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketAction {
    SelectCategory(TicketCategory),
    Lock,
    Unlock,
    Claim,
    RequestClose { with_transcript: bool },
    SubmitClose { with_transcript: bool, reason: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureSummary {
    pub ticket_number: u64,
    pub guild_id: String,
    pub opener_id: UserId,
    pub closed_by: UserId,
    pub claimed_by: Option<UserId>,
    pub opened_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub transcript_url: Option<String>,
}

/// What happened to a ticket, handed to the notification emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Created {
        channel_id: ChannelId,
        channel_name: String,
        opener_id: UserId,
        category: TicketCategory,
        staff_role_id: Option<RoleId>,
    },
    Locked {
        channel_id: ChannelId,
        actor_id: UserId,
    },
    Unlocked {
        channel_id: ChannelId,
        actor_id: UserId,
    },
    Claimed {
        channel_id: ChannelId,
        actor_id: UserId,
    },
    /// Announced inside the ticket channel right before teardown.
    Closing {
        channel_id: ChannelId,
        actor_id: UserId,
    },
    /// Delivered privately to the opener.
    Closed(ClosureSummary),
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Locked { .. } => "locked",
            Self::Unlocked { .. } => "unlocked",
            Self::Claimed { .. } => "claimed",
            Self::Closing { .. } => "closing",
            Self::Closed(_) => "closed",
        }
    }
}
