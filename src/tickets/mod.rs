pub mod controller;
pub mod events;
pub mod notify;
pub mod permissions;
pub mod registry;
pub mod transcript;
pub mod ui;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::channels::{ChannelError, ChannelId, GuildId, RoleId, UserId};
use crate::config::TicketSettings;
use permissions::Permissions;

pub use controller::{CloseReport, CloseRequest, StepStatus, TicketController, TicketCreated};
pub use events::{LifecycleEvent, TicketAction};
pub use registry::TicketRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TicketCategory {
    Support,
    Billings,
}

impl TicketCategory {
    pub const ALL: [TicketCategory; 2] = [TicketCategory::Support, TicketCategory::Billings];

    pub fn label(self) -> &'static str {
        match self {
            Self::Support => "SUPPORT",
            Self::Billings => "BILLINGS",
        }
    }

    /// Value carried by the panel's select menu option.
    pub fn value(self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Billings => "billings",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.value() == value)
    }
}

impl std::fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketRecord {
    pub opener_id: UserId,
    pub guild_id: GuildId,
    pub category: TicketCategory,
    pub channel_name: String,
    pub opened_at: DateTime<Utc>,
    pub claimed_by: Option<UserId>,
    pub locked: bool,
    pub closing: bool,
    pub ticket_number: u64,
}

impl TicketRecord {
    pub fn new(
        opener_id: impl Into<String>,
        guild_id: impl Into<String>,
        category: TicketCategory,
        ticket_number: u64,
    ) -> Self {
        Self {
            opener_id: opener_id.into(),
            guild_id: guild_id.into(),
            category,
            channel_name: channel_name_for(ticket_number),
            opened_at: Utc::now(),
            claimed_by: None,
            locked: false,
            closing: false,
            ticket_number,
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }
}

pub fn channel_name_for(ticket_number: u64) -> String {
    format!("ticket-{ticket_number}")
}

/// The member behind an inbound interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub name: String,
    pub role_ids: Vec<RoleId>,
    pub permissions: Permissions,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            role_ids: Vec::new(),
            permissions: Permissions::NONE,
        }
    }

    pub fn with_role(mut self, role_id: impl Into<String>) -> Self {
        self.role_ids.push(role_id.into());
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.permissions.contains(Permissions::ADMINISTRATOR)
    }

    pub fn is_staff(&self, settings: &TicketSettings) -> bool {
        let has_role = settings
            .staff_role_id
            .as_ref()
            .is_some_and(|role| self.role_ids.iter().any(|r| r == role));
        has_role || self.is_admin()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("opener already has an open ticket")]
    AlreadyHasTicket { channel_id: Option<ChannelId> },
    #[error("a ticket for opener {opener_id} is already registered")]
    DuplicateTicket { opener_id: UserId },
    #[error("channel is not a ticket")]
    NotATicket,
    #[error("actor may not {action} tickets")]
    Forbidden { action: &'static str },
    #[error("redundant transition: {0}")]
    NoOp(String),
    #[error("ticket already claimed by {claimant}")]
    AlreadyClaimed { claimant: UserId },
    #[error("ticket parent category is missing and could not be created")]
    CategoryUnavailable,
    #[error("{operation} failed: {source}")]
    ExternalCallFailed {
        operation: &'static str,
        #[source]
        source: ChannelError,
    },
}

impl TicketError {
    pub fn external(operation: &'static str) -> impl FnOnce(ChannelError) -> Self {
        move |source| Self::ExternalCallFailed { operation, source }
    }

    /// Text shown privately to the actor whose request was rejected.
    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadyHasTicket {
                channel_id: Some(id),
            } => format!("You already have an open ticket: <#{id}>"),
            Self::AlreadyHasTicket { channel_id: None } | Self::DuplicateTicket { .. } => {
                "Your ticket is already being created.".to_string()
            }
            Self::NotATicket => "This channel is not recognized as a ticket.".to_string(),
            Self::Forbidden { action } => format!("Only staff can {action} tickets."),
            Self::NoOp(reason) => reason.clone(),
            Self::AlreadyClaimed { claimant } => format!("Already claimed by <@{claimant}>."),
            Self::CategoryUnavailable => {
                "Failed to create/find Tickets category. Ask an admin to check permissions."
                    .to_string()
            }
            Self::ExternalCallFailed { .. } => {
                "An error occurred while processing that action.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_values_round_trip() {
        assert_eq!(TicketCategory::from_value("billings"), Some(TicketCategory::Billings));
        assert_eq!(TicketCategory::from_value("support"), Some(TicketCategory::Support));
        assert_eq!(TicketCategory::from_value("sales"), None);
        assert_eq!(TicketCategory::Billings.to_string(), "BILLINGS");
    }

    #[test]
    fn test_actor_staff_checks() {
        let settings = TicketSettings {
            staff_role_id: Some("staff".to_string()),
            ..TicketSettings::default()
        };

        assert!(Actor::new("s1", "S1").with_role("staff").is_staff(&settings));
        assert!(!Actor::new("u1", "U1").with_role("member").is_staff(&settings));
        assert!(Actor::new("a1", "A1")
            .with_permissions(Permissions::ADMINISTRATOR)
            .is_staff(&settings));
        assert!(!Actor::new("s1", "S1")
            .with_role("staff")
            .is_staff(&TicketSettings::default()));
    }

    #[test]
    fn test_user_messages() {
        let err = TicketError::AlreadyClaimed {
            claimant: "9".to_string(),
        };
        assert_eq!(err.user_message(), "Already claimed by <@9>.");
        assert_eq!(
            TicketError::Forbidden { action: "lock" }.user_message(),
            "Only staff can lock tickets."
        );
        let external = TicketError::external("create channel")(ChannelError::NotFound("x".into()));
        assert_eq!(
            external.user_message(),
            "An error occurred while processing that action."
        );
        assert!(external.to_string().starts_with("create channel failed"));
    }

    #[test]
    fn test_new_record_defaults() {
        let record = TicketRecord::new("u1", "g1", TicketCategory::Support, 7);
        assert_eq!(record.channel_name, "ticket-7");
        assert!(!record.locked);
        assert!(!record.is_claimed());
        assert!(!record.closing);
    }
}
