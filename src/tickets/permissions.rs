use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::{BitOr, BitOrAssign};

use crate::channels::{RoleId, UserId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Permissions(u64);

impl Permissions {
    pub const NONE: Self = Self(0);
    pub const ADMINISTRATOR: Self = Self(1 << 3);
    pub const MANAGE_CHANNELS: Self = Self(1 << 4);
    pub const VIEW_CHANNEL: Self = Self(1 << 10);
    pub const SEND_MESSAGES: Self = Self(1 << 11);
    pub const MANAGE_MESSAGES: Self = Self(1 << 13);
    pub const EMBED_LINKS: Self = Self(1 << 14);
    pub const ATTACH_FILES: Self = Self(1 << 15);
    pub const READ_MESSAGE_HISTORY: Self = Self(1 << 16);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<u64>().ok().map(Self)
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// Discord sends and accepts permission sets as decimal strings.
impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom("invalid permission bits"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteTarget {
    Role,
    Member,
}

impl Serialize for OverwriteTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            Self::Role => 0,
            Self::Member => 1,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionOverwrite {
    pub id: String,
    #[serde(rename = "type")]
    pub target: OverwriteTarget,
    pub allow: Permissions,
    pub deny: Permissions,
}

impl PermissionOverwrite {
    pub fn role(id: impl Into<String>, allow: Permissions, deny: Permissions) -> Self {
        Self {
            id: id.into(),
            target: OverwriteTarget::Role,
            allow,
            deny,
        }
    }

    pub fn member(id: impl Into<String>, allow: Permissions, deny: Permissions) -> Self {
        Self {
            id: id.into(),
            target: OverwriteTarget::Member,
            allow,
            deny,
        }
    }
}

pub fn opener_grant() -> Permissions {
    Permissions::VIEW_CHANNEL
        | Permissions::SEND_MESSAGES
        | Permissions::READ_MESSAGE_HISTORY
        | Permissions::ATTACH_FILES
        | Permissions::EMBED_LINKS
}

pub fn staff_grant() -> Permissions {
    Permissions::VIEW_CHANNEL
        | Permissions::SEND_MESSAGES
        | Permissions::READ_MESSAGE_HISTORY
        | Permissions::MANAGE_MESSAGES
        | Permissions::MANAGE_CHANNELS
}

/// Overwrites for a freshly created ticket channel.
///
/// Order matters only for readability in the audit log: everyone first, then
/// the opener, then staff when a staff role is configured.
pub fn initial_plan(
    everyone_id: &str,
    opener_id: &UserId,
    staff_role_id: Option<&RoleId>,
) -> Vec<PermissionOverwrite> {
    let mut plan = vec![
        PermissionOverwrite::role(everyone_id, Permissions::NONE, Permissions::VIEW_CHANNEL),
        PermissionOverwrite::member(opener_id.as_str(), opener_grant(), Permissions::NONE),
    ];

    if let Some(role) = staff_role_id {
        plan.push(PermissionOverwrite::role(
            role.as_str(),
            staff_grant(),
            Permissions::NONE,
        ));
    }

    plan
}

/// Opener overwrite while locked: still sees and reads the channel, cannot post.
pub fn lock_delta(opener_id: &UserId) -> PermissionOverwrite {
    PermissionOverwrite::member(
        opener_id.as_str(),
        opener_grant().without(Permissions::SEND_MESSAGES),
        Permissions::SEND_MESSAGES,
    )
}

pub fn unlock_delta(opener_id: &UserId) -> PermissionOverwrite {
    PermissionOverwrite::member(opener_id.as_str(), opener_grant(), Permissions::NONE)
}
