use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Number of capabilities in the compile-time catalog.
pub const PERMISSION_COUNT: usize = 20;

/// Every grantable capability, defined at compile time. Entries are never
/// created or destroyed at runtime; the wire id of each entry is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Administrator,
    ManageRoles,
    ManageChannels,
    CreateInvite,
    ViewChannel,
    SendMessages,
    ManageMessages,
    AttachFiles,
    AddReactions,
    MentionEveryone,
    KickMembers,
    BanMembers,
    ManageNicknames,
    VoiceConnect,
    VoiceSpeak,
    MuteMembers,
    DeafenMembers,
    MoveMembers,
    ViewAuditLog,
    ManageWebhooks,
}

/// UI grouping tag for a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    General,
    Channel,
    Member,
    Voice,
    Advanced,
}

const ALL_PERMISSIONS: [Permission; PERMISSION_COUNT] = [
    Permission::Administrator,
    Permission::ManageRoles,
    Permission::ManageChannels,
    Permission::CreateInvite,
    Permission::ViewChannel,
    Permission::SendMessages,
    Permission::ManageMessages,
    Permission::AttachFiles,
    Permission::AddReactions,
    Permission::MentionEveryone,
    Permission::KickMembers,
    Permission::BanMembers,
    Permission::ManageNicknames,
    Permission::VoiceConnect,
    Permission::VoiceSpeak,
    Permission::MuteMembers,
    Permission::DeafenMembers,
    Permission::MoveMembers,
    Permission::ViewAuditLog,
    Permission::ManageWebhooks,
];

impl Permission {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::ManageRoles => "manage_roles",
            Self::ManageChannels => "manage_channels",
            Self::CreateInvite => "create_invite",
            Self::ViewChannel => "view_channel",
            Self::SendMessages => "send_messages",
            Self::ManageMessages => "manage_messages",
            Self::AttachFiles => "attach_files",
            Self::AddReactions => "add_reactions",
            Self::MentionEveryone => "mention_everyone",
            Self::KickMembers => "kick_members",
            Self::BanMembers => "ban_members",
            Self::ManageNicknames => "manage_nicknames",
            Self::VoiceConnect => "voice_connect",
            Self::VoiceSpeak => "voice_speak",
            Self::MuteMembers => "mute_members",
            Self::DeafenMembers => "deafen_members",
            Self::MoveMembers => "move_members",
            Self::ViewAuditLog => "view_audit_log",
            Self::ManageWebhooks => "manage_webhooks",
        }
    }

    #[must_use]
    pub const fn category(self) -> PermissionCategory {
        match self {
            Self::Administrator | Self::ManageRoles | Self::ManageChannels | Self::CreateInvite => {
                PermissionCategory::General
            }
            Self::ViewChannel
            | Self::SendMessages
            | Self::ManageMessages
            | Self::AttachFiles
            | Self::AddReactions
            | Self::MentionEveryone => PermissionCategory::Channel,
            Self::KickMembers | Self::BanMembers | Self::ManageNicknames => {
                PermissionCategory::Member
            }
            Self::VoiceConnect
            | Self::VoiceSpeak
            | Self::MuteMembers
            | Self::DeafenMembers
            | Self::MoveMembers => PermissionCategory::Voice,
            Self::ViewAuditLog | Self::ManageWebhooks => PermissionCategory::Advanced,
        }
    }

    #[must_use]
    pub const fn all() -> [Self; PERMISSION_COUNT] {
        ALL_PERMISSIONS
    }
}

impl TryFrom<&str> for Permission {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        for permission in ALL_PERMISSIONS {
            if permission.as_str() == value {
                return Ok(permission);
            }
        }
        Err(DomainError::UnknownPermission)
    }
}

impl TryFrom<String> for Permission {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn permission_mask(permission: Permission) -> u64 {
    match permission {
        Permission::Administrator => 1 << 0,
        Permission::ManageRoles => 1 << 1,
        Permission::ManageChannels => 1 << 2,
        Permission::CreateInvite => 1 << 3,
        Permission::ViewChannel => 1 << 4,
        Permission::SendMessages => 1 << 5,
        Permission::ManageMessages => 1 << 6,
        Permission::AttachFiles => 1 << 7,
        Permission::AddReactions => 1 << 8,
        Permission::MentionEveryone => 1 << 9,
        Permission::KickMembers => 1 << 10,
        Permission::BanMembers => 1 << 11,
        Permission::ManageNicknames => 1 << 12,
        Permission::VoiceConnect => 1 << 13,
        Permission::VoiceSpeak => 1 << 14,
        Permission::MuteMembers => 1 << 15,
        Permission::DeafenMembers => 1 << 16,
        Permission::MoveMembers => 1 << 17,
        Permission::ViewAuditLog => 1 << 18,
        Permission::ManageWebhooks => 1 << 19,
    }
}

/// Bitmask covering every catalog entry. Bits outside this mask are not
/// capabilities and must never be trusted from a snapshot.
#[must_use]
pub fn known_permission_mask() -> u64 {
    ALL_PERMISSIONS
        .into_iter()
        .fold(0_u64, |bits, permission| bits | permission_mask(permission))
}

/// The full catalog as a permission set.
#[must_use]
pub fn all_permissions() -> PermissionSet {
    PermissionSet::from_bits(known_permission_mask())
}

/// Split raw bits into the known capability set and the unknown remainder.
#[must_use]
pub fn mask_permissions(raw_bits: u64) -> (PermissionSet, u64) {
    let mask = known_permission_mask();
    (PermissionSet::from_bits(raw_bits & mask), raw_bits & !mask)
}

/// One catalog row, as surfaced to clients for UI grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: Permission,
    pub category: PermissionCategory,
}

/// The whole catalog in declaration order.
#[must_use]
pub fn catalog() -> Vec<CatalogEntry> {
    ALL_PERMISSIONS
        .into_iter()
        .map(|permission| CatalogEntry {
            id: permission,
            category: permission.category(),
        })
        .collect()
}

/// Set of capabilities packed into a bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionSet(u64);

impl PermissionSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn from_permissions(permissions: &[Permission]) -> Self {
        let mut set = Self::empty();
        for permission in permissions {
            set.insert(*permission);
        }
        set
    }

    #[must_use]
    pub fn contains(self, permission: Permission) -> bool {
        self.0 & permission_mask(permission) != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, permission: Permission) {
        self.0 |= permission_mask(permission);
    }

    pub fn remove(&mut self, permission: Permission) {
        self.0 &= !permission_mask(permission);
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Capabilities in `self` that are absent from `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Permission> {
        ALL_PERMISSIONS
            .into_iter()
            .filter(move |permission| self.contains(*permission))
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = Self::empty();
        for permission in iter {
            set.insert(permission);
        }
        set
    }
}

impl core::fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for permission in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(permission.as_str())?;
            first = false;
        }
        Ok(())
    }
}
