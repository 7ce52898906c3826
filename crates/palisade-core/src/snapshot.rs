use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    resolve, ActorContext, CategoryId, CategoryName, ChannelId, ChannelName, DomainError,
    Permission, PermissionOverwrite, PermissionSet, Role, RoleId, UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Voice,
}

impl ChannelKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
        }
    }
}

impl TryFrom<String> for ChannelKind {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "text" => Ok(Self::Text),
            "voice" => Ok(Self::Voice),
            _ => Err(DomainError::InvalidChannelKind),
        }
    }
}

/// A text or voice room. A channel without a category resolves from role
/// base permissions plus its own overwrites only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: ChannelName,
    pub kind: ChannelKind,
    pub category_id: Option<CategoryId>,
    pub overwrites: Vec<PermissionOverwrite>,
    pub position: i32,
}

impl Channel {
    #[must_use]
    pub fn overwrite_for(&self, role_id: RoleId) -> Option<&PermissionOverwrite> {
        self.overwrites
            .iter()
            .find(|overwrite| overwrite.role_id == role_id)
    }
}

/// Grouping of channels supplying default overwrites; carries no content
/// of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: CategoryName,
    pub overwrites: Vec<PermissionOverwrite>,
    pub position: i32,
}

impl Category {
    #[must_use]
    pub fn overwrite_for(&self, role_id: RoleId) -> Option<&PermissionOverwrite> {
        self.overwrites
            .iter()
            .find(|overwrite| overwrite.role_id == role_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    pub role_ids: HashSet<RoleId>,
}

/// Consistent read view of one guild's permission-relevant state, as
/// delivered by the synchronization adapter. The snapshot is inert data:
/// re-resolving against a newer snapshot simply supersedes the prior
/// answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildSnapshot {
    pub owner_id: UserId,
    pub roles: Vec<Role>,
    pub categories: Vec<Category>,
    pub channels: Vec<Channel>,
    pub members: Vec<Member>,
}

impl GuildSnapshot {
    #[must_use]
    pub fn role(&self, role_id: RoleId) -> Option<&Role> {
        self.roles.iter().find(|role| role.id == role_id)
    }

    #[must_use]
    pub fn everyone_role(&self) -> Option<&Role> {
        self.roles.iter().find(|role| role.is_everyone())
    }

    #[must_use]
    pub fn channel(&self, channel_id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.id == channel_id)
    }

    #[must_use]
    pub fn member(&self, user_id: UserId) -> Option<&Member> {
        self.members.iter().find(|member| member.user_id == user_id)
    }

    /// Category layer for a channel. A dangling category id degrades to
    /// "no category layer" rather than failing resolution.
    #[must_use]
    pub fn category_of(&self, channel: &Channel) -> Option<&Category> {
        let category_id = channel.category_id?;
        self.categories
            .iter()
            .find(|category| category.id == category_id)
    }

    /// Roles a member resolves with: every held role that still exists,
    /// plus `@everyone`. Role ids the snapshot no longer knows contribute
    /// nothing.
    #[must_use]
    pub fn member_roles(&self, member: &Member) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .roles
            .iter()
            .filter(|role| role.is_everyone() || member.role_ids.contains(&role.id))
            .cloned()
            .collect();
        roles.sort_by_key(|role| role.position);
        roles
    }

    #[must_use]
    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    /// Effective capability set for a member in a channel of this guild.
    #[must_use]
    pub fn resolve_member(&self, member: &Member, channel: &Channel) -> PermissionSet {
        resolve(
            &self.member_roles(member),
            channel,
            self.category_of(channel),
            self.is_owner(member.user_id),
        )
    }

    #[must_use]
    pub fn member_has(
        &self,
        member: &Member,
        channel: &Channel,
        permission: Permission,
    ) -> bool {
        self.resolve_member(member, channel).contains(permission)
    }

    /// Guard-side view of a member: ownership flag plus held roles.
    #[must_use]
    pub fn actor_context(&self, member: &Member) -> ActorContext {
        ActorContext {
            is_owner: self.is_owner(member.user_id),
            roles: self.member_roles(member),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{Category, Channel, ChannelKind, GuildSnapshot, Member};
    use crate::{
        CategoryId, CategoryName, ChannelId, ChannelName, DomainError, Permission,
        PermissionOverwrite, PermissionSet, Role, RoleId, RoleName, SystemRole, UserId,
        EVERYONE_ROLE_NAME,
    };

    fn role(name: &str, position: i32, permissions: &[Permission]) -> Role {
        Role {
            id: RoleId::new(),
            name: RoleName::try_from(String::from(name)).unwrap(),
            color: None,
            permissions: PermissionSet::from_permissions(permissions),
            position,
            mentionable: false,
            system: (position == 0).then_some(SystemRole::Everyone),
        }
    }

    fn channel(name: &str, category_id: Option<CategoryId>) -> Channel {
        Channel {
            id: ChannelId::new(),
            name: ChannelName::try_from(String::from(name)).unwrap(),
            kind: ChannelKind::Text,
            category_id,
            overwrites: Vec::new(),
            position: 0,
        }
    }

    #[test]
    fn channel_kind_enforces_allowed_values() {
        assert_eq!(ChannelKind::try_from(String::from("text")).unwrap(), ChannelKind::Text);
        assert_eq!(
            ChannelKind::try_from(String::from("voice")).unwrap(),
            ChannelKind::Voice
        );
        assert_eq!(
            ChannelKind::try_from(String::from("video")).unwrap_err(),
            DomainError::InvalidChannelKind
        );
    }

    #[test]
    fn member_roles_skip_unknown_ids_and_always_include_everyone() {
        let everyone = role(EVERYONE_ROLE_NAME, 0, &[Permission::ViewChannel]);
        let member_role = role("member", 1, &[Permission::SendMessages]);
        let stale = RoleId::new();

        let snapshot = GuildSnapshot {
            owner_id: UserId::new(),
            roles: vec![everyone.clone(), member_role.clone()],
            categories: Vec::new(),
            channels: Vec::new(),
            members: Vec::new(),
        };

        let member = Member {
            user_id: UserId::new(),
            role_ids: HashSet::from([member_role.id, stale]),
        };

        let roles = snapshot.member_roles(&member);
        assert_eq!(roles.len(), 2);
        assert!(roles.iter().any(Role::is_everyone));
        assert!(roles.iter().all(|r| r.id != stale));

        let bare = Member {
            user_id: UserId::new(),
            role_ids: HashSet::new(),
        };
        let roles = snapshot.member_roles(&bare);
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].id, everyone.id);
    }

    #[test]
    fn dangling_category_id_degrades_to_no_category_layer() {
        let snapshot = GuildSnapshot {
            owner_id: UserId::new(),
            roles: Vec::new(),
            categories: vec![Category {
                id: CategoryId::new(),
                name: CategoryName::try_from(String::from("general")).unwrap(),
                overwrites: Vec::new(),
                position: 0,
            }],
            channels: Vec::new(),
            members: Vec::new(),
        };

        let orphan = channel("orphan", Some(CategoryId::new()));
        assert!(snapshot.category_of(&orphan).is_none());

        let free = channel("free", None);
        assert!(snapshot.category_of(&free).is_none());
    }

    #[test]
    fn overwrite_lookup_is_per_role() {
        let target = RoleId::new();
        let mut room = channel("room", None);
        room.overwrites.push(PermissionOverwrite::new(
            target,
            PermissionSet::from_permissions(&[Permission::SendMessages]),
            PermissionSet::empty(),
        ));

        assert!(room.overwrite_for(target).is_some());
        assert!(room.overwrite_for(RoleId::new()).is_none());
    }

    #[test]
    fn snapshot_resolution_marks_owner() {
        let everyone = role(EVERYONE_ROLE_NAME, 0, &[]);
        let owner_id = UserId::new();
        let room = channel("room", None);
        let snapshot = GuildSnapshot {
            owner_id,
            roles: vec![everyone],
            categories: Vec::new(),
            channels: vec![room.clone()],
            members: Vec::new(),
        };

        let owner = Member {
            user_id: owner_id,
            role_ids: HashSet::new(),
        };
        assert!(snapshot.member_has(&owner, &room, Permission::ManageRoles));

        let guest = Member {
            user_id: UserId::new(),
            role_ids: HashSet::new(),
        };
        assert!(!snapshot.member_has(&guest, &room, Permission::ManageRoles));
    }
}
