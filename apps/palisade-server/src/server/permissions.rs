use palisade_core::{
    Permission, PermissionSet, Role, RoleId, RoleName, SystemRole, EVERYONE_POSITION,
    EVERYONE_ROLE_NAME,
};

pub(crate) const MAX_GUILD_ROLES: usize = 64;
pub(crate) const MAX_GUILD_CHANNELS: usize = 128;
pub(crate) const MAX_GUILD_CATEGORIES: usize = 32;
pub(crate) const MAX_MEMBER_ROLE_ASSIGNMENTS: usize = 16;

pub(crate) fn default_everyone_permissions() -> PermissionSet {
    PermissionSet::from_permissions(&[
        Permission::ViewChannel,
        Permission::SendMessages,
        Permission::AttachFiles,
        Permission::AddReactions,
        Permission::CreateInvite,
        Permission::VoiceConnect,
        Permission::VoiceSpeak,
    ])
}

pub(crate) fn make_everyone_role() -> Role {
    Role {
        id: RoleId::new(),
        name: RoleName::try_from(String::from(EVERYONE_ROLE_NAME))
            .expect("the everyone role name is a valid role name"),
        color: None,
        permissions: default_everyone_permissions(),
        position: EVERYONE_POSITION,
        mentionable: false,
        system: Some(SystemRole::Everyone),
    }
}
