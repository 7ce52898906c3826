use crate::{
    compute_base_permissions, highest_role_position, resolve, resolve_category, Category, Channel,
    Permission, PermissionSet, Role, SystemRole,
};

/// Guard-side view of the acting member: ownership flag plus every role
/// they hold (including `@everyone`).
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub is_owner: bool,
    pub roles: Vec<Role>,
}

impl ActorContext {
    /// Server-wide base view (no channel, no category), the scope rule 3
    /// checks against.
    #[must_use]
    pub fn base_permissions(&self) -> PermissionSet {
        compute_base_permissions(&self.roles)
    }

    #[must_use]
    pub fn highest_position(&self) -> i32 {
        highest_role_position(&self.roles)
    }
}

/// Configuration mutations the guard arbitrates. `edit_role` is split into
/// permission-set and identity edits so the floor role's permission set
/// stays editable while its name, color, and existence stay immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    CreateRole,
    AssignRole,
    RemoveRole,
    EditRolePermissions,
    EditRoleIdentity,
    DeleteRole,
    ReorderRoles,
    CreateChannel,
    DeleteChannel,
    EditChannelOverwrite,
    CreateCategory,
    DeleteCategory,
    EditCategoryOverwrite,
}

impl MutationAction {
    #[must_use]
    pub const fn required_permission(self) -> Permission {
        match self {
            Self::CreateRole
            | Self::AssignRole
            | Self::RemoveRole
            | Self::EditRolePermissions
            | Self::EditRoleIdentity
            | Self::DeleteRole
            | Self::ReorderRoles => Permission::ManageRoles,
            Self::CreateChannel
            | Self::DeleteChannel
            | Self::EditChannelOverwrite
            | Self::CreateCategory
            | Self::DeleteCategory
            | Self::EditCategoryOverwrite => Permission::ManageChannels,
        }
    }

    const fn targets_role(self) -> bool {
        matches!(
            self,
            Self::AssignRole
                | Self::RemoveRole
                | Self::EditRolePermissions
                | Self::EditRoleIdentity
                | Self::DeleteRole
                | Self::ReorderRoles
        )
    }
}

/// What a mutation acts on. Channel targets carry their category so
/// grant checks run in the channel's resolved scope.
#[derive(Debug, Clone, Copy)]
pub enum MutationTarget<'a> {
    Role(&'a Role),
    Channel {
        channel: &'a Channel,
        category: Option<&'a Category>,
    },
    Category(&'a Category),
    Server,
}

/// Denial verdict. The `Display` string is the human-readable reason the
/// caller must surface; the mutation must not reach the store.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MutationDenied {
    #[error("missing the {required} permission")]
    MissingPermission { required: Permission },
    #[error(
        "target role position {target_position} is not below the actor's highest position {actor_position}"
    )]
    RoleOutranksActor {
        actor_position: i32,
        target_position: i32,
    },
    #[error("the everyone role cannot be renamed, assigned, reordered, or deleted")]
    EveryoneImmutable,
    #[error("the owner role cannot be changed or assigned")]
    OwnerRoleImmutable,
    #[error("cannot grant capabilities the actor does not hold: {missing}")]
    GrantExceedsActor { missing: PermissionSet },
}

/// Decide whether the acting member may perform a configuration mutation.
///
/// Rules evaluate in order, first match wins: owner bypass; system-role
/// immutability; required capability on the server-wide base view; strict
/// position dominance for role targets (binding even for administrators);
/// no granting capabilities the actor does not effectively hold in the
/// target scope (administrators exempt).
///
/// # Errors
/// Returns the first [`MutationDenied`] rule violation.
pub fn authorize_mutation(
    actor: &ActorContext,
    action: MutationAction,
    target: MutationTarget<'_>,
    granting: Option<PermissionSet>,
) -> Result<(), MutationDenied> {
    if actor.is_owner {
        return Ok(());
    }

    if let MutationTarget::Role(role) = target {
        match role.system {
            Some(SystemRole::Owner) => return Err(MutationDenied::OwnerRoleImmutable),
            Some(SystemRole::Everyone)
                if !matches!(action, MutationAction::EditRolePermissions) =>
            {
                return Err(MutationDenied::EveryoneImmutable);
            }
            _ => {}
        }
    }

    let base = actor.base_permissions();
    let is_administrator = base.contains(Permission::Administrator);
    let required = action.required_permission();
    if !is_administrator && !base.contains(required) {
        return Err(MutationDenied::MissingPermission { required });
    }

    if action.targets_role() {
        if let MutationTarget::Role(role) = target {
            let actor_position = actor.highest_position();
            if actor_position <= role.position {
                return Err(MutationDenied::RoleOutranksActor {
                    actor_position,
                    target_position: role.position,
                });
            }
        }
    }

    if let Some(granting) = granting {
        if !is_administrator {
            let scope = match target {
                MutationTarget::Channel { channel, category } => {
                    resolve(&actor.roles, channel, category, false)
                }
                MutationTarget::Category(category) => {
                    resolve_category(&actor.roles, category, false)
                }
                MutationTarget::Role(_) | MutationTarget::Server => base,
            };
            let missing = granting.difference(scope);
            if !missing.is_empty() {
                return Err(MutationDenied::GrantExceedsActor { missing });
            }
        }
    }

    Ok(())
}
