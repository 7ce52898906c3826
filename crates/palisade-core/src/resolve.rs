use crate::{
    all_permissions, Category, Channel, Permission, PermissionOverwrite, PermissionSet, Role,
};

/// Server-wide capability view before any overwrite layer: the union of
/// base grants across a member's roles.
#[must_use]
pub fn compute_base_permissions(member_roles: &[Role]) -> PermissionSet {
    member_roles
        .iter()
        .fold(PermissionSet::empty(), |acc, role| {
            acc.union(role.permissions)
        })
}

/// One overwrite layer, two passes: every deny contributed by a held
/// role's overwrite is subtracted first, then every allow is added. With
/// denies applied before allows, an explicit allow from any held role wins
/// a same-layer conflict, which is what lets a specific role re-open a
/// channel that another role's overwrite locks down.
fn apply_overwrite_layer(
    effective: PermissionSet,
    member_roles: &[Role],
    overwrites: &[PermissionOverwrite],
) -> PermissionSet {
    let mut deny = PermissionSet::empty();
    let mut allow = PermissionSet::empty();
    for role in member_roles {
        if let Some(overwrite) = overwrites
            .iter()
            .find(|overwrite| overwrite.role_id == role.id)
        {
            deny = deny.union(overwrite.deny);
            allow = allow.union(overwrite.allow);
        }
    }
    effective.difference(deny).union(allow)
}

/// Effective capability set for a member in a channel.
///
/// Total and deterministic: the owner gets the full catalog, a role
/// carrying `administrator` gets the full catalog regardless of any
/// overwrite, everyone else starts from the base union, then the category
/// layer (when present) and the channel layer apply in that order. The
/// channel layer runs last, so channel overwrites take precedence over
/// category defaults.
#[must_use]
pub fn resolve(
    member_roles: &[Role],
    channel: &Channel,
    category: Option<&Category>,
    is_owner: bool,
) -> PermissionSet {
    if is_owner {
        return all_permissions();
    }

    let base = compute_base_permissions(member_roles);
    if base.contains(Permission::Administrator) {
        return all_permissions();
    }

    let mut effective = base;
    if let Some(category) = category {
        effective = apply_overwrite_layer(effective, member_roles, &category.overwrites);
    }
    apply_overwrite_layer(effective, member_roles, &channel.overwrites)
}

/// Category-scope view: base permissions with only the category layer
/// applied. This is the scope in which category-overwrite grants are
/// checked.
#[must_use]
pub fn resolve_category(
    member_roles: &[Role],
    category: &Category,
    is_owner: bool,
) -> PermissionSet {
    if is_owner {
        return all_permissions();
    }

    let base = compute_base_permissions(member_roles);
    if base.contains(Permission::Administrator) {
        return all_permissions();
    }

    apply_overwrite_layer(base, member_roles, &category.overwrites)
}

/// Single-capability gate used by every access check.
#[must_use]
pub fn has_permission(
    member_roles: &[Role],
    channel: &Channel,
    category: Option<&Category>,
    is_owner: bool,
    permission: Permission,
) -> bool {
    resolve(member_roles, channel, category, is_owner).contains(permission)
}
