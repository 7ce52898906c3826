use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use palisade_core::{
    authorize_mutation, plan_role_reorder, MutationAction, MutationTarget, Role, RoleColor,
    RoleId, RoleName, UserId,
};

use crate::server::{
    auth::acting_user,
    core::AppState,
    errors::ApiFailure,
    handlers::{guard_denied, require_member},
    permissions::{MAX_GUILD_ROLES, MAX_MEMBER_ROLE_ASSIGNMENTS},
    types::{
        permission_set_from_list, role_response, CreateRoleRequest, MemberRolesResponse,
        ReorderRolesRequest, RoleListResponse, RoleResponse, UpdateRoleRequest,
    },
};

pub(crate) async fn list_guild_roles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(guild_id): Path<String>,
) -> Result<Json<RoleListResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let guilds = state.guilds.read().await;
    let guild = guilds.get(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let mut roles: Vec<&Role> = guild.roles.values().collect();
    roles.sort_by_key(|role| role.position);

    Ok(Json(RoleListResponse {
        roles: roles.into_iter().map(role_response).collect(),
    }))
}

pub(crate) async fn create_guild_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(guild_id): Path<String>,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<Json<RoleResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let permissions = permission_set_from_list(&payload.permissions)?;
    let name = RoleName::try_from(payload.name).map_err(|_| ApiFailure::InvalidRequest)?;
    let color = payload
        .color
        .map(RoleColor::try_from)
        .transpose()
        .map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::CreateRole,
        MutationTarget::Server,
        Some(permissions),
    )
    .map_err(|denial| guard_denied("role.create", &denial))?;

    if guild.roles.len() >= MAX_GUILD_ROLES {
        return Err(ApiFailure::LimitReached);
    }

    let top = guild.next_role_position();
    let position = payload.position.map_or(top, |requested| requested.clamp(1, top));
    if position < top {
        // Requested slot is occupied: everything at or above it moves up
        // one, keeping positions unique.
        for role in guild.roles.values_mut() {
            if role.position >= position {
                role.position += 1;
            }
        }
    }

    let role = Role {
        id: RoleId::new(),
        name,
        color,
        permissions,
        position,
        mentionable: payload.mentionable,
        system: None,
    };
    let response = role_response(&role);
    guild.roles.insert(role.id, role);
    tracing::info!(event = "role.create", outcome = "applied", guild_id = %guild_id, role_id = %response.role_id);

    Ok(Json(response))
}

pub(crate) async fn update_guild_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, role_id)): Path<(String, String)>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<RoleResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let role_id = RoleId::try_from(role_id).map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let existing = guild.roles.get(&role_id).cloned().ok_or(ApiFailure::NotFound)?;
    let ctx = guild.actor_context(actor);

    let wants_identity =
        payload.name.is_some() || payload.color.is_some() || payload.mentionable.is_some();
    if wants_identity {
        authorize_mutation(
            &ctx,
            MutationAction::EditRoleIdentity,
            MutationTarget::Role(&existing),
            None,
        )
        .map_err(|denial| guard_denied("role.update", &denial))?;
    }

    let mut new_permissions = None;
    if let Some(names) = &payload.permissions {
        let requested = permission_set_from_list(names)?;
        // Only capabilities being added count as a grant; narrowing a
        // role never escalates.
        let added = requested.difference(existing.permissions);
        authorize_mutation(
            &ctx,
            MutationAction::EditRolePermissions,
            MutationTarget::Role(&existing),
            Some(added),
        )
        .map_err(|denial| guard_denied("role.update", &denial))?;
        new_permissions = Some(requested);
    }

    let name = payload
        .name
        .map(RoleName::try_from)
        .transpose()
        .map_err(|_| ApiFailure::InvalidRequest)?;
    let color = payload
        .color
        .map(RoleColor::try_from)
        .transpose()
        .map_err(|_| ApiFailure::InvalidRequest)?;

    let role = guild
        .roles
        .get_mut(&role_id)
        .ok_or(ApiFailure::NotFound)?;
    if let Some(name) = name {
        role.name = name;
    }
    if let Some(color) = color {
        role.color = Some(color);
    }
    if let Some(mentionable) = payload.mentionable {
        role.mentionable = mentionable;
    }
    if let Some(permissions) = new_permissions {
        role.permissions = permissions;
    }
    let response = role_response(role);
    tracing::info!(event = "role.update", outcome = "applied", guild_id = %guild_id, role_id = %role_id);

    Ok(Json(response))
}

pub(crate) async fn delete_guild_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, role_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiFailure> {
    let actor = acting_user(&headers)?;
    let role_id = RoleId::try_from(role_id).map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let existing = guild.roles.get(&role_id).cloned().ok_or(ApiFailure::NotFound)?;
    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::DeleteRole,
        MutationTarget::Role(&existing),
        None,
    )
    .map_err(|denial| guard_denied("role.delete", &denial))?;

    guild.remove_role_everywhere(role_id);
    tracing::info!(event = "role.delete", outcome = "applied", guild_id = %guild_id, role_id = %role_id);

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn reorder_guild_roles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(guild_id): Path<String>,
    Json(payload): Json<ReorderRolesRequest>,
) -> Result<Json<RoleListResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let mut ordered = Vec::with_capacity(payload.role_ids.len());
    for raw in payload.role_ids {
        ordered.push(RoleId::try_from(raw).map_err(|_| ApiFailure::InvalidRequest)?);
    }

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let roles: Vec<Role> = guild.roles.values().cloned().collect();
    let plan = plan_role_reorder(&roles, &ordered).map_err(|error| {
        tracing::warn!(event = "role.reorder", outcome = "rejected", reason = %error);
        ApiFailure::InvalidRequest
    })?;

    let ctx = guild.actor_context(actor);
    for (role_id, new_position) in &plan {
        let current = guild.roles.get(role_id).ok_or(ApiFailure::NotFound)?;
        if current.position != *new_position {
            authorize_mutation(
                &ctx,
                MutationAction::ReorderRoles,
                MutationTarget::Role(current),
                None,
            )
            .map_err(|denial| guard_denied("role.reorder", &denial))?;
        }
    }

    // All checks passed: apply the whole assignment at once.
    for (role_id, new_position) in plan {
        if let Some(role) = guild.roles.get_mut(&role_id) {
            role.position = new_position;
        }
    }
    tracing::info!(event = "role.reorder", outcome = "applied", guild_id = %guild_id);

    let mut roles: Vec<&Role> = guild.roles.values().collect();
    roles.sort_by_key(|role| role.position);
    Ok(Json(RoleListResponse {
        roles: roles.into_iter().map(role_response).collect(),
    }))
}

pub(crate) async fn assign_guild_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, role_id, user_id)): Path<(String, String, String)>,
) -> Result<Json<MemberRolesResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let role_id = RoleId::try_from(role_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let user = UserId::try_from(user_id).map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let target = guild.roles.get(&role_id).cloned().ok_or(ApiFailure::NotFound)?;
    if !guild.members.contains_key(&user) {
        return Err(ApiFailure::NotFound);
    }

    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::AssignRole,
        MutationTarget::Role(&target),
        None,
    )
    .map_err(|denial| guard_denied("role.assign", &denial))?;

    let held = guild
        .members
        .get_mut(&user)
        .ok_or(ApiFailure::NotFound)?;
    if !held.contains(&role_id) && held.len() >= MAX_MEMBER_ROLE_ASSIGNMENTS {
        return Err(ApiFailure::LimitReached);
    }
    held.insert(role_id);
    tracing::info!(event = "role.assign", outcome = "applied", guild_id = %guild_id, role_id = %role_id, target_user_id = %user);

    let mut role_ids: Vec<String> = held.iter().map(ToString::to_string).collect();
    role_ids.sort_unstable();
    Ok(Json(MemberRolesResponse {
        user_id: user.to_string(),
        role_ids,
    }))
}

pub(crate) async fn unassign_guild_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, role_id, user_id)): Path<(String, String, String)>,
) -> Result<Json<MemberRolesResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let role_id = RoleId::try_from(role_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let user = UserId::try_from(user_id).map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let target = guild.roles.get(&role_id).cloned().ok_or(ApiFailure::NotFound)?;
    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::RemoveRole,
        MutationTarget::Role(&target),
        None,
    )
    .map_err(|denial| guard_denied("role.unassign", &denial))?;

    let held = guild
        .members
        .get_mut(&user)
        .ok_or(ApiFailure::NotFound)?;
    held.remove(&role_id);
    tracing::info!(event = "role.unassign", outcome = "applied", guild_id = %guild_id, role_id = %role_id, target_user_id = %user);

    let mut role_ids: Vec<String> = held.iter().map(ToString::to_string).collect();
    role_ids.sort_unstable();
    Ok(Json(MemberRolesResponse {
        user_id: user.to_string(),
        role_ids,
    }))
}
