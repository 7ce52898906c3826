use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use palisade_core::{catalog, compute_base_permissions, ChannelId, Permission, UserId};

use crate::server::{
    auth::acting_user,
    core::AppState,
    errors::ApiFailure,
    handlers::require_member,
    types::{
        permission_set_to_list, CatalogResponse, PermissionCheckResponse,
        ResolvedPermissionsResponse,
    },
};

/// Static capability registry, grouped for UI rendering.
pub(crate) async fn catalog_listing() -> Json<CatalogResponse> {
    Json(CatalogResponse {
        permissions: catalog(),
    })
}

/// Server-wide base view: role-union permissions before any overwrite
/// layer. This is the scope the hierarchy guard checks required
/// capabilities against.
pub(crate) async fn member_base_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, user_id)): Path<(String, String)>,
) -> Result<Json<ResolvedPermissionsResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let user = UserId::try_from(user_id).map_err(|_| ApiFailure::InvalidRequest)?;

    let guilds = state.guilds.read().await;
    let guild = guilds.get(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;
    if !guild.is_member(user) {
        return Err(ApiFailure::NotFound);
    }

    let base = compute_base_permissions(&guild.member_roles(user));
    Ok(Json(ResolvedPermissionsResponse {
        user_id: user.to_string(),
        permissions: permission_set_to_list(base),
    }))
}

pub(crate) async fn channel_permissions_for(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, channel_id, user_id)): Path<(String, String, String)>,
) -> Result<Json<ResolvedPermissionsResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let channel_id = ChannelId::try_from(channel_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let user = UserId::try_from(user_id).map_err(|_| ApiFailure::InvalidRequest)?;

    let guilds = state.guilds.read().await;
    let guild = guilds.get(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    // Resolution runs over a consistent snapshot of the store, the same
    // shape the synchronization adapter delivers.
    let snapshot = guild.snapshot();
    let channel = snapshot.channel(channel_id).ok_or(ApiFailure::NotFound)?;
    let member = snapshot.member(user).ok_or(ApiFailure::NotFound)?;
    let resolved = snapshot.resolve_member(member, channel);

    Ok(Json(ResolvedPermissionsResponse {
        user_id: user.to_string(),
        permissions: permission_set_to_list(resolved),
    }))
}

pub(crate) async fn channel_permission_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, channel_id, user_id, permission)): Path<(String, String, String, String)>,
) -> Result<Json<PermissionCheckResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let channel_id = ChannelId::try_from(channel_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let user = UserId::try_from(user_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let permission =
        Permission::try_from(permission.as_str()).map_err(|_| ApiFailure::UnknownPermission)?;

    let guilds = state.guilds.read().await;
    let guild = guilds.get(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let snapshot = guild.snapshot();
    let channel = snapshot.channel(channel_id).ok_or(ApiFailure::NotFound)?;
    let member = snapshot.member(user).ok_or(ApiFailure::NotFound)?;
    let granted = snapshot.member_has(member, channel, permission);

    Ok(Json(PermissionCheckResponse {
        permission: permission.as_str().to_owned(),
        granted,
    }))
}
