use axum::Json;
use palisade_core::{
    Category, CatalogEntry, Channel, Permission, PermissionOverwrite, PermissionSet, Role,
    SystemRole,
};
use serde::{Deserialize, Serialize};

use super::errors::ApiFailure;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiError {
    pub(crate) error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateGuildRequest {
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GuildResponse {
    pub(crate) guild_id: String,
    pub(crate) name: String,
    pub(crate) owner_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateRoleRequest {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) color: Option<u32>,
    #[serde(default)]
    pub(crate) permissions: Vec<String>,
    #[serde(default)]
    pub(crate) mentionable: bool,
    #[serde(default)]
    pub(crate) position: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpdateRoleRequest {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) color: Option<u32>,
    #[serde(default)]
    pub(crate) permissions: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) mentionable: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReorderRolesRequest {
    pub(crate) role_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoleResponse {
    pub(crate) role_id: String,
    pub(crate) name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) color: Option<u32>,
    pub(crate) permissions: Vec<String>,
    pub(crate) position: i32,
    pub(crate) mentionable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoleListResponse {
    pub(crate) roles: Vec<RoleResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MemberRolesResponse {
    pub(crate) user_id: String,
    pub(crate) role_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateCategoryRequest {
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateChannelRequest {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) kind: Option<String>,
    #[serde(default)]
    pub(crate) category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SetOverwriteRequest {
    #[serde(default)]
    pub(crate) allow: Vec<String>,
    #[serde(default)]
    pub(crate) deny: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OverwriteResponse {
    pub(crate) role_id: String,
    pub(crate) allow: Vec<String>,
    pub(crate) deny: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChannelResponse {
    pub(crate) channel_id: String,
    pub(crate) name: String,
    pub(crate) kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) category_id: Option<String>,
    pub(crate) position: i32,
    pub(crate) overwrites: Vec<OverwriteResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChannelListResponse {
    pub(crate) channels: Vec<ChannelResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryResponse {
    pub(crate) category_id: String,
    pub(crate) name: String,
    pub(crate) position: i32,
    pub(crate) overwrites: Vec<OverwriteResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryListResponse {
    pub(crate) categories: Vec<CategoryResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResolvedPermissionsResponse {
    pub(crate) user_id: String,
    pub(crate) permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PermissionCheckResponse {
    pub(crate) permission: String,
    pub(crate) granted: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CatalogResponse {
    pub(crate) permissions: Vec<CatalogEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SyncAppliedResponse {
    pub(crate) applied: &'static str,
}

pub(crate) fn permission_set_from_list(names: &[String]) -> Result<PermissionSet, ApiFailure> {
    let mut set = PermissionSet::empty();
    for name in names {
        let permission =
            Permission::try_from(name.as_str()).map_err(|_| ApiFailure::UnknownPermission)?;
        set.insert(permission);
    }
    Ok(set)
}

pub(crate) fn permission_set_to_list(set: PermissionSet) -> Vec<String> {
    set.iter()
        .map(|permission| permission.as_str().to_owned())
        .collect()
}

pub(crate) const fn system_role_label(system: SystemRole) -> &'static str {
    match system {
        SystemRole::Everyone => "everyone",
        SystemRole::Owner => "owner",
    }
}

pub(crate) fn role_response(role: &Role) -> RoleResponse {
    RoleResponse {
        role_id: role.id.to_string(),
        name: role.name.as_str().to_owned(),
        color: role.color.map(palisade_core::RoleColor::as_u32),
        permissions: permission_set_to_list(role.permissions),
        position: role.position,
        mentionable: role.mentionable,
        system: role.system.map(system_role_label),
    }
}

pub(crate) fn overwrite_response(overwrite: &PermissionOverwrite) -> OverwriteResponse {
    OverwriteResponse {
        role_id: overwrite.role_id.to_string(),
        allow: permission_set_to_list(overwrite.allow),
        deny: permission_set_to_list(overwrite.deny),
    }
}

pub(crate) fn channel_response(channel: &Channel) -> ChannelResponse {
    ChannelResponse {
        channel_id: channel.id.to_string(),
        name: channel.name.as_str().to_owned(),
        kind: channel.kind.as_str(),
        category_id: channel.category_id.map(|id| id.to_string()),
        position: channel.position,
        overwrites: channel.overwrites.iter().map(overwrite_response).collect(),
    }
}

pub(crate) fn category_response(category: &Category) -> CategoryResponse {
    CategoryResponse {
        category_id: category.id.to_string(),
        name: category.name.as_str().to_owned(),
        position: category.position,
        overwrites: category.overwrites.iter().map(overwrite_response).collect(),
    }
}
