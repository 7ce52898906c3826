use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use palisade_core::{
    authorize_mutation, Category, CategoryId, CategoryName, Channel, ChannelId, ChannelKind,
    ChannelName, MutationAction, MutationTarget, PermissionOverwrite, RoleId,
};

use crate::server::{
    auth::acting_user,
    core::AppState,
    errors::ApiFailure,
    handlers::{guard_denied, require_member},
    permissions::{MAX_GUILD_CATEGORIES, MAX_GUILD_CHANNELS},
    types::{
        category_response, channel_response, permission_set_from_list, CategoryListResponse,
        CategoryResponse, ChannelListResponse, ChannelResponse, CreateCategoryRequest,
        CreateChannelRequest, SetOverwriteRequest,
    },
};

pub(crate) async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(guild_id): Path<String>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let name = CategoryName::try_from(payload.name).map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::CreateCategory,
        MutationTarget::Server,
        None,
    )
    .map_err(|denial| guard_denied("category.create", &denial))?;

    if guild.categories.len() >= MAX_GUILD_CATEGORIES {
        return Err(ApiFailure::LimitReached);
    }

    let position = guild
        .categories
        .values()
        .map(|category| category.position)
        .max()
        .map_or(0, |top| top + 1);
    let category = Category {
        id: CategoryId::new(),
        name,
        overwrites: Vec::new(),
        position,
    };
    let response = category_response(&category);
    guild.categories.insert(category.id, category);
    tracing::info!(event = "category.create", outcome = "applied", guild_id = %guild_id, category_id = %response.category_id);

    Ok(Json(response))
}

pub(crate) async fn list_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(guild_id): Path<String>,
) -> Result<Json<CategoryListResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let guilds = state.guilds.read().await;
    let guild = guilds.get(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let mut categories: Vec<&Category> = guild.categories.values().collect();
    categories.sort_by_key(|category| category.position);

    Ok(Json(CategoryListResponse {
        categories: categories.into_iter().map(category_response).collect(),
    }))
}

pub(crate) async fn delete_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, category_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiFailure> {
    let actor = acting_user(&headers)?;
    let category_id = CategoryId::try_from(category_id).map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let category = guild
        .categories
        .get(&category_id)
        .cloned()
        .ok_or(ApiFailure::NotFound)?;
    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::DeleteCategory,
        MutationTarget::Category(&category),
        None,
    )
    .map_err(|denial| guard_denied("category.delete", &denial))?;

    guild.categories.remove(&category_id);
    // Member channels fall back to "no category layer".
    for channel in guild.channels.values_mut() {
        if channel.category_id == Some(category_id) {
            channel.category_id = None;
        }
    }
    tracing::info!(event = "category.delete", outcome = "applied", guild_id = %guild_id, category_id = %category_id);

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn set_category_overwrite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, category_id, role_id)): Path<(String, String, String)>,
    Json(payload): Json<SetOverwriteRequest>,
) -> Result<Json<CategoryResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let category_id = CategoryId::try_from(category_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let role_id = RoleId::try_from(role_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let allow = permission_set_from_list(&payload.allow)?;
    let deny = permission_set_from_list(&payload.deny)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let category = guild
        .categories
        .get(&category_id)
        .cloned()
        .ok_or(ApiFailure::NotFound)?;
    if !guild.roles.contains_key(&role_id) {
        return Err(ApiFailure::NotFound);
    }

    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::EditCategoryOverwrite,
        MutationTarget::Category(&category),
        Some(allow),
    )
    .map_err(|denial| guard_denied("category.overwrite", &denial))?;

    let overwrite = PermissionOverwrite::new(role_id, allow, deny);
    let category = guild
        .categories
        .get_mut(&category_id)
        .ok_or(ApiFailure::NotFound)?;
    category
        .overwrites
        .retain(|existing| existing.role_id != role_id);
    if !overwrite.is_noop() {
        category.overwrites.push(overwrite);
    }
    tracing::info!(event = "category.overwrite", outcome = "applied", guild_id = %guild_id, category_id = %category_id, role_id = %role_id);

    Ok(Json(category_response(category)))
}

pub(crate) async fn clear_category_overwrite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, category_id, role_id)): Path<(String, String, String)>,
) -> Result<Json<CategoryResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let category_id = CategoryId::try_from(category_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let role_id = RoleId::try_from(role_id).map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let category = guild
        .categories
        .get(&category_id)
        .cloned()
        .ok_or(ApiFailure::NotFound)?;
    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::EditCategoryOverwrite,
        MutationTarget::Category(&category),
        None,
    )
    .map_err(|denial| guard_denied("category.overwrite", &denial))?;

    let category = guild
        .categories
        .get_mut(&category_id)
        .ok_or(ApiFailure::NotFound)?;
    category
        .overwrites
        .retain(|existing| existing.role_id != role_id);

    Ok(Json(category_response(category)))
}

pub(crate) async fn create_channel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(guild_id): Path<String>,
    Json(payload): Json<CreateChannelRequest>,
) -> Result<Json<ChannelResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let name = ChannelName::try_from(payload.name).map_err(|_| ApiFailure::InvalidRequest)?;
    let kind = payload
        .kind
        .map(ChannelKind::try_from)
        .transpose()
        .map_err(|_| ApiFailure::InvalidRequest)?
        .unwrap_or(ChannelKind::Text);
    let category_id = payload
        .category_id
        .map(CategoryId::try_from)
        .transpose()
        .map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    if let Some(category_id) = category_id {
        if !guild.categories.contains_key(&category_id) {
            return Err(ApiFailure::NotFound);
        }
    }

    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::CreateChannel,
        MutationTarget::Server,
        None,
    )
    .map_err(|denial| guard_denied("channel.create", &denial))?;

    if guild.channels.len() >= MAX_GUILD_CHANNELS {
        return Err(ApiFailure::LimitReached);
    }

    let position = guild
        .channels
        .values()
        .map(|channel| channel.position)
        .max()
        .map_or(0, |top| top + 1);
    let channel = Channel {
        id: ChannelId::new(),
        name,
        kind,
        category_id,
        overwrites: Vec::new(),
        position,
    };
    let response = channel_response(&channel);
    guild.channels.insert(channel.id, channel);
    tracing::info!(event = "channel.create", outcome = "applied", guild_id = %guild_id, channel_id = %response.channel_id);

    Ok(Json(response))
}

pub(crate) async fn list_guild_channels(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(guild_id): Path<String>,
) -> Result<Json<ChannelListResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let guilds = state.guilds.read().await;
    let guild = guilds.get(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let mut channels: Vec<&Channel> = guild.channels.values().collect();
    channels.sort_by_key(|channel| channel.position);

    Ok(Json(ChannelListResponse {
        channels: channels.into_iter().map(channel_response).collect(),
    }))
}

pub(crate) async fn delete_channel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, channel_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiFailure> {
    let actor = acting_user(&headers)?;
    let channel_id = ChannelId::try_from(channel_id).map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let channel = guild
        .channels
        .get(&channel_id)
        .cloned()
        .ok_or(ApiFailure::NotFound)?;
    let category = channel
        .category_id
        .and_then(|id| guild.categories.get(&id))
        .cloned();
    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::DeleteChannel,
        MutationTarget::Channel {
            channel: &channel,
            category: category.as_ref(),
        },
        None,
    )
    .map_err(|denial| guard_denied("channel.delete", &denial))?;

    guild.channels.remove(&channel_id);
    tracing::info!(event = "channel.delete", outcome = "applied", guild_id = %guild_id, channel_id = %channel_id);

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn set_channel_overwrite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, channel_id, role_id)): Path<(String, String, String)>,
    Json(payload): Json<SetOverwriteRequest>,
) -> Result<Json<ChannelResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let channel_id = ChannelId::try_from(channel_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let role_id = RoleId::try_from(role_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let allow = permission_set_from_list(&payload.allow)?;
    let deny = permission_set_from_list(&payload.deny)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let channel = guild
        .channels
        .get(&channel_id)
        .cloned()
        .ok_or(ApiFailure::NotFound)?;
    if !guild.roles.contains_key(&role_id) {
        return Err(ApiFailure::NotFound);
    }
    let category = channel
        .category_id
        .and_then(|id| guild.categories.get(&id))
        .cloned();

    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::EditChannelOverwrite,
        MutationTarget::Channel {
            channel: &channel,
            category: category.as_ref(),
        },
        Some(allow),
    )
    .map_err(|denial| guard_denied("channel.overwrite", &denial))?;

    let overwrite = PermissionOverwrite::new(role_id, allow, deny);
    let channel = guild
        .channels
        .get_mut(&channel_id)
        .ok_or(ApiFailure::NotFound)?;
    channel
        .overwrites
        .retain(|existing| existing.role_id != role_id);
    if !overwrite.is_noop() {
        channel.overwrites.push(overwrite);
    }
    tracing::info!(event = "channel.overwrite", outcome = "applied", guild_id = %guild_id, channel_id = %channel_id, role_id = %role_id);

    Ok(Json(channel_response(channel)))
}

pub(crate) async fn clear_channel_overwrite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, channel_id, role_id)): Path<(String, String, String)>,
) -> Result<Json<ChannelResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let channel_id = ChannelId::try_from(channel_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let role_id = RoleId::try_from(role_id).map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let channel = guild
        .channels
        .get(&channel_id)
        .cloned()
        .ok_or(ApiFailure::NotFound)?;
    let category = channel
        .category_id
        .and_then(|id| guild.categories.get(&id))
        .cloned();
    let ctx = guild.actor_context(actor);
    authorize_mutation(
        &ctx,
        MutationAction::EditChannelOverwrite,
        MutationTarget::Channel {
            channel: &channel,
            category: category.as_ref(),
        },
        None,
    )
    .map_err(|denial| guard_denied("channel.overwrite", &denial))?;

    let channel = guild
        .channels
        .get_mut(&channel_id)
        .ok_or(ApiFailure::NotFound)?;
    channel
        .overwrites
        .retain(|existing| existing.role_id != role_id);

    Ok(Json(channel_response(channel)))
}
