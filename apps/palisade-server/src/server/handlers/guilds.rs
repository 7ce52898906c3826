use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use palisade_core::{GuildName, Permission, UserId};
use ulid::Ulid;

use crate::server::{
    auth::acting_user,
    core::{AppState, GuildRecord},
    errors::ApiFailure,
    handlers::require_member,
    types::{CreateGuildRequest, GuildResponse, MemberRolesResponse},
};

pub(crate) async fn create_guild(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateGuildRequest>,
) -> Result<Json<GuildResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let name = GuildName::try_from(payload.name).map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let owned = guilds
        .values()
        .filter(|guild| guild.owner_id == actor)
        .count();
    let limit = state.runtime.max_created_guilds_per_user;
    if owned >= limit {
        tracing::warn!(
            event = "guild.create",
            outcome = "limit_reached",
            user_id = %actor,
            max_created_guilds_per_user = limit,
        );
        return Err(ApiFailure::LimitReached);
    }

    let guild_id = Ulid::new().to_string();
    let record = GuildRecord::new(name, actor);
    let response = GuildResponse {
        guild_id: guild_id.clone(),
        name: record.name.as_str().to_owned(),
        owner_id: actor.to_string(),
    };
    guilds.insert(guild_id.clone(), record);
    tracing::info!(event = "guild.create", outcome = "applied", guild_id = %guild_id);

    Ok(Json(response))
}

/// Membership changes are not role mutations, but they are still gated on
/// a capability so no mutation path skips the permission model.
pub(crate) async fn add_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((guild_id, user_id)): Path<(String, String)>,
) -> Result<Json<MemberRolesResponse>, ApiFailure> {
    let actor = acting_user(&headers)?;
    let user = UserId::try_from(user_id).map_err(|_| ApiFailure::InvalidRequest)?;

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    require_member(guild, actor)?;

    let ctx = guild.actor_context(actor);
    if !ctx.is_owner {
        let base = ctx.base_permissions();
        if !base.contains(Permission::Administrator) && !base.contains(Permission::CreateInvite) {
            tracing::warn!(event = "member.add", outcome = "denied", user_id = %actor);
            return Err(ApiFailure::Forbidden {
                reason: String::from("missing the create_invite permission"),
            });
        }
    }

    let held = guild.members.entry(user).or_default();
    let mut role_ids: Vec<String> = held.iter().map(ToString::to_string).collect();
    role_ids.sort_unstable();

    Ok(Json(MemberRolesResponse {
        user_id: user.to_string(),
        role_ids,
    }))
}
