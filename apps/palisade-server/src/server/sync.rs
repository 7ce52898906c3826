use std::collections::{HashMap, HashSet};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use palisade_core::{
    Category, CategoryId, CategoryName, Channel, ChannelId, ChannelKind, ChannelName, Permission,
    PermissionOverwrite, PermissionSet, Role, RoleColor, RoleId, RoleName, SystemRole, UserId,
};
use palisade_protocol::{
    parse_envelope, CategoryDto, ChannelDto, ChannelKindDto, MemberDto, OverwriteDto,
    OverwriteTargetDto, RoleDto, SyncEvent, SystemRoleDto,
};

use super::{
    core::{AppState, GuildRecord},
    errors::ApiFailure,
    types::SyncAppliedResponse,
};

/// Shared-secret header the synchronization adapter presents. The adapter
/// is a trusted internal collaborator; the token only keeps the ingestion
/// surface off the public request path.
pub(crate) const SYNC_TOKEN_HEADER: &str = "x-sync-token";

pub(crate) async fn apply_sync_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(guild_id): Path<String>,
    body: Bytes,
) -> Result<Json<SyncAppliedResponse>, ApiFailure> {
    let Some(expected) = state.runtime.sync_ingest_token.as_deref() else {
        // Ingestion surface is not mounted for this deployment.
        return Err(ApiFailure::NotFound);
    };
    let provided = headers
        .get(SYNC_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiFailure::Unauthorized)?;
    if provided != expected {
        return Err(ApiFailure::Forbidden {
            reason: String::from("sync token mismatch"),
        });
    }

    let envelope = parse_envelope(&body).map_err(|error| ApiFailure::InvalidSync {
        reason: error.to_string(),
    })?;
    let event = SyncEvent::from_envelope(&envelope).map_err(|error| ApiFailure::InvalidSync {
        reason: error.to_string(),
    })?;
    let applied = event.event_type();

    let mut guilds = state.guilds.write().await;
    let guild = guilds.get_mut(&guild_id).ok_or(ApiFailure::NotFound)?;
    apply_to_guild(guild, event)?;
    tracing::info!(event = "sync.apply", outcome = "applied", guild_id = %guild_id, sync_event = applied);

    Ok(Json(SyncAppliedResponse { applied }))
}

fn apply_to_guild(guild: &mut GuildRecord, event: SyncEvent) -> Result<(), ApiFailure> {
    match event {
        SyncEvent::RoleUpsert(dto) => {
            let role = role_from_dto(dto)?;
            guild.roles.insert(role.id, role);
        }
        SyncEvent::RoleDelete(dto) => {
            let role_id = parse_role_id(&dto.role_id)?;
            guild.remove_role_everywhere(role_id);
        }
        SyncEvent::RolePositions(dto) => {
            // The assignment is applied as one unit; entries for roles
            // this replica no longer has are skipped.
            let mut assignment = Vec::with_capacity(dto.positions.len());
            for entry in dto.positions {
                assignment.push((parse_role_id(&entry.role_id)?, entry.position));
            }
            for (role_id, position) in assignment {
                if let Some(role) = guild.roles.get_mut(&role_id) {
                    role.position = position;
                }
            }
        }
        SyncEvent::ChannelUpsert(dto) => {
            let channel = channel_from_dto(dto)?;
            guild.channels.insert(channel.id, channel);
        }
        SyncEvent::ChannelDelete(dto) => {
            let channel_id = parse_channel_id(&dto.channel_id)?;
            guild.channels.remove(&channel_id);
        }
        SyncEvent::CategoryUpsert(dto) => {
            let category = category_from_dto(dto)?;
            guild.categories.insert(category.id, category);
        }
        SyncEvent::CategoryDelete(dto) => {
            let category_id = parse_category_id(&dto.category_id)?;
            guild.categories.remove(&category_id);
            for channel in guild.channels.values_mut() {
                if channel.category_id == Some(category_id) {
                    channel.category_id = None;
                }
            }
        }
        SyncEvent::OverwriteSet(dto) => {
            let overwrite = overwrite_from_dto(&dto.overwrite)?;
            match dto.target {
                OverwriteTargetDto::Channel { channel_id } => {
                    let channel_id = parse_channel_id(&channel_id)?;
                    let Some(channel) = guild.channels.get_mut(&channel_id) else {
                        tracing::warn!(event = "sync.apply", outcome = "skipped", reason = "unknown channel");
                        return Ok(());
                    };
                    upsert_overwrite(&mut channel.overwrites, overwrite);
                }
                OverwriteTargetDto::Category { category_id } => {
                    let category_id = parse_category_id(&category_id)?;
                    let Some(category) = guild.categories.get_mut(&category_id) else {
                        tracing::warn!(event = "sync.apply", outcome = "skipped", reason = "unknown category");
                        return Ok(());
                    };
                    upsert_overwrite(&mut category.overwrites, overwrite);
                }
            }
        }
        SyncEvent::OverwriteClear(dto) => {
            let role_id = parse_role_id(&dto.role_id)?;
            match dto.target {
                OverwriteTargetDto::Channel { channel_id } => {
                    let channel_id = parse_channel_id(&channel_id)?;
                    if let Some(channel) = guild.channels.get_mut(&channel_id) {
                        channel
                            .overwrites
                            .retain(|overwrite| overwrite.role_id != role_id);
                    }
                }
                OverwriteTargetDto::Category { category_id } => {
                    let category_id = parse_category_id(&category_id)?;
                    if let Some(category) = guild.categories.get_mut(&category_id) {
                        category
                            .overwrites
                            .retain(|overwrite| overwrite.role_id != role_id);
                    }
                }
            }
        }
        SyncEvent::MemberRoles(dto) => {
            let (user_id, role_ids) = member_entry_from_dto(&dto)?;
            guild.members.insert(user_id, role_ids);
        }
        SyncEvent::OwnerChanged(dto) => {
            let owner_id = parse_user_id(&dto.owner_id)?;
            guild.owner_id = owner_id;
            guild.members.entry(owner_id).or_default();
        }
        SyncEvent::SnapshotReset(dto) => {
            let mut roles = HashMap::new();
            for role_dto in dto.roles {
                let role = role_from_dto(role_dto)?;
                roles.insert(role.id, role);
            }
            let mut categories = HashMap::new();
            for category_dto in dto.categories {
                let category = category_from_dto(category_dto)?;
                categories.insert(category.id, category);
            }
            let mut channels = HashMap::new();
            for channel_dto in dto.channels {
                let channel = channel_from_dto(channel_dto)?;
                channels.insert(channel.id, channel);
            }
            let mut members = HashMap::new();
            for member_dto in &dto.members {
                let (user_id, role_ids) = member_entry_from_dto(member_dto)?;
                members.insert(user_id, role_ids);
            }

            guild.owner_id = parse_user_id(&dto.owner_id)?;
            guild.roles = roles;
            guild.categories = categories;
            guild.channels = channels;
            guild.members = members;
            guild.members.entry(guild.owner_id).or_default();
        }
    }

    Ok(())
}

fn upsert_overwrite(overwrites: &mut Vec<PermissionOverwrite>, overwrite: PermissionOverwrite) {
    overwrites.retain(|existing| existing.role_id != overwrite.role_id);
    if !overwrite.is_noop() {
        overwrites.push(overwrite);
    }
}

fn sync_invalid(reason: &str) -> ApiFailure {
    ApiFailure::InvalidSync {
        reason: String::from(reason),
    }
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiFailure> {
    UserId::try_from(raw.to_owned()).map_err(|_| sync_invalid("malformed user id"))
}

fn parse_role_id(raw: &str) -> Result<RoleId, ApiFailure> {
    RoleId::try_from(raw.to_owned()).map_err(|_| sync_invalid("malformed role id"))
}

fn parse_channel_id(raw: &str) -> Result<ChannelId, ApiFailure> {
    ChannelId::try_from(raw.to_owned()).map_err(|_| sync_invalid("malformed channel id"))
}

fn parse_category_id(raw: &str) -> Result<CategoryId, ApiFailure> {
    CategoryId::try_from(raw.to_owned()).map_err(|_| sync_invalid("malformed category id"))
}

/// Capability names the catalog does not know are dropped, mirroring how
/// unknown bits are masked out of numeric snapshots.
fn permission_set_from_wire(names: &[String]) -> PermissionSet {
    names
        .iter()
        .filter_map(|name| Permission::try_from(name.as_str()).ok())
        .collect()
}

const fn system_from_dto(system: Option<SystemRoleDto>) -> Option<SystemRole> {
    match system {
        Some(SystemRoleDto::Everyone) => Some(SystemRole::Everyone),
        Some(SystemRoleDto::Owner) => Some(SystemRole::Owner),
        None => None,
    }
}

fn role_from_dto(dto: RoleDto) -> Result<Role, ApiFailure> {
    Ok(Role {
        id: parse_role_id(&dto.role_id)?,
        name: RoleName::try_from(dto.name).map_err(|_| sync_invalid("malformed role name"))?,
        color: dto
            .color
            .map(RoleColor::try_from)
            .transpose()
            .map_err(|_| sync_invalid("role color out of range"))?,
        permissions: permission_set_from_wire(&dto.permissions),
        position: dto.position,
        mentionable: dto.mentionable,
        system: system_from_dto(dto.system),
    })
}

fn overwrite_from_dto(dto: &OverwriteDto) -> Result<PermissionOverwrite, ApiFailure> {
    Ok(PermissionOverwrite::new(
        parse_role_id(&dto.role_id)?,
        permission_set_from_wire(&dto.allow),
        permission_set_from_wire(&dto.deny),
    ))
}

fn channel_from_dto(dto: ChannelDto) -> Result<Channel, ApiFailure> {
    let mut overwrites = Vec::with_capacity(dto.overwrites.len());
    for overwrite in &dto.overwrites {
        let overwrite = overwrite_from_dto(overwrite)?;
        if !overwrite.is_noop() {
            overwrites.push(overwrite);
        }
    }

    Ok(Channel {
        id: parse_channel_id(&dto.channel_id)?,
        name: ChannelName::try_from(dto.name)
            .map_err(|_| sync_invalid("malformed channel name"))?,
        kind: match dto.kind {
            ChannelKindDto::Text => ChannelKind::Text,
            ChannelKindDto::Voice => ChannelKind::Voice,
        },
        category_id: dto
            .category_id
            .as_deref()
            .map(|raw| parse_category_id(raw))
            .transpose()?,
        overwrites,
        position: dto.position,
    })
}

fn category_from_dto(dto: CategoryDto) -> Result<Category, ApiFailure> {
    let mut overwrites = Vec::with_capacity(dto.overwrites.len());
    for overwrite in &dto.overwrites {
        let overwrite = overwrite_from_dto(overwrite)?;
        if !overwrite.is_noop() {
            overwrites.push(overwrite);
        }
    }

    Ok(Category {
        id: parse_category_id(&dto.category_id)?,
        name: CategoryName::try_from(dto.name)
            .map_err(|_| sync_invalid("malformed category name"))?,
        overwrites,
        position: dto.position,
    })
}

fn member_entry_from_dto(dto: &MemberDto) -> Result<(UserId, HashSet<RoleId>), ApiFailure> {
    let user_id = parse_user_id(&dto.user_id)?;
    let mut role_ids = HashSet::with_capacity(dto.role_ids.len());
    for raw in &dto.role_ids {
        role_ids.insert(parse_role_id(raw)?);
    }
    Ok((user_id, role_ids))
}

#[cfg(test)]
mod tests {
    use palisade_core::{GuildName, Permission, UserId};
    use palisade_protocol::{
        MemberDto, OverwriteDto, OverwriteTargetDto, RoleDto, RolePositionDto, RolePositionsDto,
        SyncEvent,
    };

    use super::{apply_to_guild, permission_set_from_wire, role_from_dto};
    use crate::server::core::GuildRecord;

    fn record() -> GuildRecord {
        GuildRecord::new(
            GuildName::try_from(String::from("replica")).unwrap(),
            UserId::new(),
        )
    }

    fn role_dto(role_id: &str, position: i32, permissions: &[&str]) -> RoleDto {
        RoleDto {
            role_id: String::from(role_id),
            name: String::from("synced"),
            color: None,
            permissions: permissions.iter().map(|p| String::from(*p)).collect(),
            position,
            mentionable: false,
            system: None,
        }
    }

    #[test]
    fn unknown_capability_names_are_dropped_like_unknown_bits() {
        let set = permission_set_from_wire(&[
            String::from("send_messages"),
            String::from("not_a_permission"),
        ]);
        assert!(set.contains(Permission::SendMessages));
        assert_eq!(set.iter().count(), 1);
    }

    #[test]
    fn malformed_ids_are_rejected_not_applied() {
        assert!(role_from_dto(role_dto("not-a-ulid", 1, &[])).is_err());

        let mut guild = record();
        let event = SyncEvent::MemberRoles(MemberDto {
            user_id: String::from("not-a-ulid"),
            role_ids: Vec::new(),
        });
        assert!(apply_to_guild(&mut guild, event).is_err());
    }

    #[test]
    fn role_upsert_and_positions_apply_to_the_store() {
        let mut guild = record();
        let role_id = palisade_core::RoleId::new().to_string();

        let upsert = SyncEvent::RoleUpsert(role_dto(&role_id, 3, &["manage_messages"]));
        apply_to_guild(&mut guild, upsert).unwrap();
        assert_eq!(guild.roles.len(), 2);

        let reorder = SyncEvent::RolePositions(RolePositionsDto {
            positions: vec![RolePositionDto {
                role_id: role_id.clone(),
                position: 9,
            }],
        });
        apply_to_guild(&mut guild, reorder).unwrap();
        let parsed = palisade_core::RoleId::try_from(role_id).unwrap();
        assert_eq!(guild.roles[&parsed].position, 9);
    }

    #[test]
    fn overwrite_set_on_an_unknown_container_is_skipped() {
        let mut guild = record();
        let event = SyncEvent::OverwriteSet(palisade_protocol::OverwriteSetDto {
            target: OverwriteTargetDto::Channel {
                channel_id: palisade_core::ChannelId::new().to_string(),
            },
            overwrite: OverwriteDto {
                role_id: palisade_core::RoleId::new().to_string(),
                allow: vec![String::from("send_messages")],
                deny: Vec::new(),
            },
        });

        apply_to_guild(&mut guild, event).unwrap();
        assert!(guild.channels.is_empty());
    }

    #[test]
    fn owner_change_keeps_the_new_owner_a_member() {
        let mut guild = record();
        let new_owner = UserId::new();
        let event = SyncEvent::OwnerChanged(palisade_protocol::OwnerChangedDto {
            owner_id: new_owner.to_string(),
        });

        apply_to_guild(&mut guild, event).unwrap();
        assert_eq!(guild.owner_id, new_owner);
        assert!(guild.is_member(new_owner));
    }
}
