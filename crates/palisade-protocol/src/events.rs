use serde::{Deserialize, Serialize};

use crate::{Envelope, EventType, ProtocolError, SYNC_PROTOCOL_VERSION};

pub const EVENT_ROLE_UPSERT: &str = "role.upsert";
pub const EVENT_ROLE_DELETE: &str = "role.delete";
pub const EVENT_ROLE_POSITIONS: &str = "role.positions";
pub const EVENT_CHANNEL_UPSERT: &str = "channel.upsert";
pub const EVENT_CHANNEL_DELETE: &str = "channel.delete";
pub const EVENT_CATEGORY_UPSERT: &str = "category.upsert";
pub const EVENT_CATEGORY_DELETE: &str = "category.delete";
pub const EVENT_OVERWRITE_SET: &str = "overwrite.set";
pub const EVENT_OVERWRITE_CLEAR: &str = "overwrite.clear";
pub const EVENT_MEMBER_ROLES: &str = "member.roles";
pub const EVENT_OWNER_CHANGED: &str = "owner.changed";
pub const EVENT_SNAPSHOT_RESET: &str = "snapshot.reset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRoleDto {
    Everyone,
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKindDto {
    Text,
    Voice,
}

/// Wire shape of a role. Ids travel as strings; permission sets travel as
/// stable snake_case capability ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleDto {
    pub role_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    pub permissions: Vec<String>,
    pub position: i32,
    pub mentionable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemRoleDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverwriteDto {
    pub role_id: String,
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelDto {
    pub channel_id: String,
    pub name: String,
    pub kind: ChannelKindDto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub position: i32,
    #[serde(default)]
    pub overwrites: Vec<OverwriteDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryDto {
    pub category_id: String,
    pub name: String,
    pub position: i32,
    #[serde(default)]
    pub overwrites: Vec<OverwriteDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberDto {
    pub user_id: String,
    pub role_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RolePositionDto {
    pub role_id: String,
    pub position: i32,
}

/// Atomic reorder: the full position assignment for every non-floor role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RolePositionsDto {
    pub positions: Vec<RolePositionDto>,
}

/// Which container an overwrite is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverwriteTargetDto {
    Channel { channel_id: String },
    Category { category_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverwriteSetDto {
    pub target: OverwriteTargetDto,
    pub overwrite: OverwriteDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverwriteClearDto {
    pub target: OverwriteTargetDto,
    pub role_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OwnerChangedDto {
    pub owner_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleRefDto {
    pub role_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelRefDto {
    pub channel_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryRefDto {
    pub category_id: String,
}

/// Full consistent snapshot of a guild's permission-relevant state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotDto {
    pub owner_id: String,
    pub roles: Vec<RoleDto>,
    pub categories: Vec<CategoryDto>,
    pub channels: Vec<ChannelDto>,
    pub members: Vec<MemberDto>,
}

/// A change notification from the synchronization adapter. Consumers apply
/// the event to their snapshot and re-resolve on the next query; events
/// carry no decisions, only data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    RoleUpsert(RoleDto),
    RoleDelete(RoleRefDto),
    RolePositions(RolePositionsDto),
    ChannelUpsert(ChannelDto),
    ChannelDelete(ChannelRefDto),
    CategoryUpsert(CategoryDto),
    CategoryDelete(CategoryRefDto),
    OverwriteSet(OverwriteSetDto),
    OverwriteClear(OverwriteClearDto),
    MemberRoles(MemberDto),
    OwnerChanged(OwnerChangedDto),
    SnapshotReset(Box<SnapshotDto>),
}

impl SyncEvent {
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RoleUpsert(_) => EVENT_ROLE_UPSERT,
            Self::RoleDelete(_) => EVENT_ROLE_DELETE,
            Self::RolePositions(_) => EVENT_ROLE_POSITIONS,
            Self::ChannelUpsert(_) => EVENT_CHANNEL_UPSERT,
            Self::ChannelDelete(_) => EVENT_CHANNEL_DELETE,
            Self::CategoryUpsert(_) => EVENT_CATEGORY_UPSERT,
            Self::CategoryDelete(_) => EVENT_CATEGORY_DELETE,
            Self::OverwriteSet(_) => EVENT_OVERWRITE_SET,
            Self::OverwriteClear(_) => EVENT_OVERWRITE_CLEAR,
            Self::MemberRoles(_) => EVENT_MEMBER_ROLES,
            Self::OwnerChanged(_) => EVENT_OWNER_CHANGED,
            Self::SnapshotReset(_) => EVENT_SNAPSHOT_RESET,
        }
    }

    /// Decode a parsed envelope into a typed event.
    ///
    /// # Errors
    /// Returns [`ProtocolError::UnknownEventType`] for an event type this
    /// protocol version does not define, or
    /// [`ProtocolError::InvalidPayload`] when `d` does not match the
    /// event's schema.
    pub fn from_envelope(envelope: &Envelope<serde_json::Value>) -> Result<Self, ProtocolError> {
        fn decode<T: serde::de::DeserializeOwned>(
            event_type: &str,
            payload: &serde_json::Value,
        ) -> Result<T, ProtocolError> {
            serde_json::from_value(payload.clone()).map_err(|_| ProtocolError::InvalidPayload {
                event_type: event_type.to_owned(),
            })
        }

        let event_type = envelope.t.as_str();
        match event_type {
            EVENT_ROLE_UPSERT => Ok(Self::RoleUpsert(decode(event_type, &envelope.d)?)),
            EVENT_ROLE_DELETE => Ok(Self::RoleDelete(decode(event_type, &envelope.d)?)),
            EVENT_ROLE_POSITIONS => Ok(Self::RolePositions(decode(event_type, &envelope.d)?)),
            EVENT_CHANNEL_UPSERT => Ok(Self::ChannelUpsert(decode(event_type, &envelope.d)?)),
            EVENT_CHANNEL_DELETE => Ok(Self::ChannelDelete(decode(event_type, &envelope.d)?)),
            EVENT_CATEGORY_UPSERT => Ok(Self::CategoryUpsert(decode(event_type, &envelope.d)?)),
            EVENT_CATEGORY_DELETE => Ok(Self::CategoryDelete(decode(event_type, &envelope.d)?)),
            EVENT_OVERWRITE_SET => Ok(Self::OverwriteSet(decode(event_type, &envelope.d)?)),
            EVENT_OVERWRITE_CLEAR => Ok(Self::OverwriteClear(decode(event_type, &envelope.d)?)),
            EVENT_MEMBER_ROLES => Ok(Self::MemberRoles(decode(event_type, &envelope.d)?)),
            EVENT_OWNER_CHANGED => Ok(Self::OwnerChanged(decode(event_type, &envelope.d)?)),
            EVENT_SNAPSHOT_RESET => Ok(Self::SnapshotReset(Box::new(decode(
                event_type,
                &envelope.d,
            )?))),
            other => Err(ProtocolError::UnknownEventType(other.to_owned())),
        }
    }

    /// Wrap this event in a versioned envelope.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidJson`] if the payload cannot be
    /// serialized, which indicates a bug in the event definitions.
    pub fn into_envelope(self) -> Result<Envelope<serde_json::Value>, ProtocolError> {
        let event_type = EventType::try_from(String::from(self.event_type()))?;
        let d = match self {
            Self::RoleUpsert(dto) => serde_json::to_value(dto)?,
            Self::RoleDelete(dto) => serde_json::to_value(dto)?,
            Self::RolePositions(dto) => serde_json::to_value(dto)?,
            Self::ChannelUpsert(dto) => serde_json::to_value(dto)?,
            Self::ChannelDelete(dto) => serde_json::to_value(dto)?,
            Self::CategoryUpsert(dto) => serde_json::to_value(dto)?,
            Self::CategoryDelete(dto) => serde_json::to_value(dto)?,
            Self::OverwriteSet(dto) => serde_json::to_value(dto)?,
            Self::OverwriteClear(dto) => serde_json::to_value(dto)?,
            Self::MemberRoles(dto) => serde_json::to_value(dto)?,
            Self::OwnerChanged(dto) => serde_json::to_value(dto)?,
            Self::SnapshotReset(dto) => serde_json::to_value(*dto)?,
        };

        Ok(Envelope {
            v: SYNC_PROTOCOL_VERSION,
            t: event_type,
            d,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        OverwriteClearDto, OverwriteTargetDto, RoleDto, SyncEvent, SystemRoleDto,
        EVENT_ROLE_UPSERT,
    };
    use crate::{parse_envelope, validate_event_type, Envelope, EventType, ProtocolError};

    fn sample_role() -> RoleDto {
        RoleDto {
            role_id: String::from("01ARZ3NDEKTSV4RRFFQ69G5FAV"),
            name: String::from("moderator"),
            color: Some(0x00AA_33CC),
            permissions: vec![String::from("manage_messages"), String::from("mute_members")],
            position: 2,
            mentionable: true,
            system: None,
        }
    }

    #[test]
    fn every_event_type_passes_identifier_validation() {
        for event_type in [
            super::EVENT_ROLE_UPSERT,
            super::EVENT_ROLE_DELETE,
            super::EVENT_ROLE_POSITIONS,
            super::EVENT_CHANNEL_UPSERT,
            super::EVENT_CHANNEL_DELETE,
            super::EVENT_CATEGORY_UPSERT,
            super::EVENT_CATEGORY_DELETE,
            super::EVENT_OVERWRITE_SET,
            super::EVENT_OVERWRITE_CLEAR,
            super::EVENT_MEMBER_ROLES,
            super::EVENT_OWNER_CHANGED,
            super::EVENT_SNAPSHOT_RESET,
        ] {
            assert!(validate_event_type(event_type).is_ok(), "{event_type}");
        }
    }

    #[test]
    fn role_upsert_round_trips_through_the_envelope() {
        let event = SyncEvent::RoleUpsert(sample_role());
        let envelope = event.clone().into_envelope().unwrap();
        assert_eq!(envelope.t.as_str(), EVENT_ROLE_UPSERT);

        let bytes = serde_json::to_vec(&envelope).unwrap();
        let parsed = parse_envelope(&bytes).unwrap();
        let decoded = SyncEvent::from_envelope(&parsed).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn overwrite_clear_target_is_tagged_by_kind() {
        let event = SyncEvent::OverwriteClear(OverwriteClearDto {
            target: OverwriteTargetDto::Category {
                category_id: String::from("01ARZ3NDEKTSV4RRFFQ69G5FAV"),
            },
            role_id: String::from("01BX5ZZKBKACTAV9WEVGEMMVRZ"),
        });

        let envelope = event.into_envelope().unwrap();
        assert_eq!(envelope.d["target"]["kind"], "category");
    }

    #[test]
    fn unknown_event_type_is_rejected_by_name() {
        let envelope = Envelope {
            v: 1,
            t: EventType::try_from(String::from("message.create")).unwrap(),
            d: serde_json::json!({}),
        };
        assert_eq!(
            SyncEvent::from_envelope(&envelope).unwrap_err(),
            ProtocolError::UnknownEventType(String::from("message.create"))
        );
    }

    #[test]
    fn mismatched_payload_is_rejected_with_the_event_name() {
        let envelope = Envelope {
            v: 1,
            t: EventType::try_from(String::from(EVENT_ROLE_UPSERT)).unwrap(),
            d: serde_json::json!({"role_id": 7}),
        };
        assert_eq!(
            SyncEvent::from_envelope(&envelope).unwrap_err(),
            ProtocolError::InvalidPayload {
                event_type: String::from(EVENT_ROLE_UPSERT),
            }
        );
    }

    #[test]
    fn system_role_markers_use_stable_names() {
        let everyone = serde_json::to_value(SystemRoleDto::Everyone).unwrap();
        let owner = serde_json::to_value(SystemRoleDto::Owner).unwrap();
        assert_eq!(everyone, "everyone");
        assert_eq!(owner, "owner");
    }
}
