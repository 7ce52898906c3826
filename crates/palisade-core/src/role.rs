use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{DomainError, PermissionSet, RoleId, RoleName};

/// Position of the `@everyone` floor role. Every other role sits strictly
/// above it.
pub const EVERYONE_POSITION: i32 = 0;

pub const EVERYONE_ROLE_NAME: &str = "@everyone";

/// Marker for roles the store treats as structural rather than
/// user-defined. `Everyone` is the per-guild floor; `Owner` is the
/// synthetic role some stores surface for the guild owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Everyone,
    Owner,
}

/// A named, colored, ordered capability bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    pub color: Option<RoleColor>,
    pub permissions: PermissionSet,
    pub position: i32,
    pub mentionable: bool,
    pub system: Option<SystemRole>,
}

impl Role {
    #[must_use]
    pub fn is_everyone(&self) -> bool {
        matches!(self.system, Some(SystemRole::Everyone))
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        self.system.is_some()
    }
}

/// 24-bit RGB role color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleColor(u32);

impl RoleColor {
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for RoleColor {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value > 0x00FF_FFFF {
            return Err(DomainError::InvalidColor);
        }
        Ok(Self(value))
    }
}

/// Highest position held across a member's roles. Zero when the member
/// holds nothing beyond the floor.
#[must_use]
pub fn highest_role_position(roles: &[Role]) -> i32 {
    roles
        .iter()
        .map(|role| role.position)
        .max()
        .unwrap_or(EVERYONE_POSITION)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReorderError {
    #[error("role `{0}` is not part of this guild")]
    UnknownRole(RoleId),
    #[error("role `{0}` is listed more than once")]
    DuplicateRole(RoleId),
    #[error("role `{0}` is missing from the requested order")]
    MissingRole(RoleId),
    #[error("the everyone role is pinned to the floor and cannot be reordered")]
    EveryoneListed,
}

/// Plan an atomic re-assignment of role positions.
///
/// `ordered` lists every non-floor role from highest rank to lowest. The
/// returned assignment covers exactly those roles with positions
/// `len..=1`; `@everyone` keeps [`EVERYONE_POSITION`]. Nothing is applied
/// here: the caller swaps in the whole assignment or none of it.
///
/// # Errors
/// Returns [`ReorderError`] when the order references a role the guild
/// does not have, repeats a role, omits one, or lists the floor role.
pub fn plan_role_reorder(
    roles: &[Role],
    ordered: &[RoleId],
) -> Result<Vec<(RoleId, i32)>, ReorderError> {
    let mut remaining: HashSet<RoleId> = roles
        .iter()
        .filter(|role| !role.is_everyone())
        .map(|role| role.id)
        .collect();

    let mut seen = HashSet::new();
    for role_id in ordered {
        if roles
            .iter()
            .any(|role| role.id == *role_id && role.is_everyone())
        {
            return Err(ReorderError::EveryoneListed);
        }
        if !remaining.remove(role_id) {
            if seen.contains(role_id) {
                return Err(ReorderError::DuplicateRole(*role_id));
            }
            return Err(ReorderError::UnknownRole(*role_id));
        }
        seen.insert(*role_id);
    }

    if let Some(missing) = remaining.into_iter().next() {
        return Err(ReorderError::MissingRole(missing));
    }

    Ok(ordered
        .iter()
        .rev()
        .zip(1_i32..)
        .map(|(role_id, position)| (*role_id, position))
        .collect())
}
