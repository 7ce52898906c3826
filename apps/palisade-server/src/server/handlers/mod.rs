pub(crate) mod channels;
pub(crate) mod guilds;
pub(crate) mod queries;
pub(crate) mod roles;

use palisade_core::{MutationDenied, UserId};

use super::{core::GuildRecord, errors::ApiFailure};

/// Map a guard denial to the HTTP verdict, logging the reason the caller
/// will see.
pub(crate) fn guard_denied(event: &'static str, denial: &MutationDenied) -> ApiFailure {
    tracing::warn!(event = event, outcome = "denied", reason = %denial);
    ApiFailure::Forbidden {
        reason: denial.to_string(),
    }
}

pub(crate) fn require_member(guild: &GuildRecord, user_id: UserId) -> Result<(), ApiFailure> {
    if guild.is_member(user_id) {
        return Ok(());
    }
    Err(ApiFailure::Forbidden {
        reason: String::from("not a member of this guild"),
    })
}
