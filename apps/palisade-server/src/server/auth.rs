use axum::http::HeaderMap;
use palisade_core::UserId;

use super::errors::ApiFailure;

/// Header carrying the authenticated user id. Identity is established by
/// the fronting auth layer; this service trusts the forwarded id and only
/// decides what that user may do.
pub(crate) const ACTING_USER_HEADER: &str = "x-acting-user";

pub(crate) fn acting_user(headers: &HeaderMap) -> Result<UserId, ApiFailure> {
    let raw = headers
        .get(ACTING_USER_HEADER)
        .ok_or(ApiFailure::Unauthorized)?
        .to_str()
        .map_err(|_| ApiFailure::Unauthorized)?;
    UserId::try_from(raw.to_owned()).map_err(|_| ApiFailure::Unauthorized)
}
