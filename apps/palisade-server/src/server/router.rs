use anyhow::anyhow;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, StatusCode},
    routing::{delete, get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::{
    core::{AppConfig, AppState},
    handlers::{
        channels::{
            clear_category_overwrite, clear_channel_overwrite, create_category, create_channel,
            delete_category, delete_channel, list_categories, list_guild_channels,
            set_category_overwrite, set_channel_overwrite,
        },
        guilds::{add_member, create_guild},
        queries::{
            catalog_listing, channel_permission_check, channel_permissions_for,
            member_base_permissions,
        },
        roles::{
            assign_guild_role, create_guild_role, delete_guild_role, list_guild_roles,
            reorder_guild_roles, unassign_guild_role, update_guild_role,
        },
    },
    sync::apply_sync_event,
    types::health,
};

/// Build the axum router with the global middleware stack.
///
/// # Errors
/// Returns an error if configured limits are invalid.
pub fn build_router(config: &AppConfig) -> anyhow::Result<Router> {
    if config.max_body_bytes == 0 {
        return Err(anyhow!("request body limit must be at least 1 byte"));
    }
    if config.request_timeout.is_zero() {
        return Err(anyhow!("request timeout must be non-zero"));
    }
    if config.max_created_guilds_per_user == 0 {
        return Err(anyhow!(
            "max created guilds per user must be at least 1 guild"
        ));
    }
    if config
        .sync_ingest_token
        .as_deref()
        .is_some_and(str::is_empty)
    {
        return Err(anyhow!("sync ingest token must not be empty when set"));
    }

    let app_state = AppState::new(config);
    let request_id_header = HeaderName::from_static("x-request-id");

    let routes = Router::new()
        .route("/health", get(health))
        .route("/catalog", get(catalog_listing))
        .route("/guilds", post(create_guild))
        .route("/guilds/{guild_id}/members/{user_id}", post(add_member))
        .route(
            "/guilds/{guild_id}/members/{user_id}/permissions",
            get(member_base_permissions),
        )
        .route(
            "/guilds/{guild_id}/roles",
            get(list_guild_roles).post(create_guild_role),
        )
        .route(
            "/guilds/{guild_id}/roles/reorder",
            post(reorder_guild_roles),
        )
        .route(
            "/guilds/{guild_id}/roles/{role_id}",
            patch(update_guild_role).delete(delete_guild_role),
        )
        .route(
            "/guilds/{guild_id}/roles/{role_id}/members/{user_id}",
            post(assign_guild_role).delete(unassign_guild_role),
        )
        .route(
            "/guilds/{guild_id}/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/guilds/{guild_id}/categories/{category_id}",
            delete(delete_category),
        )
        .route(
            "/guilds/{guild_id}/categories/{category_id}/overwrites/{role_id}",
            put(set_category_overwrite).delete(clear_category_overwrite),
        )
        .route(
            "/guilds/{guild_id}/channels",
            get(list_guild_channels).post(create_channel),
        )
        .route(
            "/guilds/{guild_id}/channels/{channel_id}",
            delete(delete_channel),
        )
        .route(
            "/guilds/{guild_id}/channels/{channel_id}/overwrites/{role_id}",
            put(set_channel_overwrite).delete(clear_channel_overwrite),
        )
        .route(
            "/guilds/{guild_id}/channels/{channel_id}/permissions/{user_id}",
            get(channel_permissions_for),
        )
        .route(
            "/guilds/{guild_id}/channels/{channel_id}/permissions/{user_id}/{permission}",
            get(channel_permission_check),
        )
        .route("/guilds/{guild_id}/sync", post(apply_sync_event));

    Ok(routes
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
                .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    config.request_timeout,
                )),
        ))
}
