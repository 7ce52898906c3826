use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use palisade_server::{build_router, AppConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> axum::Router {
    build_router(&AppConfig::default()).expect("router should build")
}

fn new_user() -> String {
    ulid::Ulid::new().to_string()
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    actor: Option<&str>,
    body: Option<Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("x-acting-user", actor);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");
    app.clone()
        .oneshot(request)
        .await
        .expect("request should execute")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");
    serde_json::from_slice(&bytes).expect("response body should be valid json")
}

struct GuildContext {
    guild_id: String,
    everyone_id: String,
}

async fn create_guild(app: &axum::Router, owner: &str, name: &str) -> GuildContext {
    let response = send(app, "POST", "/guilds", Some(owner), Some(json!({"name": name}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let guild_id = json_body(response).await["guild_id"]
        .as_str()
        .expect("guild id should exist")
        .to_owned();

    let roles_response = send(
        app,
        "GET",
        &format!("/guilds/{guild_id}/roles"),
        Some(owner),
        None,
    )
    .await;
    assert_eq!(roles_response.status(), StatusCode::OK);
    let everyone_id = json_body(roles_response).await["roles"]
        .as_array()
        .expect("roles should be an array")
        .iter()
        .find(|role| role["system"].as_str() == Some("everyone"))
        .and_then(|role| role["role_id"].as_str())
        .expect("everyone role should exist")
        .to_owned();

    GuildContext {
        guild_id,
        everyone_id,
    }
}

async fn create_role(
    app: &axum::Router,
    actor: &str,
    guild_id: &str,
    name: &str,
    permissions: &[&str],
) -> String {
    let response = send(
        app,
        "POST",
        &format!("/guilds/{guild_id}/roles"),
        Some(actor),
        Some(json!({"name": name, "permissions": permissions})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["role_id"]
        .as_str()
        .expect("role id should exist")
        .to_owned()
}

async fn add_member_with_role(
    app: &axum::Router,
    owner: &str,
    guild_id: &str,
    user: &str,
    role_id: &str,
) {
    let add = send(
        app,
        "POST",
        &format!("/guilds/{guild_id}/members/{user}"),
        Some(owner),
        None,
    )
    .await;
    assert_eq!(add.status(), StatusCode::OK);

    let assign = send(
        app,
        "POST",
        &format!("/guilds/{guild_id}/roles/{role_id}/members/{user}"),
        Some(owner),
        None,
    )
    .await;
    assert_eq!(assign.status(), StatusCode::OK);
}

#[tokio::test]
async fn moderators_cannot_escalate_or_touch_roles_above_them() {
    let app = test_app();
    let owner = new_user();
    let mallory = new_user();

    let guild = create_guild(&app, &owner, "Hierarchy Guild").await;
    let mods_id = create_role(
        &app,
        &owner,
        &guild.guild_id,
        "mods",
        &["manage_roles", "manage_messages"],
    )
    .await;
    let board_id = create_role(&app, &owner, &guild.guild_id, "board", &["view_audit_log"]).await;
    add_member_with_role(&app, &owner, &guild.guild_id, &mallory, &mods_id).await;

    // Granting a capability the actor does not hold is self-escalation.
    let escalate = send(
        &app,
        "POST",
        &format!("/guilds/{}/roles", guild.guild_id),
        Some(&mallory),
        Some(json!({"name": "muscle", "permissions": ["ban_members"]})),
    )
    .await;
    assert_eq!(escalate.status(), StatusCode::FORBIDDEN);
    let denial = json_body(escalate).await;
    assert_eq!(denial["error"], "forbidden");
    assert!(denial["reason"]
        .as_str()
        .expect("denial should carry a reason")
        .contains("ban_members"));

    // Granting within their own base set is fine.
    let within_reach = send(
        &app,
        "POST",
        &format!("/guilds/{}/roles", guild.guild_id),
        Some(&mallory),
        Some(json!({"name": "scribes", "permissions": ["manage_messages"]})),
    )
    .await;
    assert_eq!(within_reach.status(), StatusCode::OK);

    // The board role sits above mods, so mallory cannot edit or delete it.
    let edit_above = send(
        &app,
        "PATCH",
        &format!("/guilds/{}/roles/{board_id}", guild.guild_id),
        Some(&mallory),
        Some(json!({"name": "renamed"})),
    )
    .await;
    assert_eq!(edit_above.status(), StatusCode::FORBIDDEN);
    let denial = json_body(edit_above).await;
    assert!(denial["reason"].as_str().unwrap().contains("position"));

    let delete_above = send(
        &app,
        "DELETE",
        &format!("/guilds/{}/roles/{board_id}", guild.guild_id),
        Some(&mallory),
        None,
    )
    .await;
    assert_eq!(delete_above.status(), StatusCode::FORBIDDEN);

    let assign_above = send(
        &app,
        "POST",
        &format!(
            "/guilds/{}/roles/{board_id}/members/{mallory}",
            guild.guild_id
        ),
        Some(&mallory),
        None,
    )
    .await;
    assert_eq!(assign_above.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn floor_role_permissions_are_editable_but_identity_is_frozen() {
    let app = test_app();
    let owner = new_user();
    let mallory = new_user();

    let guild = create_guild(&app, &owner, "Floor Guild").await;
    let mods_id = create_role(&app, &owner, &guild.guild_id, "mods", &["manage_roles"]).await;
    add_member_with_role(&app, &owner, &guild.guild_id, &mallory, &mods_id).await;

    // Narrowing the floor's permission set adds nothing, so a manager
    // above the floor may do it.
    let narrow = send(
        &app,
        "PATCH",
        &format!("/guilds/{}/roles/{}", guild.guild_id, guild.everyone_id),
        Some(&mallory),
        Some(json!({"permissions": ["view_channel", "send_messages"]})),
    )
    .await;
    assert_eq!(narrow.status(), StatusCode::OK);

    let rename = send(
        &app,
        "PATCH",
        &format!("/guilds/{}/roles/{}", guild.guild_id, guild.everyone_id),
        Some(&mallory),
        Some(json!({"name": "plebs"})),
    )
    .await;
    assert_eq!(rename.status(), StatusCode::FORBIDDEN);
    let denial = json_body(rename).await;
    assert!(denial["reason"].as_str().unwrap().contains("everyone"));

    let delete_floor = send(
        &app,
        "DELETE",
        &format!("/guilds/{}/roles/{}", guild.guild_id, guild.everyone_id),
        Some(&mallory),
        None,
    )
    .await;
    assert_eq!(delete_floor.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn reorder_only_moves_roles_below_the_actor() {
    let app = test_app();
    let owner = new_user();
    let mallory = new_user();

    let guild = create_guild(&app, &owner, "Reorder Guild").await;
    let helpers_id = create_role(&app, &owner, &guild.guild_id, "helpers", &[]).await;
    let mods_id = create_role(&app, &owner, &guild.guild_id, "mods", &["manage_roles"]).await;
    let board_id = create_role(&app, &owner, &guild.guild_id, "board", &[]).await;
    add_member_with_role(&app, &owner, &guild.guild_id, &mallory, &mods_id).await;

    // Moving board (above mods) requires outranking it.
    let move_board = send(
        &app,
        "POST",
        &format!("/guilds/{}/roles/reorder", guild.guild_id),
        Some(&mallory),
        Some(json!({"role_ids": [mods_id, board_id, helpers_id]})),
    )
    .await;
    assert_eq!(move_board.status(), StatusCode::FORBIDDEN);

    // The owner can apply the same order atomically.
    let owner_reorder = send(
        &app,
        "POST",
        &format!("/guilds/{}/roles/reorder", guild.guild_id),
        Some(&owner),
        Some(json!({"role_ids": [mods_id, board_id, helpers_id]})),
    )
    .await;
    assert_eq!(owner_reorder.status(), StatusCode::OK);
    let roles = json_body(owner_reorder).await;
    let positions: Vec<(String, i64)> = roles["roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|role| {
            (
                role["name"].as_str().unwrap().to_owned(),
                role["position"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(positions[0].0, "@everyone");
    assert_eq!(positions[0].1, 0);
    let of = |name: &str| positions.iter().find(|(n, _)| n == name).unwrap().1;
    assert!(of("mods") > of("board"));
    assert!(of("board") > of("helpers"));

    // An incomplete order is rejected before any position changes.
    let partial = send(
        &app,
        "POST",
        &format!("/guilds/{}/roles/reorder", guild.guild_id),
        Some(&owner),
        Some(json!({"role_ids": [board_id, mods_id]})),
    )
    .await;
    assert_eq!(partial.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn role_deletion_cascades_into_members_and_overwrites() {
    let app = test_app();
    let owner = new_user();
    let alice = new_user();

    let guild = create_guild(&app, &owner, "Cascade Guild").await;
    let helpers_id = create_role(
        &app,
        &owner,
        &guild.guild_id,
        "helpers",
        &["manage_messages"],
    )
    .await;
    add_member_with_role(&app, &owner, &guild.guild_id, &alice, &helpers_id).await;

    let channel_response = send(
        &app,
        "POST",
        &format!("/guilds/{}/channels", guild.guild_id),
        Some(&owner),
        Some(json!({"name": "workroom"})),
    )
    .await;
    assert_eq!(channel_response.status(), StatusCode::OK);
    let channel_id = json_body(channel_response).await["channel_id"]
        .as_str()
        .unwrap()
        .to_owned();

    let set_overwrite = send(
        &app,
        "PUT",
        &format!(
            "/guilds/{}/channels/{channel_id}/overwrites/{helpers_id}",
            guild.guild_id
        ),
        Some(&owner),
        Some(json!({"allow": ["attach_files"]})),
    )
    .await;
    assert_eq!(set_overwrite.status(), StatusCode::OK);

    let delete = send(
        &app,
        "DELETE",
        &format!("/guilds/{}/roles/{helpers_id}", guild.guild_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(delete.status(), StatusCode::NO_CONTENT);

    let roles_response = send(
        &app,
        "GET",
        &format!("/guilds/{}/roles", guild.guild_id),
        Some(&owner),
        None,
    )
    .await;
    let roles = json_body(roles_response).await;
    assert!(roles["roles"]
        .as_array()
        .unwrap()
        .iter()
        .all(|role| role["role_id"].as_str() != Some(helpers_id.as_str())));

    let channels_response = send(
        &app,
        "GET",
        &format!("/guilds/{}/channels", guild.guild_id),
        Some(&owner),
        None,
    )
    .await;
    let channels = json_body(channels_response).await;
    assert!(channels["channels"].as_array().unwrap()[0]["overwrites"]
        .as_array()
        .unwrap()
        .is_empty());

    let base_response = send(
        &app,
        "GET",
        &format!("/guilds/{}/members/{alice}/permissions", guild.guild_id),
        Some(&owner),
        None,
    )
    .await;
    let base = json_body(base_response).await;
    assert!(!base["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .any(|permission| permission == "manage_messages"));
}

#[tokio::test]
async fn permission_checks_gate_every_mutation_path() {
    let app = test_app();
    let owner = new_user();
    let alice = new_user();

    let guild = create_guild(&app, &owner, "Gate Guild").await;
    let add = send(
        &app,
        "POST",
        &format!("/guilds/{}/members/{alice}", guild.guild_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(add.status(), StatusCode::OK);

    // A plain member holds no manage capability anywhere.
    let create_role_attempt = send(
        &app,
        "POST",
        &format!("/guilds/{}/roles", guild.guild_id),
        Some(&alice),
        Some(json!({"name": "sneaky", "permissions": []})),
    )
    .await;
    assert_eq!(create_role_attempt.status(), StatusCode::FORBIDDEN);
    let denial = json_body(create_role_attempt).await;
    assert!(denial["reason"].as_str().unwrap().contains("manage_roles"));

    let create_channel_attempt = send(
        &app,
        "POST",
        &format!("/guilds/{}/channels", guild.guild_id),
        Some(&alice),
        Some(json!({"name": "hideout"})),
    )
    .await;
    assert_eq!(create_channel_attempt.status(), StatusCode::FORBIDDEN);
    let denial = json_body(create_channel_attempt).await;
    assert!(denial["reason"].as_str().unwrap().contains("manage_channels"));

    let unknown_permission = send(
        &app,
        "POST",
        &format!("/guilds/{}/roles", guild.guild_id),
        Some(&owner),
        Some(json!({"name": "bad", "permissions": ["not_a_permission"]})),
    )
    .await;
    assert_eq!(
        unknown_permission.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}
