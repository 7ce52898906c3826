use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use palisade_core::{
    ActorContext, Category, CategoryId, Channel, ChannelId, GuildName, GuildSnapshot, Member,
    Role, RoleId, UserId,
};
use tokio::sync::RwLock;

use super::permissions::make_everyone_role;

pub const DEFAULT_JSON_BODY_LIMIT_BYTES: usize = 262_144;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_CREATED_GUILDS_PER_USER: usize = 5;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub max_created_guilds_per_user: usize,
    /// Shared token the synchronization adapter presents on
    /// `POST /guilds/{id}/sync`. Ingestion is disabled when unset.
    pub sync_ingest_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_JSON_BODY_LIMIT_BYTES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_created_guilds_per_user: DEFAULT_MAX_CREATED_GUILDS_PER_USER,
            sync_ingest_token: None,
        }
    }
}

#[derive(Clone)]
pub(crate) struct RuntimeLimits {
    pub(crate) max_created_guilds_per_user: usize,
    pub(crate) sync_ingest_token: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub(crate) guilds: Arc<RwLock<HashMap<String, GuildRecord>>>,
    pub(crate) runtime: Arc<RuntimeLimits>,
}

impl AppState {
    pub(crate) fn new(config: &AppConfig) -> Self {
        Self {
            guilds: Arc::new(RwLock::new(HashMap::new())),
            runtime: Arc::new(RuntimeLimits {
                max_created_guilds_per_user: config.max_created_guilds_per_user,
                sync_ingest_token: config.sync_ingest_token.clone(),
            }),
        }
    }
}

/// Authoritative in-memory state of one guild. Mutations happen under the
/// state write lock and only after the hierarchy guard accepts them;
/// resolution reads a snapshot assembled from this record.
pub(crate) struct GuildRecord {
    pub(crate) name: GuildName,
    pub(crate) owner_id: UserId,
    pub(crate) roles: HashMap<RoleId, Role>,
    pub(crate) members: HashMap<UserId, HashSet<RoleId>>,
    pub(crate) categories: HashMap<CategoryId, Category>,
    pub(crate) channels: HashMap<ChannelId, Channel>,
}

impl GuildRecord {
    pub(crate) fn new(name: GuildName, owner_id: UserId) -> Self {
        let everyone = make_everyone_role();
        let mut roles = HashMap::new();
        roles.insert(everyone.id, everyone);

        let mut members = HashMap::new();
        members.insert(owner_id, HashSet::new());

        Self {
            name,
            owner_id,
            roles,
            members,
            categories: HashMap::new(),
            channels: HashMap::new(),
        }
    }

    pub(crate) fn is_member(&self, user_id: UserId) -> bool {
        self.owner_id == user_id || self.members.contains_key(&user_id)
    }

    /// Roles the member resolves with: held roles that still exist plus
    /// `@everyone`, lowest position first.
    pub(crate) fn member_roles(&self, user_id: UserId) -> Vec<Role> {
        let held = self.members.get(&user_id);
        let mut roles: Vec<Role> = self
            .roles
            .values()
            .filter(|role| {
                role.is_everyone() || held.is_some_and(|ids| ids.contains(&role.id))
            })
            .cloned()
            .collect();
        roles.sort_by_key(|role| role.position);
        roles
    }

    pub(crate) fn actor_context(&self, user_id: UserId) -> ActorContext {
        ActorContext {
            is_owner: self.owner_id == user_id,
            roles: self.member_roles(user_id),
        }
    }

    pub(crate) fn next_role_position(&self) -> i32 {
        self.roles
            .values()
            .map(|role| role.position)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Deleting a role removes it from every member and every overwrite
    /// reference.
    pub(crate) fn remove_role_everywhere(&mut self, role_id: RoleId) {
        self.roles.remove(&role_id);
        for held in self.members.values_mut() {
            held.remove(&role_id);
        }
        for channel in self.channels.values_mut() {
            channel
                .overwrites
                .retain(|overwrite| overwrite.role_id != role_id);
        }
        for category in self.categories.values_mut() {
            category
                .overwrites
                .retain(|overwrite| overwrite.role_id != role_id);
        }
    }

    pub(crate) fn snapshot(&self) -> GuildSnapshot {
        GuildSnapshot {
            owner_id: self.owner_id,
            roles: self.roles.values().cloned().collect(),
            categories: self.categories.values().cloned().collect(),
            channels: self.channels.values().cloned().collect(),
            members: self
                .members
                .iter()
                .map(|(user_id, role_ids)| Member {
                    user_id: *user_id,
                    role_ids: role_ids.clone(),
                })
                .collect(),
        }
    }
}
