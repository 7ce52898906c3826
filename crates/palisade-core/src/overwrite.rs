use crate::{PermissionSet, RoleId};

/// Per-role allow/deny exception attached to one channel or one category.
/// Capabilities absent from both sets inherit from the layer below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionOverwrite {
    pub role_id: RoleId,
    pub allow: PermissionSet,
    pub deny: PermissionSet,
}

impl PermissionOverwrite {
    /// Build an overwrite with `allow ∩ deny = ∅` restored. The allow /
    /// inherit / deny toggle keeps the sets disjoint at the source; when a
    /// stale snapshot hands us both bits for one capability, deny wins.
    #[must_use]
    pub fn new(role_id: RoleId, allow: PermissionSet, deny: PermissionSet) -> Self {
        Self {
            role_id,
            allow: allow.difference(deny),
            deny,
        }
    }

    /// An overwrite carrying no bits is equivalent to absence and should
    /// be pruned by the store.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}
