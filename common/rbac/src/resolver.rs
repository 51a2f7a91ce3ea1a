use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ResolveError, StoreError};
use crate::model::{RoleWithPermissions, UserWithRoles};
use crate::registry::Repositories;

/// Assembles a principal by walking user -> roles -> permissions.
///
/// Stores are looked up from the registries on every call, so a backend
/// swapped in between requests is picked up immediately. Nothing is cached.
#[derive(Clone)]
pub struct RoleResolver {
    repos: Repositories,
}

impl RoleResolver {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    /// Roles of `user_id` with their permissions, in storage order.
    ///
    /// Any storage failure aborts the whole load; a partial list is never returned.
    pub async fn load_user_roles(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RoleWithPermissions>, StoreError> {
        let roles = self.repos.roles().get_roles_by_user_id(user_id).await?;
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let permissions = self.repos.permissions();
        let mut resolved = Vec::with_capacity(roles.len());
        for role in roles {
            let granted = match permissions.get_all_by_role_id(role.id).await {
                Ok(granted) => granted,
                Err(err) => {
                    warn!(%user_id, role_id = %role.id, error = %err, "failed to load role permissions");
                    return Err(err);
                }
            };
            resolved.push(RoleWithPermissions {
                role,
                permissions: granted,
            });
        }
        Ok(resolved)
    }

    pub async fn load_full_user(&self, user_id: Uuid) -> Result<UserWithRoles, ResolveError> {
        let user = self
            .repos
            .users()
            .get(user_id)
            .await?
            .ok_or(ResolveError::UserNotFound)?;

        let roles = self.load_user_roles(user.id).await?;
        debug!(%user_id, roles = roles.len(), "resolved principal");
        Ok(UserWithRoles { user, roles })
    }
}
