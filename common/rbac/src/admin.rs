use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AdminError, StoreError};
use crate::model::Role;
use crate::permission::{Permission, Permissions};
use crate::registry::Repositories;
use crate::store::PermissionStore;

/// Write paths for roles and permissions. Input is validated before any store call.
#[derive(Clone)]
pub struct RbacAdmin {
    repos: Repositories,
}

impl RbacAdmin {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn create_role(&self, role: &Role) -> Result<(), AdminError> {
        role.validate()?;
        self.repos.roles().create(role).await?;
        info!(role_id = %role.id, name = %role.name, "role created");
        Ok(())
    }

    pub async fn create_permission(&self, permission: &Permission) -> Result<(), AdminError> {
        permission.validate()?;
        self.repos.permissions().create(permission).await?;
        Ok(())
    }

    /// Creates every permission in `permissions` and grants them all to `role_id`.
    ///
    /// Stores offer no transaction across calls, so on failure the permissions
    /// created so far are deleted again before the error is returned.
    pub async fn grant_permissions(
        &self,
        role_id: Uuid,
        permissions: &Permissions,
    ) -> Result<(), AdminError> {
        permissions.validate()?;

        let roles = self.repos.roles();
        if roles.get(role_id).await?.is_none() {
            return Err(StoreError::Missing {
                entity: "role",
                id: role_id.to_string(),
            }
            .into());
        }

        let store = self.repos.permissions();
        let mut created = Vec::with_capacity(permissions.len());
        for permission in permissions {
            if let Err(err) = store.create(permission).await {
                discard(store.as_ref(), &created).await;
                return Err(err.into());
            }
            created.push(permission.id);
        }
        if let Err(err) = store.assign_to_role(role_id, &created).await {
            discard(store.as_ref(), &created).await;
            return Err(err.into());
        }
        info!(%role_id, count = created.len(), "permissions granted");
        Ok(())
    }

    pub async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), AdminError> {
        if self.repos.users().get(user_id).await?.is_none() {
            return Err(StoreError::Missing {
                entity: "user",
                id: user_id.to_string(),
            }
            .into());
        }
        self.repos.roles().assign_to_user(user_id, role_id).await?;
        Ok(())
    }
}

async fn discard(store: &dyn PermissionStore, ids: &[Uuid]) {
    for id in ids {
        if let Err(err) = store.delete(*id).await {
            warn!(permission_id = %id, error = %err, "failed to remove permission after aborted grant");
        }
    }
}
