//! Storage ports consumed by the resolver and admin flows.
//!
//! Every method is a single independent read or write; implementations must
//! be safe to share across request tasks.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Role, User};
use crate::permission::Permission;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &User) -> StoreResult<()>;
    /// `Ok(None)` when no user has this id.
    async fn get(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update(&self, user: &User) -> StoreResult<()>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
    async fn list(&self) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn create(&self, role: &Role) -> StoreResult<()>;
    async fn get(&self, id: Uuid) -> StoreResult<Option<Role>>;
    async fn update(&self, role: &Role) -> StoreResult<()>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
    async fn list(&self) -> StoreResult<Vec<Role>>;
    /// Roles assigned to `user_id`, in assignment order.
    async fn get_roles_by_user_id(&self, user_id: Uuid) -> StoreResult<Vec<Role>>;
    async fn assign_to_user(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()>;
    async fn revoke_from_user(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn create(&self, permission: &Permission) -> StoreResult<()>;
    async fn get(&self, id: Uuid) -> StoreResult<Option<Permission>>;
    async fn update(&self, permission: &Permission) -> StoreResult<()>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
    async fn list(&self) -> StoreResult<Vec<Permission>>;
    /// Permissions granted to `role_id`, in grant order.
    async fn get_all_by_role_id(&self, role_id: Uuid) -> StoreResult<Vec<Permission>>;
    async fn assign_to_role(&self, role_id: Uuid, permission_ids: &[Uuid]) -> StoreResult<()>;
    async fn revoke_from_role(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<()>;
}
