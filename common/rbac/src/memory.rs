//! In-memory store implementations. Used as the default backend and as test doubles.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Role, User};
use crate::permission::Permission;
use crate::store::{PermissionStore, RoleStore, StoreResult, UserStore};

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    inner: Arc<RwLock<Vec<User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<I>(users: I) -> Self
    where
        I: IntoIterator<Item = User>,
    {
        Self {
            inner: Arc::new(RwLock::new(users.into_iter().collect())),
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: &User) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        if guard
            .iter()
            .any(|existing| existing.id == user.id || existing.email == user.email)
        {
            return Err(StoreError::Conflict {
                entity: "user",
                id: user.id.to_string(),
            });
        }
        guard.push(user.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<User>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.iter().find(|user| user.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.iter().find(|user| user.email == email).cloned())
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id == user.id)
            .ok_or_else(|| StoreError::Missing {
                entity: "user",
                id: user.id.to_string(),
            })?;
        *slot = user.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.retain(|user| user.id != id);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.clone())
    }
}

#[derive(Default)]
struct RoleTables {
    roles: Vec<Role>,
    // (user_id, role_id) in assignment order
    user_roles: Vec<(Uuid, Uuid)>,
}

#[derive(Clone, Default)]
pub struct InMemoryRoleStore {
    inner: Arc<RwLock<RoleTables>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn create(&self, role: &Role) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        if guard.roles.iter().any(|existing| existing.id == role.id) {
            return Err(StoreError::Conflict {
                entity: "role",
                id: role.id.to_string(),
            });
        }
        guard.roles.push(role.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Role>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.roles.iter().find(|role| role.id == id).cloned())
    }

    async fn update(&self, role: &Role) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        let slot = guard
            .roles
            .iter_mut()
            .find(|existing| existing.id == role.id)
            .ok_or_else(|| StoreError::Missing {
                entity: "role",
                id: role.id.to_string(),
            })?;
        *slot = role.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.roles.retain(|role| role.id != id);
        guard.user_roles.retain(|(_, role_id)| *role_id != id);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Role>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.roles.clone())
    }

    async fn get_roles_by_user_id(&self, user_id: Uuid) -> StoreResult<Vec<Role>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        let roles = guard
            .user_roles
            .iter()
            .filter(|(assigned, _)| *assigned == user_id)
            .filter_map(|(_, role_id)| guard.roles.iter().find(|role| role.id == *role_id))
            .cloned()
            .collect();
        Ok(roles)
    }

    async fn assign_to_user(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        if !guard.roles.iter().any(|role| role.id == role_id) {
            return Err(StoreError::Missing {
                entity: "role",
                id: role_id.to_string(),
            });
        }
        guard.user_roles.push((user_id, role_id));
        Ok(())
    }

    async fn revoke_from_user(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard
            .user_roles
            .retain(|entry| *entry != (user_id, role_id));
        Ok(())
    }
}

#[derive(Default)]
struct PermissionTables {
    permissions: HashMap<Uuid, Permission>,
    // (role_id, permission_id) in grant order
    role_permissions: Vec<(Uuid, Uuid)>,
}

#[derive(Clone, Default)]
pub struct InMemoryPermissionStore {
    inner: Arc<RwLock<PermissionTables>>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn create(&self, permission: &Permission) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        if guard.permissions.contains_key(&permission.id) {
            return Err(StoreError::Conflict {
                entity: "permission",
                id: permission.id.to_string(),
            });
        }
        guard.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Permission>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.permissions.get(&id).cloned())
    }

    async fn update(&self, permission: &Permission) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        match guard.permissions.get_mut(&permission.id) {
            Some(slot) => {
                *slot = permission.clone();
                Ok(())
            }
            None => Err(StoreError::Missing {
                entity: "permission",
                id: permission.id.to_string(),
            }),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.permissions.remove(&id);
        guard.role_permissions.retain(|(_, permission_id)| *permission_id != id);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Permission>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        let mut all: Vec<Permission> = guard.permissions.values().cloned().collect();
        all.sort_by(|a, b| a.value.cmp(&b.value));
        Ok(all)
    }

    async fn get_all_by_role_id(&self, role_id: Uuid) -> StoreResult<Vec<Permission>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        let permissions = guard
            .role_permissions
            .iter()
            .filter(|(granted, _)| *granted == role_id)
            .filter_map(|(_, permission_id)| guard.permissions.get(permission_id))
            .cloned()
            .collect();
        Ok(permissions)
    }

    async fn assign_to_role(&self, role_id: Uuid, permission_ids: &[Uuid]) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        if let Some(unknown) = permission_ids
            .iter()
            .find(|id| !guard.permissions.contains_key(*id))
        {
            return Err(StoreError::Missing {
                entity: "permission",
                id: unknown.to_string(),
            });
        }
        guard
            .role_permissions
            .extend(permission_ids.iter().map(|id| (role_id, *id)));
        Ok(())
    }

    async fn revoke_from_role(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard
            .role_permissions
            .retain(|entry| *entry != (role_id, permission_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Scope;

    #[tokio::test]
    async fn user_crud_round_trip() {
        let store = InMemoryUserStore::new();
        let mut user = User::new("desk@example.com", "Desk", "One");
        store.create(&user).await.unwrap();
        assert!(store.create(&user).await.is_err());

        user.last_name = "Two".into();
        store.update(&user).await.unwrap();
        let fetched = store.get(user.id).await.unwrap().expect("user present");
        assert_eq!(fetched.last_name, "Two");
        assert_eq!(
            store.get_by_email("desk@example.com").await.unwrap(),
            Some(fetched)
        );

        store.delete(user.id).await.unwrap();
        assert!(store.get(user.id).await.unwrap().is_none());
        assert!(store.update(&user).await.is_err());
    }

    #[tokio::test]
    async fn roles_by_user_follow_assignment_order() {
        let store = InMemoryRoleStore::new();
        let user = Uuid::new_v4();
        let first = Role::new("traders");
        let second = Role::new("auditors");
        store.create(&first).await.unwrap();
        store.create(&second).await.unwrap();

        store.assign_to_user(user, second.id).await.unwrap();
        store.assign_to_user(user, first.id).await.unwrap();
        let names: Vec<_> = store
            .get_roles_by_user_id(user)
            .await
            .unwrap()
            .into_iter()
            .map(|role| role.name)
            .collect();
        assert_eq!(names, vec!["auditors", "traders"]);

        store.revoke_from_user(user, second.id).await.unwrap();
        assert_eq!(store.get_roles_by_user_id(user).await.unwrap().len(), 1);
        assert!(store.assign_to_user(user, Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn permissions_by_role_keep_duplicates() {
        let store = InMemoryPermissionStore::new();
        let role = Uuid::new_v4();
        let read = Permission::new("brokers.read", Scope::All);
        store.create(&read).await.unwrap();

        store.assign_to_role(role, &[read.id, read.id]).await.unwrap();
        assert_eq!(store.get_all_by_role_id(role).await.unwrap().len(), 2);
        assert!(store.get_all_by_role_id(Uuid::new_v4()).await.unwrap().is_empty());

        store.delete(read.id).await.unwrap();
        assert!(store.get_all_by_role_id(role).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn assign_rejects_unknown_permission() {
        let store = InMemoryPermissionStore::new();
        let err = store
            .assign_to_role(Uuid::new_v4(), &[Uuid::new_v4()])
            .await
            .expect_err("unknown permission");
        assert!(matches!(err, StoreError::Missing { entity: "permission", .. }));
    }
}
