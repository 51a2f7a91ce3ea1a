//! Postgres-backed implementations of the RBAC store ports. Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_rbac::{
    Permission, PermissionStore, Role, RoleStore, StoreError, StoreResult, User, UserStore,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

fn store_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        // unique_violation
        if db.code().as_deref() == Some("23505") {
            return StoreError::Conflict {
                entity: "row",
                id: db.constraint().unwrap_or("unique").to_string(),
            };
        }
    }
    StoreError::backend(err)
}

fn missing(entity: &'static str, id: Uuid, rows: u64) -> StoreResult<()> {
    if rows == 0 {
        Err(StoreError::Missing {
            entity,
            id: id.to_string(),
        })
    } else {
        Ok(())
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct PermissionRow {
    id: Uuid,
    value: String,
    scope: String,
    description: String,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Permission {
            id: row.id,
            value: row.value,
            scope: row.scope,
            description: row.description,
        }
    }
}

const USER_COLUMNS: &str = "id, email, first_name, last_name, created_at, updated_at";
const ROLE_COLUMNS: &str = "r.id, r.name, r.description, r.created_at, r.updated_at";
const PERMISSION_COLUMNS: &str = "p.id, p.value, p.scope, p.description";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(store_err)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(User::from))
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(User::from))
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, first_name = $3, last_name = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        missing("user", user.id, result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(store_err)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}

#[derive(Clone)]
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn create(&self, role: &Role) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO roles (id, name, description, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(store_err)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles r WHERE r.id = $1");
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(Role::from))
    }

    async fn update(&self, role: &Role) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE roles SET name = $2, description = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        missing("role", role.id, result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(store_err)
    }

    async fn list(&self) -> StoreResult<Vec<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles r ORDER BY r.name");
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn get_roles_by_user_id(&self, user_id: Uuid) -> StoreResult<Vec<Role>> {
        let sql = format!(
            "SELECT {ROLE_COLUMNS} FROM roles r JOIN user_roles ur ON ur.role_id = r.id WHERE ur.user_id = $1 ORDER BY ur.seq"
        );
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn assign_to_user(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT (user_id, role_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(store_err)
    }

    async fn revoke_from_user(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(store_err)
    }
}

#[derive(Clone)]
pub struct PgPermissionStore {
    pool: PgPool,
}

impl PgPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionStore for PgPermissionStore {
    async fn create(&self, permission: &Permission) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO permissions (id, value, scope, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(permission.id)
        .bind(&permission.value)
        .bind(&permission.scope)
        .bind(&permission.description)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(store_err)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Permission>> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions p WHERE p.id = $1");
        let row = sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(Permission::from))
    }

    async fn update(&self, permission: &Permission) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE permissions SET value = $2, scope = $3, description = $4 WHERE id = $1",
        )
        .bind(permission.id)
        .bind(&permission.value)
        .bind(&permission.scope)
        .bind(&permission.description)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        missing("permission", permission.id, result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(store_err)
    }

    async fn list(&self) -> StoreResult<Vec<Permission>> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions p ORDER BY p.value");
        let rows = sqlx::query_as::<_, PermissionRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(Permission::from).collect())
    }

    async fn get_all_by_role_id(&self, role_id: Uuid) -> StoreResult<Vec<Permission>> {
        let sql = format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions p JOIN role_permissions rp ON rp.permission_id = p.id WHERE rp.role_id = $1 ORDER BY rp.seq"
        );
        let rows = sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(role_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(Permission::from).collect())
    }

    async fn assign_to_role(&self, role_id: Uuid, permission_ids: &[Uuid]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        for permission_id in permission_ids {
            sqlx::query(
                "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2) ON CONFLICT (role_id, permission_id) DO NOTHING",
            )
            .bind(role_id)
            .bind(permission_id)
            .execute(&mut tx)
            .await
            .map_err(store_err)?;
        }
        tx.commit().await.map_err(store_err)
    }

    async fn revoke_from_role(&self, role_id: Uuid, permission_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
            .bind(role_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(store_err)
    }
}
