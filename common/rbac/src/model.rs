use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::permission::{Permission, Scope};

pub const ROLE_NAME_MIN_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Surrounding whitespace does not count towards the name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::NameRequired);
        }
        if name.chars().count() < ROLE_NAME_MIN_LEN {
            return Err(ValidationError::NameTooShort);
        }
        Ok(())
    }
}

/// A role together with the permissions storage returned for it, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleWithPermissions {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// The authenticated principal: a user and every role assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWithRoles {
    pub user: User,
    pub roles: Vec<RoleWithPermissions>,
}

impl UserWithRoles {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    /// Union of all role permissions. Duplicates across roles are kept.
    pub fn permissions(&self) -> impl Iterator<Item = &Permission> {
        self.roles.iter().flat_map(|entry| entry.permissions.iter())
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|entry| entry.role.name == name)
    }

    pub fn has_permission(&self, requested: &str) -> bool {
        self.permissions()
            .any(|permission| permission.matches(requested))
    }

    pub fn has_scoped_permission(&self, requested: &str, scope: Scope) -> bool {
        self.permissions().any(|permission| {
            permission.scope().ok() == Some(scope) && permission.matches(requested)
        })
    }
}
