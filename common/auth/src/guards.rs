use common_rbac::{Scope, UserWithRoles};
use tracing::warn;

use crate::error::{AuthError, AuthResult};

pub fn ensure_permission(principal: &UserWithRoles, requested: &str) -> AuthResult<()> {
    if principal.has_permission(requested) {
        return Ok(());
    }
    warn!(user_id = %principal.id(), requested, "permission_check_failed");
    Err(AuthError::Forbidden {
        required: requested.to_string(),
    })
}

/// Like [`ensure_permission`], but only permissions tagged with `scope` count.
pub fn ensure_scoped_permission(
    principal: &UserWithRoles,
    requested: &str,
    scope: Scope,
) -> AuthResult<()> {
    if principal.has_scoped_permission(requested, scope) {
        return Ok(());
    }
    warn!(user_id = %principal.id(), requested, %scope, "scoped_permission_check_failed");
    Err(AuthError::Forbidden {
        required: format!("{scope}:{requested}"),
    })
}

pub fn ensure_any_permission(principal: &UserWithRoles, requested: &[&str]) -> AuthResult<()> {
    if requested.is_empty() || requested.iter().any(|p| principal.has_permission(p)) {
        return Ok(());
    }
    warn!(user_id = %principal.id(), ?requested, "any_permission_check_failed");
    Err(AuthError::Forbidden {
        required: requested.join(" | "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_rbac::{Permission, Role, RoleWithPermissions, User};

    fn principal(values: &[(&str, Scope)]) -> UserWithRoles {
        UserWithRoles {
            user: User::new("desk@example.com", "Desk", "User"),
            roles: vec![RoleWithPermissions {
                role: Role::new("desk"),
                permissions: values
                    .iter()
                    .map(|(value, scope)| Permission::new(*value, *scope))
                    .collect(),
            }],
        }
    }

    #[test]
    fn wildcard_grant_allows_family() {
        let p = principal(&[("admin.*", Scope::Admin)]);
        assert!(ensure_permission(&p, "admin.roles.create").is_ok());
        let err = ensure_permission(&p, "billing.roles.create").expect_err("denied");
        assert!(matches!(err, AuthError::Forbidden { .. }));
    }

    #[test]
    fn scope_must_match() {
        let p = principal(&[("brokers.*", Scope::All)]);
        assert!(ensure_scoped_permission(&p, "brokers.read", Scope::All).is_ok());
        assert!(ensure_scoped_permission(&p, "brokers.read", Scope::Admin).is_err());
    }

    #[test]
    fn any_permission() {
        let p = principal(&[("transactions.read", Scope::All)]);
        assert!(ensure_any_permission(&p, &["brokers.read", "transactions.read"]).is_ok());
        assert!(ensure_any_permission(&p, &[]).is_ok());
        assert!(ensure_any_permission(&p, &["brokers.read"]).is_err());
    }

    #[test]
    fn no_roles_denies() {
        let p = UserWithRoles {
            user: User::new("new@example.com", "New", "User"),
            roles: Vec::new(),
        };
        assert!(ensure_permission(&p, "anything").is_err());
    }
}
