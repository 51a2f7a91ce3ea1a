use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, Extensions};
use common_rbac::UserWithRoles;

use crate::error::AuthError;

/// The authenticated principal as stored in request extensions.
///
/// The type itself is the extension key, so nothing else can collide with it.
/// A request without one is unauthenticated; extraction then rejects with 401.
#[derive(Debug, Clone)]
pub struct Principal(pub Arc<UserWithRoles>);

impl Principal {
    pub fn new(user: UserWithRoles) -> Self {
        Self(Arc::new(user))
    }

    pub fn from_extensions(extensions: &Extensions) -> Option<&Principal> {
        extensions.get::<Principal>()
    }

    pub fn into_inner(self) -> Arc<UserWithRoles> {
        self.0
    }
}

impl Deref for Principal {
    type Target = UserWithRoles;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Principal::from_extensions(&parts.extensions)
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use common_rbac::User;

    fn principal() -> Principal {
        Principal::new(UserWithRoles {
            user: User::new("a@example.com", "A", "B"),
            roles: Vec::new(),
        })
    }

    #[tokio::test]
    async fn missing_extension_is_unauthenticated() {
        let (mut parts, _) = Request::new(()).into_parts();
        let err = Principal::from_request_parts(&mut parts, &())
            .await
            .expect_err("no principal");
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn injected_principal_is_extracted() {
        let expected = principal();
        let mut request = Request::new(());
        request.extensions_mut().insert(expected.clone());
        let (mut parts, _) = request.into_parts();

        let found = Principal::from_request_parts(&mut parts, &())
            .await
            .expect("principal");
        assert_eq!(found.id(), expected.id());
    }

    #[test]
    fn other_extension_types_do_not_count() {
        let mut extensions = Extensions::new();
        extensions.insert(Arc::new(UserWithRoles {
            user: User::new("x@example.com", "X", "Y"),
            roles: Vec::new(),
        }));
        assert!(Principal::from_extensions(&extensions).is_none());
    }
}
