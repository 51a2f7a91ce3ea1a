use thiserror::Error;

/// Rejection raised while validating roles and permissions before they reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("permission value is required")]
    ValueRequired,
    #[error("permission scope is required")]
    ScopeRequired,
    #[error("permission scope is not one of: admin, all")]
    ScopeInvalid,
    #[error("role name is required")]
    NameRequired,
    #[error("role name must be at least 3 characters")]
    NameTooShort,
    #[error("too many permissions in a single request")]
    LimitExceeded,
}

impl ValidationError {
    /// Stable reason code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::ValueRequired => "value_required",
            ValidationError::ScopeRequired => "scope_required",
            ValidationError::ScopeInvalid => "scope_invalid",
            ValidationError::NameRequired => "name_required",
            ValidationError::NameTooShort => "name_too_short",
            ValidationError::LimitExceeded => "limit_exceeded",
        }
    }
}

/// Opaque failure reported by a repository backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("{entity} '{id}' already exists")]
    Conflict { entity: &'static str, id: String },
    #[error("{entity} '{id}' does not exist")]
    Missing { entity: &'static str, id: String },
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Failure while assembling a principal from storage.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of an admin flow: either rejected input or a storage problem.
#[derive(Debug, Clone, Error)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_codes_are_snake_case() {
        let all = [
            ValidationError::ValueRequired,
            ValidationError::ScopeRequired,
            ValidationError::ScopeInvalid,
            ValidationError::NameRequired,
            ValidationError::NameTooShort,
            ValidationError::LimitExceeded,
        ];
        for err in all {
            let code = err.code();
            assert!(code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
        assert_eq!(ValidationError::LimitExceeded.code(), "limit_exceeded");
    }

    #[test]
    fn resolve_error_wraps_store_error() {
        let err: ResolveError = StoreError::backend("connection reset").into();
        assert!(matches!(err, ResolveError::Store(StoreError::Backend(_))));
        assert_eq!(
            err.to_string(),
            "storage backend failure: connection reset"
        );
    }
}
