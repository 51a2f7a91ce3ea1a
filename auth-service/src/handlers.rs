use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common_auth::{ensure_permission, ensure_scoped_permission, AuthError, Principal};
use common_rbac::{
    AdminError, Permission, Permissions, Role, Scope, StoreError, User, UserWithRoles,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::app::AppState;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            StoreError::Missing { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Backend(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Validation(err) => ApiError::Validation(err),
            AdminError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Auth(err) => return err.clone().into_response(),
            ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, err.code()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Internal(message) => {
                error!(%message, "request failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        code: "SERVER_ERROR",
                        message: "internal error".to_string(),
                    }),
                )
                    .into_response();
            }
        };
        let body = ErrorResponse {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(response) => response,
        Err(err) => ApiError::Internal(format!("metrics encoding failed: {err}")).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub user: User,
    pub token: String,
}

fn validate_new_user(new_user: &NewUser) -> Result<(), ApiError> {
    let email = new_user.email.trim();
    let well_formed = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !well_formed {
        return Err(ApiError::InvalidInput("a valid email is required".into()));
    }
    if new_user.first_name.trim().is_empty() || new_user.last_name.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "first_name and last_name are required".into(),
        ));
    }
    Ok(())
}

/// Open signup: creates the account and hands back a session token for it.
pub async fn create_user(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<CreatedUser>), ApiError> {
    validate_new_user(&new_user)?;
    let email = new_user.email.trim().to_ascii_lowercase();

    let users = state.repos.users();
    if users.get_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(format!("user '{email}' already exists")));
    }

    let user = User::new(
        email,
        new_user.first_name.trim(),
        new_user.last_name.trim(),
    );
    users.create(&user).await?;
    let token = state.tokens.issue_token(user.id)?;

    state.metrics.account_created();
    info!(user_id = %user.id, "account created");
    Ok((StatusCode::CREATED, Json(CreatedUser { user, token })))
}

pub async fn me(principal: Principal) -> Json<UserWithRoles> {
    Json(principal.into_inner().as_ref().clone())
}

pub async fn list_roles(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Role>>, ApiError> {
    ensure_permission(&principal, "admin.roles.list")?;
    let roles = state.repos.roles().list().await?;
    Ok(Json(roles))
}

#[derive(Debug, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub async fn create_role(
    State(state): State<AppState>,
    principal: Principal,
    Json(new_role): Json<NewRole>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    ensure_scoped_permission(&principal, "admin.roles.create", Scope::Admin)?;
    let role = Role::new(new_role.name.trim()).with_description(new_role.description);
    state.admin.create_role(&role).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[derive(Debug, Deserialize)]
pub struct NewPermission {
    pub value: String,
    /// Kept as raw text so unknown scopes surface as validation errors.
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub description: String,
}

impl From<NewPermission> for Permission {
    fn from(input: NewPermission) -> Self {
        Permission {
            id: Uuid::new_v4(),
            value: input.value,
            scope: input.scope,
            description: input.description,
        }
    }
}

pub async fn grant_permissions(
    State(state): State<AppState>,
    principal: Principal,
    Path(role_id): Path<Uuid>,
    Json(batch): Json<Vec<NewPermission>>,
) -> Result<(StatusCode, Json<Permissions>), ApiError> {
    ensure_scoped_permission(&principal, "admin.roles.grant", Scope::Admin)?;
    let permissions = Permissions::new(batch.into_iter().map(Permission::from).collect());
    state.admin.grant_permissions(role_id, &permissions).await?;
    Ok((StatusCode::CREATED, Json(permissions)))
}
