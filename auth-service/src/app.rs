use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use common_auth::{AuthResult, Authenticator, TokenService};
use common_rbac::{RbacAdmin, Repositories, RoleResolver};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::config::ServiceConfig;
use crate::handlers::{
    create_role, create_user, grant_permissions, health, list_roles, me, metrics_endpoint,
};
use crate::metrics::AuthMetrics;

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Authenticator,
    pub tokens: Arc<TokenService>,
    pub repos: Repositories,
    pub admin: RbacAdmin,
    pub metrics: Arc<AuthMetrics>,
}

impl AppState {
    pub fn new(
        config: &ServiceConfig,
        tokens: Arc<TokenService>,
        repos: Repositories,
        metrics: Arc<AuthMetrics>,
    ) -> AuthResult<Self> {
        let authenticator = Authenticator::new(
            config.auth.clone(),
            tokens.clone(),
            RoleResolver::new(repos.clone()),
        )?;
        Ok(Self {
            authenticator,
            tokens,
            admin: RbacAdmin::new(repos.clone()),
            repos,
            metrics,
        })
    }
}

/// `common_auth::authenticate` plus an `auth_requests_total` sample per request.
pub async fn authenticate_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let metrics = &state.metrics;
    state
        .authenticator
        .run(request, next, |result| {
            metrics.auth_outcome(match result {
                Ok(outcome) => outcome.label(),
                Err(_) => "rejected",
            })
        })
        .await
}

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let authenticated = Router::new()
        .route("/users", post(create_user))
        .route("/me", get(me))
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:role_id/permissions", post(grant_permissions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate_request,
        ));

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .merge(authenticated)
        .with_state(state)
        .layer(cors)
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, ?err, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION])
}
