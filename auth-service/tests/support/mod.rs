#![allow(dead_code)]

use std::{env, sync::Arc};

use anyhow::{Context, Result};
use auth_service::config::ServiceConfig;
use auth_service::metrics::AuthMetrics;
use auth_service::{build_router, cors_layer, AppState};
use axum::body::Body;
use axum::http::{header::AUTHORIZATION, header::CONTENT_TYPE, Request};
use axum::response::Response;
use axum::Router;
use common_auth::{AuthConfig, TokenService, TokenSources};
use common_rbac::Repositories;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::util::ServiceExt;

const TEST_SECRET: &str = "service-routes-secret-long-enough-for-hs256-signing";

/// In-memory wiring of the full service router.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let config = ServiceConfig {
            auth: AuthConfig::new(TokenSources::HEADER),
            allow_origins: vec!["http://localhost:3000".to_string()],
            database_url: None,
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let tokens = Arc::new(TokenService::with_secret(config.auth.sources, TEST_SECRET)?);
        let metrics = Arc::new(AuthMetrics::new()?);
        let state = AppState::new(&config, tokens, Repositories::in_memory(), metrics)?;
        let router = build_router(state.clone(), cors_layer(&config.allow_origins));
        Ok(Self { router, state })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Response> {
        Ok(self.router.clone().oneshot(request).await?)
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn read_json(response: Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    serde_json::from_slice(&bytes).context("response body is not JSON")
}

pub async fn read_text(response: Response) -> Result<String> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Postgres pool for store tests. `None` when AUTH_TEST_DATABASE_URL is unset.
pub async fn test_pool() -> Result<Option<PgPool>> {
    let Ok(url) = env::var("AUTH_TEST_DATABASE_URL") else {
        eprintln!("Skipping Postgres store tests: set AUTH_TEST_DATABASE_URL to run them.");
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(Some(pool))
}
