use anyhow::{Context, Result};
use common_auth::{AuthConfig, BypassRoute, TokenSources};
use std::env;

const DEFAULT_BYPASS: &str = "POST /users";
const DEFAULT_PORT: u16 = 8086;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub auth: AuthConfig,
    pub allow_origins: Vec<String>,
    /// Postgres stores when set, in-memory stores otherwise.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
}

pub fn load_service_config() -> Result<ServiceConfig> {
    let sources = TokenSources {
        header: bool_from_env("AUTH_CHECK_HEADER").unwrap_or(true),
        query: bool_from_env("AUTH_CHECK_QUERY").unwrap_or(false),
    };
    let gateway_mode = bool_from_env("AUTH_GATEWAY_MODE").unwrap_or(false);

    let bypass = parse_bypass_routes(
        &env::var("AUTH_BYPASS_ROUTES").unwrap_or_else(|_| DEFAULT_BYPASS.to_string()),
    )
    .context("Failed to parse AUTH_BYPASS_ROUTES")?;

    let mut auth = AuthConfig::new(sources)
        .with_gateway_mode(gateway_mode)
        .with_bypass(bypass);
    if let Some(param) = env::var("AUTH_QUERY_PARAM")
        .ok()
        .and_then(|value| normalize_optional(&value))
    {
        auth = auth.with_query_param(param);
    }

    let allow_origins = env::var("AUTH_ALLOW_ORIGINS")
        .ok()
        .map(|value| parse_list(&value))
        .unwrap_or_default();

    let database_url = env::var("DATABASE_URL")
        .ok()
        .and_then(|value| normalize_optional(&value));

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = match env::var("PORT") {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid PORT '{value}'"))?,
        Err(_) => DEFAULT_PORT,
    };

    Ok(ServiceConfig {
        auth,
        allow_origins,
        database_url,
        host,
        port,
    })
}

fn bool_from_env(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| parse_bool(&value))
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bypass_routes(value: &str) -> Result<Vec<BypassRoute>> {
    value
        .split(|c| c == ',' || c == ';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<BypassRoute>().map_err(anyhow::Error::from))
        .collect()
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
