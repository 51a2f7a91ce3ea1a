use std::str::FromStr;

use axum::http::Method;

use crate::error::AuthError;

/// Default query parameter carrying a session token.
pub const DEFAULT_QUERY_PARAM: &str = "token";

/// Where the middleware looks for a session token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenSources {
    /// Read the `Authorization` header.
    pub header: bool,
    /// Read the token query parameter.
    pub query: bool,
}

impl TokenSources {
    pub const NONE: Self = Self {
        header: false,
        query: false,
    };
    pub const HEADER: Self = Self {
        header: true,
        query: false,
    };
    pub const QUERY: Self = Self {
        header: false,
        query: true,
    };
    pub const BOTH: Self = Self {
        header: true,
        query: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.header && !self.query
    }
}

/// A route that is served without authentication, e.g. account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassRoute {
    pub method: Method,
    pub path: String,
}

impl BypassRoute {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        &self.method == method && self.path == path
    }
}

impl FromStr for BypassRoute {
    type Err = AuthError;

    /// Parses `"POST /users"`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || AuthError::InvalidBypassRoute(value.to_string());
        let mut parts = value.split_whitespace();
        let method = parts.next().ok_or_else(invalid)?;
        let path = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() || !path.starts_with('/') {
            return Err(invalid());
        }
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| invalid())?;
        Ok(Self::new(method, path))
    }
}

/// Runtime configuration for request authentication.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub sources: TokenSources,
    /// Trust an upstream gateway and skip authentication entirely.
    pub gateway_mode: bool,
    pub bypass: Vec<BypassRoute>,
    pub query_param: String,
}

impl AuthConfig {
    /// Construct config with account creation (`POST /users`) left open.
    pub fn new(sources: TokenSources) -> Self {
        Self {
            sources,
            gateway_mode: false,
            bypass: vec![BypassRoute::new(Method::POST, "/users")],
            query_param: DEFAULT_QUERY_PARAM.to_string(),
        }
    }

    pub fn with_gateway_mode(mut self, enabled: bool) -> Self {
        self.gateway_mode = enabled;
        self
    }

    pub fn with_bypass(mut self, routes: Vec<BypassRoute>) -> Self {
        self.bypass = routes;
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>) -> Self {
        self.query_param = name.into();
        self
    }

    pub fn is_bypassed(&self, method: &Method, path: &str) -> bool {
        self.gateway_mode || self.bypass.iter().any(|route| route.matches(method, path))
    }
}
