//! Per-request authentication.
//!
//! Steps run strictly in order: bypass check, token extraction, token
//! validation, subject parsing, principal resolution, injection. The first
//! failing step rejects the request with a generic 401.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::{header::AUTHORIZATION, Extensions, HeaderMap, Method, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use common_rbac::{ResolveError, RoleResolver, UserWithRoles};
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::extractors::Principal;
use crate::tokens::TokenService;

/// Result of a successful pass through the authenticator.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Route or gateway mode skipped authentication; nothing is injected.
    Bypassed,
    Authenticated(UserWithRoles),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Bypassed => "bypassed",
            Outcome::Authenticated(_) => "authenticated",
        }
    }

    /// Store the principal (if any) in request extensions.
    pub fn inject(self, extensions: &mut Extensions) {
        if let Outcome::Authenticated(principal) = self {
            extensions.insert(Principal::new(principal));
        }
    }
}

#[derive(Clone)]
pub struct Authenticator {
    config: Arc<AuthConfig>,
    tokens: Arc<TokenService>,
    resolver: RoleResolver,
}

impl Authenticator {
    /// Fails with [`AuthError::NoTokenSource`] when `config` enables no token source.
    pub fn new(
        config: AuthConfig,
        tokens: Arc<TokenService>,
        resolver: RoleResolver,
    ) -> AuthResult<Self> {
        if config.sources.is_empty() {
            return Err(AuthError::NoTokenSource);
        }
        Ok(Self {
            config: Arc::new(config),
            tokens,
            resolver,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    pub async fn authenticate(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
    ) -> AuthResult<Outcome> {
        if self.config.is_bypassed(method, uri.path()) {
            debug!(%method, path = uri.path(), "authentication bypassed");
            return Ok(Outcome::Bypassed);
        }

        let token = self.extract_token(uri, headers)?;
        let claims = self.tokens.validate_token(&token)?;
        let user_id = claims.user_id()?;

        match self.resolver.load_full_user(user_id).await {
            Ok(principal) => Ok(Outcome::Authenticated(principal)),
            Err(ResolveError::UserNotFound) => {
                debug!(%user_id, "token subject has no user");
                Err(AuthError::PrincipalUnavailable)
            }
            Err(ResolveError::Store(err)) => {
                warn!(%user_id, error = %err, "principal resolution failed");
                Err(AuthError::PrincipalUnavailable)
            }
        }
    }

    /// Authenticate `request`, then either forward it to `next` with the
    /// principal injected or answer with the rejection.
    ///
    /// `observe` sees the outcome before the request moves on.
    pub async fn run<F>(&self, request: Request, next: Next, observe: F) -> Response
    where
        F: FnOnce(Result<&Outcome, &AuthError>) + Send,
    {
        // Body is not Sync, so only the parts are borrowed across the await.
        let (mut parts, body) = request.into_parts();
        let result = self
            .authenticate(&parts.method, &parts.uri, &parts.headers)
            .await;
        observe(result.as_ref());
        match result {
            Ok(outcome) => {
                outcome.inject(&mut parts.extensions);
                next.run(Request::from_parts(parts, body)).await
            }
            Err(err) => err.into_response(),
        }
    }

    /// Header first, then the query parameter, limited to the enabled sources.
    fn extract_token(&self, uri: &Uri, headers: &HeaderMap) -> AuthResult<String> {
        let sources = self.config.sources;
        if sources.header {
            if let Some(token) = token_from_header(headers)? {
                return Ok(token);
            }
        }
        if sources.query {
            if let Some(token) = token_from_query(uri, &self.config.query_param) {
                return Ok(token);
            }
        }
        Err(AuthError::MissingToken)
    }
}

fn token_from_header(headers: &HeaderMap) -> AuthResult<Option<String>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let raw = value.to_str().map_err(|_| AuthError::InvalidToken)?.trim_start();
    // Prefix is matched before trimming so a bare "Bearer " reads as empty.
    let token = match raw.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest,
        _ => raw,
    }
    .trim();
    if token.is_empty() {
        return Ok(None);
    }
    Ok(Some(token.to_owned()))
}

fn token_from_query(uri: &Uri, param: &str) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params
        .get(param)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// axum middleware: use with `middleware::from_fn_with_state(authenticator, authenticate)`.
pub async fn authenticate(
    State(auth): State<Authenticator>,
    request: Request,
    next: Next,
) -> Response {
    auth.run(request, next, |_| {}).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenSources;
    use axum::http::HeaderValue;
    use common_rbac::Repositories;

    #[test]
    fn header_token_accepts_bearer_and_raw() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(
            token_from_header(&headers).unwrap().as_deref(),
            Some("abc.def.ghi")
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("abc.def.ghi"));
        assert_eq!(
            token_from_header(&headers).unwrap().as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn bearer_prefix_needs_a_separator() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("  Bearer\tabc.def.ghi "));
        assert_eq!(
            token_from_header(&headers).unwrap().as_deref(),
            Some("abc.def.ghi")
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearerabc.def.ghi"));
        assert_eq!(
            token_from_header(&headers).unwrap().as_deref(),
            Some("Bearerabc.def.ghi")
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert_eq!(token_from_header(&headers).unwrap(), None);
    }

    #[test]
    fn authenticator_requires_a_token_source() {
        let tokens = Arc::new(
            TokenService::with_secret(TokenSources::HEADER, "authenticator-source-check-secret")
                .unwrap(),
        );
        let resolver = RoleResolver::new(Repositories::in_memory());

        let err = Authenticator::new(
            AuthConfig::new(TokenSources::NONE),
            tokens.clone(),
            resolver.clone(),
        )
        .err()
        .expect("no source enabled");
        assert!(matches!(err, AuthError::NoTokenSource));

        assert!(Authenticator::new(AuthConfig::new(TokenSources::QUERY), tokens, resolver).is_ok());
    }

    #[test]
    fn empty_header_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer    "));
        assert_eq!(token_from_header(&headers).unwrap(), None);
        assert_eq!(token_from_header(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn query_token_is_read_from_named_param() {
        let uri: Uri = "/me?page=2&token=abc.def.ghi".parse().unwrap();
        assert_eq!(token_from_query(&uri, "token").as_deref(), Some("abc.def.ghi"));
        assert_eq!(token_from_query(&uri, "session"), None);

        let bare: Uri = "/me".parse().unwrap();
        assert_eq!(token_from_query(&bare, "token"), None);

        let blank: Uri = "/me?token=".parse().unwrap();
        assert_eq!(token_from_query(&blank, "token"), None);
    }
}
