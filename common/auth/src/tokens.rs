use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use crate::claims::SessionClaims;
use crate::config::TokenSources;
use crate::error::{AuthError, AuthResult};

/// Length of the generated signing secret.
pub const SECRET_LEN: usize = 128;

/// Issues and validates HS256 session tokens.
///
/// The signing secret lives only in this value; restarting the process
/// invalidates every outstanding token.
pub struct TokenService {
    sources: TokenSources,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Build a service with a freshly generated secret.
    ///
    /// Fails when no token source is enabled; callers treat this as fatal.
    pub fn new(sources: TokenSources) -> AuthResult<Self> {
        Self::with_secret(sources, &generate_secret())
    }

    pub fn with_secret(sources: TokenSources, secret: &str) -> AuthResult<Self> {
        if sources.is_empty() {
            return Err(AuthError::NoTokenSource);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "iat"]);

        Ok(Self {
            sources,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn sources(&self) -> TokenSources {
        self.sources
    }

    pub fn issue_token(&self, user_id: Uuid) -> AuthResult<String> {
        self.issue_token_at(user_id, Utc::now())
    }

    pub fn issue_token_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> AuthResult<String> {
        let claims = SessionClaims::new(user_id, issued_at);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> AuthResult<SessionClaims> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => {
                    AuthError::ExpiredToken
                }
                _ => AuthError::InvalidToken,
            },
        )?;
        debug!(subject = %data.claims.id, "validated session token");
        Ok(data.claims)
    }
}

fn generate_secret() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}
