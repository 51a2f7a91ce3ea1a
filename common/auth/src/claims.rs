use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

/// Lifetime of a session token.
pub const SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;

/// Claim set carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Stringified user id.
    pub id: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(user_id: Uuid, issued_at: DateTime<Utc>) -> Self {
        let iat = issued_at.timestamp();
        let exp = (issued_at + Duration::seconds(SESSION_TTL_SECONDS)).timestamp();
        Self {
            id: user_id.to_string(),
            iat,
            nbf: iat,
            exp,
        }
    }

    pub fn user_id(&self) -> AuthResult<Uuid> {
        Uuid::parse_str(&self.id).map_err(|_| AuthError::InvalidSubject)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_twelve_hours_after_issue() {
        let issued = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let claims = SessionClaims::new(Uuid::new_v4(), issued);
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp - claims.iat, 43_200);
        assert_eq!(
            claims.expires_at(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap())
        );
        assert_eq!(claims.issued_at(), Some(issued));
    }

    #[test]
    fn wire_shape_uses_short_names() {
        let claims = SessionClaims::new(Uuid::nil(), Utc.timestamp_opt(0, 0).unwrap());
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["iat"], 0);
        assert_eq!(json["nbf"], 0);
        assert_eq!(json["exp"], 43_200);
    }

    #[test]
    fn malformed_subject_is_rejected() {
        let mut claims = SessionClaims::new(Uuid::new_v4(), Utc::now());
        claims.id = "not-a-uuid".into();
        assert!(matches!(claims.user_id(), Err(AuthError::InvalidSubject)));
    }
}
