pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod middleware;
pub mod tokens;

pub use claims::{SessionClaims, SESSION_TTL_SECONDS};
pub use config::{AuthConfig, BypassRoute, TokenSources};
pub use error::{AuthError, AuthResult};
pub use extractors::Principal;
pub use guards::{ensure_any_permission, ensure_permission, ensure_scoped_permission};
pub use middleware::{authenticate, Authenticator, Outcome};
pub use tokens::TokenService;
