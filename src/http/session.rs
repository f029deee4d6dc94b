//! Session resolution for the HTTP API.
//!
//! The session layer never rejects a request. It attaches a
//! [`SessionUser`] extension when the caller proves an identity and
//! leaves the request untouched otherwise; handlers that need a user
//! answer 401 themselves.
//!
//! # Configuration
//!
//! - `STENCIL_JWT_SECRET`: HS256 secret; enables bearer-token sessions.
//! - `STENCIL_JWT_ISSUER`: Optional. Expected issuer claim.
//!
//! Without a secret, `server.trust_user_header` accepts a numeric
//! `x-user-id` header instead. That mode is for local development only.

use super::AppState;
use crate::models::UserId;
use crate::{Error, Result};
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation, decode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Environment variable holding the JWT secret.
pub const JWT_SECRET_ENV: &str = "STENCIL_JWT_SECRET";
/// Environment variable holding the expected issuer.
pub const JWT_ISSUER_ENV: &str = "STENCIL_JWT_ISSUER";
/// Development header naming the user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Minimum secret key length.
const MIN_SECRET_LENGTH: usize = 32;

/// Minimum number of distinct characters in a secret.
const MIN_UNIQUE_CHARS: usize = 8;

const WEAK_PATTERNS: [&str; 8] = [
    "password", "secret", "123456", "abcdef", "qwerty", "000000", "111111", "aaaaaa",
];

/// Rejects secrets that are short, repetitive, or contain well-known
/// patterns.
///
/// # Errors
///
/// Returns `InvalidInput` describing the first problem found.
pub fn validate_secret(secret: &str) -> Result<()> {
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(Error::InvalidInput(format!(
            "JWT secret must be at least {MIN_SECRET_LENGTH} characters (got {})",
            secret.len()
        )));
    }

    let unique: HashSet<char> = secret.chars().collect();
    if unique.len() < MIN_UNIQUE_CHARS {
        return Err(Error::InvalidInput(format!(
            "JWT secret has insufficient entropy: only {} unique characters (minimum: {MIN_UNIQUE_CHARS})",
            unique.len()
        )));
    }

    let lowercase = secret.to_lowercase();
    if let Some(pattern) = WEAK_PATTERNS.iter().find(|p| lowercase.contains(*p)) {
        return Err(Error::InvalidInput(format!(
            "JWT secret contains weak pattern '{pattern}'"
        )));
    }

    Ok(())
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject; a numeric user id.
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: u64,
    /// Issued at time (Unix timestamp).
    #[serde(default)]
    pub iat: u64,
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// JWT validation settings.
#[derive(Clone)]
pub struct JwtConfig {
    secret: String,
    issuer: Option<String>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl JwtConfig {
    /// Reads the JWT configuration from the environment.
    ///
    /// Returns `Ok(None)` when no secret is set.
    ///
    /// # Errors
    ///
    /// Returns an error if a secret is set but too weak.
    pub fn from_env() -> Result<Option<Self>> {
        let Some(secret) = std::env::var(JWT_SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
        else {
            return Ok(None);
        };
        validate_secret(&secret)?;

        let issuer = std::env::var(JWT_ISSUER_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty());
        Ok(Some(Self { secret, issuer }))
    }

    /// Creates a configuration with an explicit secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
        }
    }

    /// Sets the expected issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}

/// Validates bearer tokens.
#[derive(Clone)]
pub struct JwtAuthenticator {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl JwtAuthenticator {
    /// Creates an authenticator from configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(config.secret.as_bytes())),
            validation,
        }
    }

    /// Validates a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the token is invalid or expired.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let data: TokenData<Claims> = decode(token, &self.decoding_key, &self.validation)
            .map_err(|e| Error::Unauthorized(format!("invalid token: {e}")))?;
        Ok(data.claims)
    }

    /// Resolves the user from an `Authorization: Bearer` header value.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the header is malformed, the token is
    /// invalid, or the subject is not a numeric user id.
    pub fn user_from_header(&self, auth_header: &str) -> Result<UserId> {
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| Error::Unauthorized("invalid Authorization header format".to_string()))?;
        let claims = self.validate(token.trim())?;
        UserId::parse(&claims.sub).ok_or_else(|| {
            Error::Unauthorized(format!("subject '{}' is not a user id", claims.sub))
        })
    }
}

/// How the session layer identifies callers.
#[derive(Debug, Clone, Default)]
pub enum SessionResolver {
    /// Bearer tokens signed with the configured secret.
    Jwt(JwtAuthenticator),
    /// Trust a numeric `x-user-id` header.
    TrustedHeader,
    /// No identity source; every request is anonymous.
    #[default]
    Anonymous,
}

impl SessionResolver {
    /// Picks a resolver from the environment and server settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured JWT secret is too weak.
    pub fn from_env(trust_user_header: bool) -> Result<Self> {
        if let Some(config) = JwtConfig::from_env()? {
            return Ok(Self::Jwt(JwtAuthenticator::new(&config)));
        }
        if trust_user_header {
            tracing::warn!("Trusting x-user-id header for sessions; do not use in production");
            return Ok(Self::TrustedHeader);
        }
        tracing::warn!("No session source configured; all requests are anonymous");
        Ok(Self::Anonymous)
    }

    /// Resolves the caller, if any.
    #[must_use]
    pub fn resolve(&self, headers: &HeaderMap) -> Option<UserId> {
        match self {
            Self::Jwt(authenticator) => {
                let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
                match authenticator.user_from_header(value) {
                    Ok(user) => Some(user),
                    Err(e) => {
                        tracing::debug!(error = %e, "Ignoring unusable bearer token");
                        None
                    },
                }
            },
            Self::TrustedHeader => headers
                .get(USER_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(UserId::parse),
            Self::Anonymous => None,
        }
    }
}

/// Authenticated caller, stored as a request extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for SessionUser {
    type Rejection = super::ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .copied()
            .ok_or_else(|| Error::Unauthorized("no session user".to_string()).into())
    }
}

/// Attaches a [`SessionUser`] when the caller can be identified.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(user) = state.session.resolve(request.headers()) {
        request.extensions_mut().insert(SessionUser(user));
    }
    next.run(request).await
}
