//! Authentication and authorization utilities
//!
//! Provides:
//! - JWT token generation and validation
//! - Caller identity extraction from bearer tokens

use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Scope required for any mutating endpoint
pub const WRITE_SCOPE: &str = "write";

/// Scope that implies every other scope
pub const ADMIN_SCOPE: &str = "admin";

/// Authenticated caller resolved from the bearer token
#[derive(Debug, Clone)]
pub struct Caller {
    /// Credential ID of the caller (token subject)
    pub credential_id: Uuid,

    /// Tenant the token was issued for
    pub tenant_id: Uuid,

    /// Scopes/permissions
    pub scopes: Vec<String>,
}

impl Caller {
    /// Check if the caller has a specific scope
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope || s == ADMIN_SCOPE)
    }

    /// Require a specific scope, returning error if not present
    pub fn require_scope(&self, scope: &str) -> Result<()> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: format!("Missing required scope: {}", scope),
            })
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (credential ID)
    pub sub: String,

    /// Tenant ID
    pub tenant_id: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Scopes
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: i64::try_from(expiration_secs).unwrap_or(i64::MAX),
        }
    }

    /// Generate a new JWT token
    pub fn generate_token(
        &self,
        credential_id: Uuid,
        tenant_id: Uuid,
        scopes: Vec<String>,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: credential_id.to_string(),
            tenant_id: tenant_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            scopes,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }

    /// Resolve the caller identity carried by a token
    pub fn caller(&self, token: &str) -> Result<Caller> {
        let claims = self.validate_token(token)?;

        let credential_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
        let tenant_id = Uuid::parse_str(&claims.tenant_id).map_err(|_| AppError::InvalidToken)?;

        Ok(Caller {
            credential_id,
            tenant_id,
            scopes: claims.scopes,
        })
    }
}

/// Extract the token from a `Bearer` Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum extractor for the authenticated caller
impl<S> FromRequestParts<S> for Caller
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer_token(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Authorization header must carry a bearer token".to_string(),
        })?;

        let jwt = <Arc<JwtManager> as FromRef<S>>::from_ref(state);
        jwt.caller(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("abc.def"), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);

        let credential_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let scopes = vec!["read".to_string(), "write".to_string()];

        let token = manager
            .generate_token(credential_id, tenant_id, scopes.clone())
            .unwrap();
        let caller = manager.caller(&token).unwrap();

        assert_eq!(caller.credential_id, credential_id);
        assert_eq!(caller.tenant_id, tenant_id);
        assert_eq!(caller.scopes, scopes);
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let issuer = JwtManager::new("issuer_secret", 3600);
        let verifier = JwtManager::new("other_secret", 3600);

        let token = issuer
            .generate_token(Uuid::new_v4(), Uuid::new_v4(), vec![])
            .unwrap();

        assert!(matches!(verifier.caller(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let manager = JwtManager::new("test_secret", 3600);
        let claims = JwtClaims {
            sub: Uuid::new_v4().to_string(),
            tenant_id: Uuid::new_v4().to_string(),
            exp: Utc::now().timestamp() - 3600,
            iat: Utc::now().timestamp() - 7200,
            scopes: vec![],
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test_secret".as_bytes()),
        )
        .unwrap();

        assert!(matches!(manager.validate_token(&token), Err(AppError::ExpiredToken)));
    }

    #[test]
    fn test_scopes() {
        let caller = Caller {
            credential_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            scopes: vec!["read".to_string()],
        };
        assert!(caller.has_scope("read"));
        assert!(caller.require_scope(WRITE_SCOPE).is_err());

        let admin = Caller {
            scopes: vec![ADMIN_SCOPE.to_string()],
            ..caller
        };
        assert!(admin.require_scope(WRITE_SCOPE).is_ok());
    }
}
