//! Request parsing: path parameters, caller scope, JSON bodies and query
//! strings
//!
//! Every extractor rejects with an [`AppError`] so failures render through
//! the shared JSON error body.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRef, FromRequest, FromRequestParts, Query, RawPathParams, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use talentforge_common::{
    auth::{Caller, JwtManager, WRITE_SCOPE},
    config::AppConfig,
    errors::{AppError, Result},
    pagination::{Page, PageParams},
};
use tracing::warn;
use uuid::Uuid;

// ============================================================================
// Path parameters
// ============================================================================

/// Named path parameters of the matched route
#[derive(Debug, Clone)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    /// Parse the named parameter as a UUID
    pub fn uuid(&self, name: &str) -> Result<Uuid> {
        let raw = self
            .0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| AppError::Parse {
                name: name.to_string(),
                message: format!("missing path parameter {}", name),
            })?;

        Uuid::parse_str(raw).map_err(|_| AppError::Parse {
            name: name.to_string(),
            message: format!("{} is not a valid identifier: {}", name, raw),
        })
    }

    pub fn tenant_id(&self) -> Result<Uuid> {
        self.uuid("tenant_id")
    }
}

impl<S> FromRequestParts<S> for PathParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let raw = RawPathParams::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::Parse {
                name: "path".to_string(),
                message: e.body_text(),
            })?;

        Ok(Self(
            raw.iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        ))
    }
}

// ============================================================================
// Caller scope
// ============================================================================

/// Tenant from the path together with the authenticated caller
///
/// The token must have been issued for the tenant named in the path.
#[derive(Debug, Clone)]
pub struct Scope {
    pub tenant_id: Uuid,
    pub caller: Caller,
    pub params: PathParams,
}

impl Scope {
    /// Credential id of a caller allowed to mutate, for provenance fields
    pub fn writer(&self) -> Result<Uuid> {
        self.caller.require_scope(WRITE_SCOPE)?;
        Ok(self.caller.credential_id)
    }

    pub fn uuid(&self, name: &str) -> Result<Uuid> {
        self.params.uuid(name)
    }
}

impl<S> FromRequestParts<S> for Scope
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let params = PathParams::from_request_parts(parts, state).await?;
        let tenant_id = params.tenant_id()?;
        let caller = Caller::from_request_parts(parts, state).await?;

        if caller.tenant_id != tenant_id {
            warn!(
                path_tenant = %tenant_id,
                token_tenant = %caller.tenant_id,
                credential_id = %caller.credential_id,
                "Token used outside its tenant"
            );
            return Err(AppError::TenantMismatch);
        }

        Ok(Self {
            tenant_id,
            caller,
            params,
        })
    }
}

/// Scope for routes that still carry `{credential_id}` in the path
///
/// The path credential must name the token subject.
#[derive(Debug, Clone)]
pub struct LegacyScope(pub Scope);

impl<S> FromRequestParts<S> for LegacyScope
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let scope = Scope::from_request_parts(parts, state).await?;
        let credential_id = scope.uuid("credential_id")?;

        warn!(
            path = %parts.uri.path(),
            credential_id = %credential_id,
            "Legacy credential path used"
        );

        if credential_id != scope.caller.credential_id {
            return Err(AppError::forbidden(
                "path credential does not match the authenticated caller",
            ));
        }

        Ok(Self(scope))
    }
}

// ============================================================================
// Body and query
// ============================================================================

/// JSON body decoder; any structural failure is a decode error
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection: JsonRejection| AppError::Decode {
                message: rejection.body_text(),
            })
    }
}

/// Typed filter read from the query string
#[derive(Debug, Clone, Default)]
pub struct Filter<T>(pub T);

impl<T, S> FromRequestParts<S> for Filter<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(query_error)
    }
}

/// Page window from `limit`/`offset`, resolved against the configured limits
#[derive(Debug, Clone, Copy)]
pub struct Paging(pub Page);

impl<S> FromRequestParts<S> for Paging
where
    Arc<AppConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Query(params) = Query::<PageParams>::from_request_parts(parts, state)
            .await
            .map_err(query_error)?;
        let config = <Arc<AppConfig> as FromRef<S>>::from_ref(state);

        Page::resolve(params, &config.pagination).map(Self)
    }
}

fn query_error(rejection: QueryRejection) -> AppError {
    AppError::Parse {
        name: "query".to_string(),
        message: rejection.body_text(),
    }
}
