use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderValue, StatusCode, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::{
    config::{AppConfig, Env},
    error::AuthError,
    models::Role,
    policy,
    repository::RepositoryState,
    session::{Session, SessionState, SessionToken},
};

/// Name of the cookie carrying the signed identity.
pub const AUTH_COOKIE: &str = "gallery_auth";

/// Header honoured only in `Env::Local` with `DEV_IDENTITY_BYPASS` set: its value is taken
/// as the caller's username.
pub const DEV_IDENTITY_HEADER: &str = "x-username";

/// Claims
///
/// Payload of the identity cookie. It names who logged in and which server-side
/// session backs the login. The role is deliberately not a claim: it is read from the
/// user store on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the username.
    pub sub: String,
    /// Server-side session this token is bound to.
    pub sid: SessionToken,
    pub iat: usize,
    pub exp: usize,
}

/// issue_identity_cookie
///
/// Signs the claims for `session` and renders the `Set-Cookie` value. The cookie is
/// HttpOnly, SameSite=Lax and persistent for `auth_cookie_days`.
pub fn issue_identity_cookie(
    config: &AppConfig,
    session: &Session,
) -> Result<HeaderValue, AuthError> {
    let now = Utc::now();
    let lifetime = config.auth_cookie_lifetime();
    let claims = Claims {
        sub: session.username.clone(),
        sid: session.token,
        iat: now.timestamp() as usize,
        exp: (now + lifetime).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.cookie_secret.as_bytes()),
    )?;

    let cookie = Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.env == Env::Production)
        .build();

    let header = format!("{}; Max-Age={}", cookie, lifetime.num_seconds());
    Ok(HeaderValue::from_str(&header)?)
}

/// clear_identity_cookie
///
/// A `Set-Cookie` value that makes the browser drop the identity cookie.
pub fn clear_identity_cookie() -> HeaderValue {
    let mut cookie = Cookie::build((AUTH_COOKIE, "")).path("/").http_only(true).build();
    cookie.make_removal();
    HeaderValue::from_str(&cookie.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("gallery_auth=; Path=/; Max-Age=0"))
}

/// decode_claims
///
/// Verifies signature and expiry. Any failure means "not logged in".
pub fn decode_claims(config: &AppConfig, token: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.cookie_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .ok()
}

/// Identity
///
/// Who is calling, if anyone. Resolution never fails: a missing, tampered, expired or
/// orphaned cookie all yield the anonymous identity.
///
/// A cookie is only accepted while the session store still binds its `sid` to the same
/// username, so logout and idle expiry take effect even though the signed token itself
/// is still within its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub username: Option<String>,
    pub session: Option<SessionToken>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    SessionState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        // Local Development Bypass
        if config.env == Env::Local && config.dev_identity_bypass {
            if let Some(username) = parts
                .headers
                .get(DEV_IDENTITY_HEADER)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
            {
                return Ok(Identity {
                    username: Some(username.to_string()),
                    session: None,
                });
            }
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(AUTH_COOKIE) else {
            return Ok(Identity::anonymous());
        };

        let Some(claims) = decode_claims(&config, cookie.value()) else {
            return Ok(Identity::anonymous());
        };

        let sessions = SessionState::from_ref(state);
        match sessions.identity_of(claims.sid).await {
            Some(username) if username == claims.sub => Ok(Identity {
                username: Some(username),
                session: Some(claims.sid),
            }),
            _ => Ok(Identity::anonymous()),
        }
    }
}

/// AuthUser
///
/// An authenticated caller together with the role resolved for this request. Used as
/// the extractor behind the authenticated router; anonymous callers are rejected with
/// 401 before any handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub username: String,
    pub role: Role,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    SessionState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = match Identity::from_request_parts(parts, state).await {
            Ok(identity) => identity,
            Err(never) => match never {},
        };

        let username = identity.username.ok_or(StatusCode::UNAUTHORIZED)?;

        let repo = RepositoryState::from_ref(state);
        let role = policy::resolve_role(repo.as_ref(), Some(&username))
            .await
            .map_err(|e| {
                tracing::error!("role resolution failed: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

        Ok(AuthUser { username, role })
    }
}
