use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use cookie::Cookie;
use sqlx::PgPool;

use crate::config::AppConfig;

/// SessionUser
///
/// The identity a validated session token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    /// Display name, resolved alongside the session.
    pub name: String,
}

/// SessionService
///
/// Abstract contract for resolving an opaque session token to a user. Tokens
/// are issued and rotated by the external auth system; this service only
/// validates them against the session store.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Returns the session's user when the token matches a live session,
    /// `None` for unknown or expired tokens. Never errors: every failure
    /// mode degrades to "no session".
    async fn validate_session_token(&self, token: &str) -> Option<SessionUser>;
}

/// SessionState
///
/// The concrete type used to share session validation across the application
/// state.
pub type SessionState = Arc<dyn SessionService>;

/// PostgresSessionService
///
/// Session validation backed by the `sessions` table the external auth system
/// writes. The token doubles as the session id; expiry is checked in the
/// query so a stale row behaves exactly like a missing one.
pub struct PostgresSessionService {
    pool: PgPool,
}

impl PostgresSessionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionService for PostgresSessionService {
    async fn validate_session_token(&self, token: &str) -> Option<SessionUser> {
        let row: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT u.id, u.name
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = $1 AND s.expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("validate_session_token error: {:?}", e);
            None
        });

        row.map(|(id, name)| SessionUser { id, name })
    }
}

/// MockSessionService
///
/// In-memory token table used by tests. No database round-trip; a token is
/// valid exactly when it was registered via `with_session`.
#[derive(Default)]
pub struct MockSessionService {
    sessions: HashMap<String, SessionUser>,
}

impl MockSessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: &str, user_id: &str, name: &str) -> Self {
        self.sessions.insert(
            token.to_string(),
            SessionUser {
                id: user_id.to_string(),
                name: name.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl SessionService for MockSessionService {
    async fn validate_session_token(&self, token: &str) -> Option<SessionUser> {
        self.sessions.get(token).cloned()
    }
}

/// Viewer
///
/// The identity (or absence thereof) behind a request. Resolution is soft:
/// a missing cookie, an unknown token, or an expired session all degrade to
/// the anonymous viewer rather than rejecting the request. Listing handlers
/// use this extractor so anonymous traffic still gets the public slice.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub user: Option<SessionUser>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    /// The id bound into access predicates. Anonymous viewers yield the
    /// empty string, which can never equal a document's author id.
    pub fn predicate_id(&self) -> &str {
        self.user.as_ref().map(|u| u.id.as_str()).unwrap_or("")
    }
}

/// session_token_from_headers
///
/// Pulls the session token out of the `Cookie` request header, if present.
/// The cookie name comes from AppConfig rather than a process-wide constant.
fn session_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE).and_then(|v| v.to_str().ok())?;

    cookie_header.split(';').find_map(|raw| {
        let cookie = Cookie::parse(raw.trim()).ok()?;
        (cookie.name() == cookie_name).then(|| cookie.value().to_string())
    })
}

/// Viewer Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making Viewer usable as a
/// function argument in any handler. The rejection type is Infallible:
/// resolution can only narrow what a handler returns, never reject the
/// request.
///
/// The process:
/// 1. Dependency Resolution: SessionState and AppConfig from the app state.
/// 2. Cookie Extraction: the configured session cookie, if presented.
/// 3. Token Validation: one-shot lookup via the SessionService collaborator.
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    SessionState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let Some(token) = session_token_from_headers(&parts.headers, &config.session_cookie_name)
        else {
            return Ok(Viewer::anonymous());
        };

        match sessions.validate_session_token(&token).await {
            Some(user) => Ok(Viewer { user: Some(user) }),
            None => Ok(Viewer::anonymous()),
        }
    }
}

/// AuthViewer
///
/// Hard variant of `Viewer` for routes that require a session.
///
/// Rejection: Returns StatusCode::UNAUTHORIZED (401) when resolution yields
/// the anonymous viewer.
#[derive(Debug, Clone)]
pub struct AuthViewer {
    pub user: SessionUser,
}

impl<S> FromRequestParts<S> for AuthViewer
where
    S: Send + Sync,
    SessionState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let viewer = Viewer::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});

        viewer
            .user
            .map(|user| AuthViewer { user })
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
