//! Session cookie middleware
//!
//! Mirrors the original "create a session on first contact" behavior:
//! every request passes through here, an unknown or missing token gets
//! a fresh session, and the opaque token travels back on a cookie.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::state::AppState;

/// Cookie carrying the opaque session token
pub const SESSION_COOKIE: &str = "wb_session";

/// Request extension holding the resolved session id
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

/// Resolve (or issue) the session for this request and re-issue the
/// cookie when a new session was allocated.
pub async fn ensure_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let (session_id, is_new) = state.sessions.ensure(token.as_deref()).await;

    req.extensions_mut().insert(SessionId(session_id.clone()));
    let response = next.run(req).await;

    if is_new {
        let cookie = Cookie::build((SESSION_COOKIE, session_id))
            .path("/")
            .http_only(true)
            .build();
        (jar.add(cookie), response).into_response()
    } else {
        response
    }
}
