// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Password-based session auth.
//!
//! One shared password, hashed into a file under the user's home
//! directory; sessions live in memory with a 24-hour TTL and ride an
//! HttpOnly cookie. When no password has been set up, every request
//! passes.

use super::api_error;
use crate::AppState;
use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;

/// Session lifetime.
const SESSION_TTL_HOURS: i64 = 24;

const COOKIE_NAME: &str = "session_token";

/// In-memory sessions plus the hashed-password file.
pub struct SessionStore {
    password_file: PathBuf,
    sessions: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SessionStore {
    pub fn new(password_file: PathBuf) -> Self {
        Self {
            password_file,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// `~/.taskflow/auth.txt`
    pub fn at_default_path() -> Self {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(".taskflow").join("auth.txt"))
    }

    fn hash_password(password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn stored_hash(&self) -> Option<String> {
        let text = std::fs::read_to_string(&self.password_file).ok()?;
        let text = text.trim().to_string();
        (!text.is_empty()).then_some(text)
    }

    /// Auth is enabled once a password has been set up.
    pub fn auth_enabled(&self) -> bool {
        self.stored_hash().is_some()
    }

    pub fn verify_password(&self, password: &str) -> bool {
        match self.stored_hash() {
            Some(stored) => Self::hash_password(password) == stored,
            None => false,
        }
    }

    pub fn set_password(&self, password: &str) -> std::io::Result<()> {
        if let Some(parent) = self.password_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.password_file, Self::hash_password(password))
    }

    pub fn create_session(&self) -> String {
        let token = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        self.sessions
            .lock()
            .insert(token.clone(), Utc::now() + Duration::hours(SESSION_TTL_HOURS));
        token
    }

    /// True for a known, unexpired token. Expired entries are dropped.
    pub fn verify_session(&self, token: &str) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get(token) {
            Some(expires) if Utc::now() <= *expires => true,
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        }
    }

    pub fn clear_session(&self, token: &str) {
        self.sessions.lock().remove(token);
    }

    #[cfg(test)]
    pub(crate) fn expire_session(&self, token: &str) {
        if let Some(expiry) = self.sessions.lock().get_mut(token) {
            *expiry = Utc::now() - Duration::hours(1);
        }
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == COOKIE_NAME).then(|| value.to_string())
    })
}

fn set_cookie_header(token: &str) -> String {
    format!(
        "{COOKIE_NAME}={token}; HttpOnly; SameSite=Strict; Max-Age={}; Path=/",
        SESSION_TTL_HOURS * 3600
    )
}

fn clear_cookie_header() -> String {
    format!("{COOKIE_NAME}=; HttpOnly; SameSite=Strict; Max-Age=0; Path=/")
}

/// Gate for the protected API: a 401 never creates or mutates state.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.sessions.auth_enabled() {
        return next.run(request).await;
    }
    let authed = session_cookie(request.headers())
        .map(|token| state.sessions.verify_session(&token))
        .unwrap_or(false);
    if !authed {
        return api_error(StatusCode::UNAUTHORIZED, "not authenticated").into_response();
    }
    next.run(request).await
}

#[derive(Deserialize)]
pub struct PasswordBody {
    pub password: String,
}

/// GET /api/auth/status
pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    let authenticated = session_cookie(&headers)
        .map(|token| state.sessions.verify_session(&token))
        .unwrap_or(false);
    Json(json!({
        "authenticated": authenticated,
        "auth_enabled": state.sessions.auth_enabled(),
    }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<PasswordBody>,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    if !state.sessions.auth_enabled() {
        return Err(api_error(StatusCode::BAD_REQUEST, "auth is not enabled"));
    }
    if !state.sessions.verify_password(&body.password) {
        return Err(api_error(StatusCode::UNAUTHORIZED, "wrong password"));
    }

    let token = state.sessions.create_session();
    let mut response =
        Json(json!({ "success": true, "message": "logged in" })).into_response();
    if let Ok(value) = set_cookie_header(&token).parse() {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    Ok(response)
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_cookie(&headers) {
        state.sessions.clear_session(&token);
    }
    let mut response = Json(json!({ "success": true, "message": "logged out" })).into_response();
    if let Ok(value) = clear_cookie_header().parse() {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}

/// POST /api/auth/setup
///
/// First call sets the password with no credentials; once a password
/// exists, changing it requires a live session.
pub async fn setup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PasswordBody>,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    if state.sessions.auth_enabled() {
        let authed = session_cookie(&headers)
            .map(|token| state.sessions.verify_session(&token))
            .unwrap_or(false);
        if !authed {
            return Err(api_error(StatusCode::UNAUTHORIZED, "login required"));
        }
    }
    if body.password.len() < 4 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "password must be at least 4 characters",
        ));
    }
    state
        .sessions
        .set_password(&body.password)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    // Log the caller straight in.
    let token = state.sessions.create_session();
    let mut response =
        Json(json!({ "success": true, "message": "password set" })).into_response();
    if let Ok(value) = set_cookie_header(&token).parse() {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    Ok(response)
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
