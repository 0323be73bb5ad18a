//! Shared-password gate.
//!
//! One password unlocks the site. A correct password sets a session cookie
//! (`site-auth=authenticated` by default); every other request without
//! that cookie is redirected to the login page.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;

use crate::config::AuthConfig;

/// Cookie value marking an authenticated browser
pub const SESSION_VALUE: &str = "authenticated";

pub const LOGIN_PATH: &str = "/login";
pub const LOGIN_API_PATH: &str = "/api/login";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

pub fn check_password(config: &AuthConfig, candidate: &str) -> bool {
    candidate == config.password
}

/// `Set-Cookie` value issued after a successful login
pub fn session_cookie(config: &AuthConfig) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        config.cookie_name,
        SESSION_VALUE,
        config.cookie_max_age_secs()
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Whether any `Cookie` header carries the session cookie
pub fn is_authenticated(config: &AuthConfig, headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(name, value)| name == config.cookie_name && value == SESSION_VALUE)
}

pub fn is_public_path(path: &str) -> bool {
    path == LOGIN_PATH || path == LOGIN_API_PATH
}

/// Middleware: let authenticated or public requests through, redirect the
/// rest to the login page.
pub async fn require_auth(State(config): State<Arc<AuthConfig>>, req: Request, next: Next) -> Response {
    if is_authenticated(&config, req.headers()) || is_public_path(req.uri().path()) {
        return next.run(req).await;
    }
    tracing::debug!(path = %req.uri().path(), "unauthenticated request, redirecting to login");
    Redirect::temporary(LOGIN_PATH).into_response()
}

/// `POST /api/login`. A body that isn't `{"password": ...}` counts as a
/// wrong password.
pub async fn login(State(config): State<Arc<AuthConfig>>, body: Bytes) -> Response {
    let password = serde_json::from_slice::<LoginRequest>(&body)
        .map(|req| req.password)
        .unwrap_or_default();

    if !check_password(&config, &password) {
        tracing::info!("login rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Invalid password"})),
        )
            .into_response();
    }

    tracing::info!("login accepted");
    let mut response = Json(serde_json::json!({"success": true})).into_response();
    match HeaderValue::from_str(&session_cookie(&config)) {
        Ok(cookie) => {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
        Err(err) => {
            tracing::error!(error = %err, "session cookie is not a valid header value");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    response
}

/// `GET /login`
pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_HTML)
}

const LOGIN_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Weekly Planner</title>
</head>
<body>
<form id="login">
  <h1>Weekly Planner</h1>
  <input type="password" name="password" placeholder="Password" autofocus>
  <button type="submit">Enter</button>
  <p id="error" hidden>Incorrect password</p>
</form>
<script>
document.getElementById("login").addEventListener("submit", async (event) => {
  event.preventDefault();
  const input = event.target.password;
  const res = await fetch("/api/login", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ password: input.value }),
  });
  if (res.ok) {
    window.location.href = "/";
  } else {
    document.getElementById("error").hidden = false;
    input.value = "";
  }
});
</script>
</body>
</html>
"#;
