//! HTTP Basic authentication for the admin endpoints.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use orolexa_core::error::CoreError;
use subtle::ConstantTimeEq;

use crate::config::AdminCredentials;
use crate::error::AppError;
use crate::state::AppState;

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub username: String,
}

/// Requires valid admin Basic credentials.
///
/// Rejects with 401 on missing or wrong credentials and with 403 when no
/// admin credentials are configured.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(admin): RequireAdmin) -> AppResult<Json<()>> {
///     tracing::info!(user = %admin.username, "handling request");
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AdminUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin.as_ref() else {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin API is not configured".into(),
            )));
        };

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let (username, password) = parse_basic(header).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Basic <credentials>".into(),
            ))
        })?;

        if !credentials_match(expected, &username, &password) {
            tracing::warn!(username, "Rejected admin credentials");
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid admin credentials".into(),
            )));
        }

        Ok(RequireAdmin(AdminUser { username }))
    }
}

/// Decode `Basic base64(user:pass)`.
fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Both fields are always compared, each in constant time.
fn credentials_match(expected: &AdminCredentials, username: &str, password: &str) -> bool {
    let user_ok = username.as_bytes().ct_eq(expected.username.as_bytes());
    let pass_ok = password.as_bytes().ct_eq(expected.password.as_bytes());
    (user_ok & pass_ok).unwrap_u8() == 1
}
