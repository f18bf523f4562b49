//! Authentication route handlers.
//!
//! Email and password accounts. The logged-in user lives in the session; the
//! session id is cycled on login and registration.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Registration payload.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub referral_code: Option<String>,
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The logged-in user as returned to the frontend.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Option<CurrentUser>,
}

async fn log_in(session: &Session, user: &User) -> Result<CurrentUser> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    };
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(current)
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account and log in.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool())
        .register(Registration {
            email: &body.email,
            password: &body.password,
            display_name: body.display_name.as_deref(),
            referral_code: body.referral_code.as_deref(),
        })
        .await?;

    log_in(&session, &user).await?;
    add_breadcrumb("auth", "User registered", None);

    if let Err(e) = state
        .email()
        .send_welcome(user.email.as_str(), user.greeting_name(), &user.referral_code)
        .await
    {
        warn!(user_id = %user.id, error = %e, "Welcome email failed");
    }

    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in with email and password.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<CurrentUser>> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    let current = log_in(&session, &user).await?;
    add_breadcrumb("auth", "User logged in", None);
    Ok(Json(current))
}

/// Log out. The cart is kept with the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The current user, or `null` when logged out.
pub async fn me(OptionalAuth(user): OptionalAuth) -> Json<MeResponse> {
    Json(MeResponse { user })
}
