use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use support_core::models::Participant;

use crate::errors::AppError;
use crate::models::{CurrentUser, Envelope, LoginRequest, LogoutResponse};
use crate::routes::session::{session_cookie, SESSION_COOKIE};
use crate::service::auth_service::AuthService;

/// POST `/api/auth/login` : sets the session cookie
pub async fn login_handler(
    State(auth): State<AuthService>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<Envelope<Participant>>), AppError> {
    let (token, user) = auth.login(&body.name, body.role).await?;
    Ok((jar.add(session_cookie(token)), Json(Envelope::success(user))))
}

/// POST `/api/auth/logout`
pub async fn logout_handler(
    State(auth): State<AuthService>,
    jar: CookieJar,
) -> (CookieJar, Json<Envelope<LogoutResponse>>) {
    let logged_out = match jar.get(SESSION_COOKIE) {
        Some(cookie) => auth.logout(cookie.value()).await,
        None => false,
    };
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(Envelope::success(LogoutResponse { logged_out })))
}

/// GET `/api/auth/me` : 401 when not logged in
pub async fn me_handler(CurrentUser(user): CurrentUser) -> Json<Envelope<Participant>> {
    Json(Envelope::success(user))
}
