use serde_json::json;
use warp::{http::StatusCode, reply::Response};

use crate::{
    actions::login_user,
    context::Context,
    jwt::SessionData,
    middleware::revoke_session,
    serialization::users::LoginPayload,
};

use super::routes::{json_response, no_content};

// POST /api/auth/token/login/
pub async fn login(payload: LoginPayload, ctx: Context) -> Result<Response, potion::Error> {
    let (email, password) = payload
        .validate()
        .map_err(|e| -> potion::Error { e.into() })?;
    let token = login_user(
        &email,
        &password,
        &ctx.config.secret_key,
        ctx.config.token_lifetime(),
        &ctx.pool,
    )
    .await?;

    Ok(json_response(&json!({ "auth_token": token }), StatusCode::OK))
}

// POST /api/auth/token/logout/
pub async fn logout(session: SessionData, ctx: Context) -> Result<Response, potion::Error> {
    let mut cache = ctx.cache.connection().await?;
    revoke_session(&session, &mut cache).await?;

    log::debug!("> Revoked session of {}", session.username);
    Ok(no_content())
}
