use chrono::Local;
use redis::aio::MultiplexedConnection;
use warp::{http::Method, reject::Rejection, Filter};

use crate::{
    cache::cache::{cache_value_exists, set_expiring_cache_value},
    constants::REVOKED_SESSION_PREFIX,
    context::{with_context, Context},
    error::{reject, HtmlError, NOT_AUTHENTICATED},
};

use super::{
    jwt::{verify_jwt_session, SessionData},
    permissions::has_permission,
};

/// Accepts `Token <jwt>` and `Bearer <jwt>`.
fn extract_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        return Some(token);
    }
    None
}

fn revoked_key(jti: &str) -> String {
    format!("{REVOKED_SESSION_PREFIX}-{jti}")
}

pub async fn is_session_revoked(
    jti: &str,
    cache: &mut MultiplexedConnection,
) -> Result<bool, potion::Error> {
    cache_value_exists(revoked_key(jti), cache).await
}

/// Marks the session's token unusable until it would have expired anyway.
pub async fn revoke_session(
    session: &SessionData,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let remaining = (session.expires_at - Local::now().timestamp()).max(1) as u64;
    set_expiring_cache_value(revoked_key(&session.jti), 1, remaining, cache).await
}

async fn resolve_session(
    header: Option<String>,
    ctx: Context,
) -> Result<Option<SessionData>, potion::Error> {
    let header = match header {
        Some(header) => header,
        None => return Ok(None),
    };

    let token = extract_token(&header)
        .ok_or_else(|| HtmlError::Unauthorized.new("Invalid token header."))?;
    let session: SessionData = verify_jwt_session(token, &ctx.config.secret_key)?.into();

    let mut cache = ctx.cache.connection().await?;
    if is_session_revoked(&session.jti, &mut cache).await? {
        return Err(HtmlError::Unauthorized.new("Invalid token."));
    }

    log::trace!("> Session for {}", session.username);
    Ok(Some(session))
}

/// The caller's session, if the request carries one. Invalid credentials are still rejected.
pub fn with_possible_session(
    ctx: Context,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_context(ctx))
        .and_then(|header: Option<String>, ctx: Context| async move {
            resolve_session(header, ctx).await.map_err(reject)
        })
}

/// The caller's session; anonymous callers are rejected with 401.
pub fn with_session(ctx: Context) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_possible_session(ctx)
        .and(warp::method())
        .and_then(|session: Option<SessionData>, method: Method| async move {
            has_permission(&method, session.as_ref()).map_err(reject)?;
            session.ok_or_else(|| reject(HtmlError::Unauthorized.new(NOT_AUTHENTICATED)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_schemes() {
        assert_eq!(extract_token("Token abc.def"), Some("abc.def"));
        assert_eq!(extract_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_token("token   abc "), Some("abc"));
        assert_eq!(extract_token("Basic abc"), None);
        assert_eq!(extract_token("Token "), None);
        assert_eq!(extract_token("abc"), None);
    }

    #[test]
    fn revoked_keys_are_prefixed() {
        assert_eq!(revoked_key("123"), "revoked-session-123");
    }
}
