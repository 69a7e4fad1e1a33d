use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::{ApiError, HtmlError};
use crate::schema::{Id, User, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub jti: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            role,
            jti: uuid::Uuid::new_v4().to_string(),
            iat,
            exp,
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub jti: String,
    pub expires_at: i64,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), potion::Error> {
        if !action.authenticate(&self.role) {
            return Err(ApiError::PermissionDenied.default());
        }
        Ok(())
    }
}

impl Into<SessionData> for JwtSessionData {
    fn into(self) -> SessionData {
        SessionData {
            username: self.username,
            user_id: self.user_id,
            role: self.role,
            jti: self.jti,
            expires_at: self.exp,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, potion::Error> {
    Hmac::new_from_slice(secret.as_bytes()).map_err(|e| {
        log::error!("Invalid signing key: {e}");
        HtmlError::InternalServerError.default()
    })
}

pub fn generate_jwt_session(
    user: &User,
    secret: &str,
    lifetime: Duration,
) -> Result<String, potion::Error> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.role.to_owned(),
        lifetime,
    );

    claims.sign_with_key(&key).map_err(|e| {
        log::error!("Failed to sign session: {e}");
        HtmlError::InternalServerError.default()
    })
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, potion::Error> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| HtmlError::Unauthorized.new("Invalid token."))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(HtmlError::Unauthorized.new("Token expired."));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn user(role: UserRole) -> User {
        User {
            id: 42,
            email: "chef@example.com".to_string(),
            username: "chef".to_string(),
            first_name: "Julia".to_string(),
            last_name: "Child".to_string(),
            password: String::new(),
            role,
        }
    }

    #[test]
    fn session_round_trip() {
        let token = generate_jwt_session(&user(UserRole::Admin), SECRET, Duration::hours(1)).unwrap();
        let session: SessionData = verify_jwt_session(&token, SECRET).unwrap().into();

        assert_eq!(session.user_id, 42);
        assert_eq!(session.username, "chef");
        assert_eq!(session.role, UserRole::Admin);
        assert!(!session.jti.is_empty());
    }

    #[test]
    fn every_token_has_its_own_id() {
        let a = generate_jwt_session(&user(UserRole::User), SECRET, Duration::hours(1)).unwrap();
        let b = generate_jwt_session(&user(UserRole::User), SECRET, Duration::hours(1)).unwrap();

        let a = verify_jwt_session(&a, SECRET).unwrap();
        let b = verify_jwt_session(&b, SECRET).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = generate_jwt_session(&user(UserRole::User), "other", Duration::hours(1)).unwrap();
        let error = verify_jwt_session(&token, SECRET).unwrap_err();

        assert_eq!(error.code as u16, 401);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_jwt_session("not.a.token", SECRET).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = JwtSessionData::new(1, "late".to_string(), UserRole::User, Duration::hours(-2));
        let token = claims.sign_with_key(&signing_key(SECRET).unwrap()).unwrap();

        let error = verify_jwt_session(&token, SECRET).unwrap_err();
        assert_eq!(error.info.as_deref(), Some("Token expired."));
    }
}
