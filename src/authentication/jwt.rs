use chrono::{Duration, Local};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    constants::SESSION_LIFETIME_HOURS,
    error::CoreError,
    schema::{Id, User, UserRole},
};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn new(user_id: Id, username: String, role: UserRole) -> Self {
        Self {
            user_id,
            username,
            is_admin: role == UserRole::Admin,
            role,
        }
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), CoreError> {
        if !action.authenticate(self) {
            return Err(CoreError::PermissionDenied(
                "You don't have permission to perform this action".to_owned(),
            ));
        }
        Ok(())
    }

    /// Own resources need `own`, everyone else's need `all`.
    pub fn authenticate_owner(
        &self,
        owner_id: Id,
        own: ActionType,
        all: ActionType,
    ) -> Result<(), CoreError> {
        if owner_id == self.user_id {
            self.authenticate(own)
        } else {
            self.authenticate(all)
        }
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData::new(value.user_id, value.username, value.role)
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, CoreError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|_| CoreError::Fatal("Invalid JWT secret".to_owned()))
}

pub fn generate_jwt_session(user: &User, secret: &str) -> Result<String, CoreError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role.to_owned());

    claims.sign_with_key(&key).map_err(|e| {
        log::error!("Failed to sign session: {e}");
        CoreError::Fatal("Could not sign session".to_owned())
    })
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, CoreError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| CoreError::InvalidSession("Invalid session; Invalid token".to_owned()))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(CoreError::InvalidSession(
            "Invalid session; Token expired".to_owned(),
        ));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: 4,
            username: "cook".to_owned(),
            email: "cook@example.com".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Cook".to_owned(),
            password: String::new(),
            role,
        }
    }

    #[test]
    fn signed_session_verifies_with_the_same_secret() {
        let token = generate_jwt_session(&user(UserRole::Admin), "s3cret").unwrap();
        let session: SessionData = verify_jwt_session(&token, "s3cret").unwrap().into();

        assert_eq!(session.user_id, 4);
        assert_eq!(session.username, "cook");
        assert!(session.is_admin);
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = generate_jwt_session(&user(UserRole::User), "s3cret").unwrap();

        assert!(matches!(
            verify_jwt_session(&token, "other"),
            Err(CoreError::InvalidSession(_))
        ));
    }

    #[test]
    fn expired_session_is_rejected() {
        let key = signing_key("s3cret").unwrap();
        let mut claims = JwtSessionData::new(4, "cook".to_owned(), UserRole::User);
        claims.exp = claims.iat - 10;
        let token = claims.sign_with_key(&key).unwrap();

        assert!(matches!(
            verify_jwt_session(&token, "s3cret"),
            Err(CoreError::InvalidSession(info)) if info.contains("expired")
        ));
    }
}
