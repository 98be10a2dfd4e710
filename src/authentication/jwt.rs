use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::FoodgramError;
use crate::schema::{UserRole, Uuid};

use super::permissions::ActionType;

/// Claims signed by the identity service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub user_uid: UserRole,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub user_uid: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), FoodgramError> {
        if !action.authenticate(self) {
            return Err(FoodgramError::Forbidden);
        }
        Ok(())
    }

    /// Authors may change their own recipes, admins may change any.
    pub fn authorize_author(&self, author_id: Option<Uuid>) -> Result<(), FoodgramError> {
        if self.authenticate(ActionType::ManageAllRecipes).is_ok() {
            return Ok(());
        }

        self.authenticate(ActionType::ManageOwnRecipes)?;
        match author_id {
            Some(author_id) if author_id == self.user_id => Ok(()),
            _ => Err(FoodgramError::Forbidden),
        }
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            user_uid: value.user_uid,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, FoodgramError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|_| FoodgramError::Config(String::from("Invalid session secret")))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<SessionData, FoodgramError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token.verify_with_key(&key).map_err(|e| {
        log::trace!("> Rejected session token: {e}");
        FoodgramError::Unauthenticated
    })?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        log::trace!("> Session of user {} expired", session.user_id);
        return Err(FoodgramError::Unauthenticated);
    }

    Ok(session.into())
}

#[cfg(test)]
pub(crate) fn generate_jwt_session(
    user_id: Uuid,
    username: &str,
    role: UserRole,
    lifetime: chrono::Duration,
    secret: &str,
) -> String {
    use jwt::SignWithKey;

    let now = Local::now();
    let claims = JwtSessionData {
        user_id,
        username: username.to_string(),
        user_uid: role,
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
    };

    claims.sign_with_key(&signing_key(secret).unwrap()).unwrap()
}
