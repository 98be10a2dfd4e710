use std::{convert::Infallible, sync::Arc};

use warp::{reject::Rejection, Filter};

use crate::{constants::SESSION_COOKIE, error::FoodgramError};

use super::jwt::{verify_jwt_session, SessionData};

/// Pulls the raw token out of `Authorization: Token <jwt>` (or `Bearer`),
/// falling back to the session cookie.
fn session_token() -> impl Filter<Extract = (Option<String>,), Error = Infallible> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .map(|header: Option<String>, cookie: Option<String>| {
            header
                .and_then(|value| {
                    value
                        .strip_prefix("Token ")
                        .or_else(|| value.strip_prefix("Bearer "))
                        .map(|token| token.trim().to_string())
                })
                .or(cookie)
        })
        .or(warp::any().map(|| None))
        .unify()
}

pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    session_token().and_then(move |token: Option<String>| {
        let secret = secret.clone();
        async move {
            let token = token.ok_or(FoodgramError::Unauthenticated)?;
            verify_jwt_session(&token, &secret).map_err(Rejection::from)
        }
    })
}

pub fn with_possible_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Infallible> + Clone {
    session_token().map(move |token: Option<String>| {
        token.and_then(|token| verify_jwt_session(&token, &secret).ok())
    })
}
