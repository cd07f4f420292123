use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use super::jwt::{verify_jwt_session, SessionData};
use crate::error::CoreError;

/// Reads the token from the `session` cookie, falling back to an
/// `Authorization: Bearer` header.
fn with_token() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>("session")
        .and(warp::header::optional::<String>("authorization"))
        .map(|cookie: Option<String>, header: Option<String>| {
            cookie.or_else(|| {
                header.and_then(|value| value.strip_prefix("Bearer ").map(str::to_owned))
            })
        })
}

pub fn with_session(
    secret: Arc<String>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_token().and_then(move |token: Option<String>| {
        let secret = secret.clone();
        async move {
            let token = token.ok_or_else(|| {
                Rejection::from(CoreError::InvalidSession("Invalid session; Missing token".to_owned()))
            })?;

            verify_jwt_session(&token, &secret)
                .map(SessionData::from)
                .map_err(Rejection::from)
        }
    })
}

/// Anonymous requests and invalid tokens both extract `None`.
pub fn with_possible_session(
    secret: Arc<String>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    with_token().map(move |token: Option<String>| {
        token.and_then(|token| match verify_jwt_session(&token, &secret) {
            Ok(data) => Some(data.into()),
            Err(e) => {
                log::trace!("> Ignoring session: {e}");
                None
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jwt::generate_jwt_session,
        schema::{User, UserRole},
    };

    fn token(secret: &str) -> String {
        let user = User {
            id: 9,
            username: "cook".to_owned(),
            email: "cook@example.com".to_owned(),
            first_name: String::new(),
            last_name: String::new(),
            password: String::new(),
            role: UserRole::User,
        };
        generate_jwt_session(&user, secret).unwrap()
    }

    #[tokio::test]
    async fn session_from_cookie() {
        let secret = Arc::new("s3cret".to_owned());
        let session = warp::test::request()
            .header("cookie", format!("session={}", token("s3cret")))
            .filter(&with_session(secret))
            .await
            .unwrap();

        assert_eq!(session.user_id, 9);
    }

    #[tokio::test]
    async fn session_from_bearer_header() {
        let secret = Arc::new("s3cret".to_owned());
        let session = warp::test::request()
            .header("authorization", format!("Bearer {}", token("s3cret")))
            .filter(&with_possible_session(secret))
            .await
            .unwrap();

        assert_eq!(session.map(|s| s.user_id), Some(9));
    }

    #[tokio::test]
    async fn anonymous_request() {
        let secret = Arc::new("s3cret".to_owned());

        let possible = warp::test::request()
            .filter(&with_possible_session(secret.clone()))
            .await
            .unwrap();
        let required = warp::test::request()
            .filter(&with_session(secret))
            .await;

        assert!(possible.is_none());
        assert!(required.is_err());
    }
}
