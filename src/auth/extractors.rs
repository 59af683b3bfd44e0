use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::warn;

use crate::auth::{claims::TokenKind, jwt::JwtKeys, services::account};
use crate::db::Database;
use crate::error::internal;

/// Validates the bearer access token and yields the acting user's id.
///
/// The account behind the token is looked up on every request, so a token
/// issued before a suspension or a deletion stops working at once.
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    Database: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "missing Authorization header".to_string(),
            ))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".to_string()))?;

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            (
                StatusCode::UNAUTHORIZED,
                "invalid or expired token".to_string(),
            )
        })?;

        if claims.kind != TokenKind::Access {
            return Err((
                StatusCode::UNAUTHORIZED,
                "access token required".to_string(),
            ));
        }

        let db = Database::from_ref(state);
        match account(&db, claims.sub).await.map_err(internal)? {
            Some(acct) if acct.suspended => {
                warn!(user_id = claims.sub, "token of suspended account");
                Err((StatusCode::FORBIDDEN, "account suspended".to_string()))
            }
            Some(_) => Ok(AuthUser(claims.sub)),
            None => Err((
                StatusCode::UNAUTHORIZED,
                "account no longer exists".to_string(),
            )),
        }
    }
}
