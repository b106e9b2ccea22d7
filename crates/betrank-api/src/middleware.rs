use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use betrank_types::api::Claims;
use betrank_types::models::Role;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_db;

/// Extract and validate the JWT from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = decode_bearer(req.headers(), &state.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub(crate) fn decode_bearer(headers: &HeaderMap, secret: &str) -> Result<Claims, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Unauthorized
    })?;

    Ok(token_data.claims)
}

/// Admin gate. Runs after `require_auth`; the role comes from the profile
/// row so a demoted admin loses access before their token expires.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .cloned()
        .ok_or(ApiError::Unauthorized)?;

    let uid = claims.sub.to_string();
    let profile = run_db(&state, move |db| db.get_profile_by_id(&uid))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if profile.role.parse::<Role>().ok() != Some(Role::Admin) {
        debug!("{} denied admin route", claims.username);
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use uuid::Uuid;

    use super::*;
    use crate::auth::create_token;

    const SECRET: &str = "test-secret";

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn decodes_a_valid_bearer_token() {
        let user_id = Uuid::new_v4();
        let token = create_token(SECRET, user_id, "alice", Role::User).unwrap();

        let claims = decode_bearer(&bearer(&token), SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn missing_or_foreign_tokens_are_unauthorized() {
        assert!(matches!(decode_bearer(&HeaderMap::new(), SECRET), Err(ApiError::Unauthorized)));
        assert!(matches!(decode_bearer(&bearer("garbage"), SECRET), Err(ApiError::Unauthorized)));

        let token = create_token("other-secret", Uuid::new_v4(), "mallory", Role::Admin).unwrap();
        assert!(matches!(decode_bearer(&bearer(&token), SECRET), Err(ApiError::Unauthorized)));
    }
}
