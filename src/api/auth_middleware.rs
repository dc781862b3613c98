//! Bearer token gate and the song ownership guard.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, Result};
use crate::models::Song;
use crate::user_models::PublicUser;
use crate::AppState;

const NOT_AUTHORIZED: &str = "Not authorized to access this route";

/// Resolves the bearer token to a user and stores it in the request
/// extensions as a [`PublicUser`]. The downstream handler is never invoked
/// when this fails.
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(&request)
        .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

    let user_id = state.credentials.verify_token(token)?;

    let user = state.users.get_user(&user_id).await?.ok_or_else(|| {
        tracing::warn!(user_id = %user_id, "Token for unknown user");
        AppError::Unauthorized(NOT_AUTHORIZED.to_string())
    })?;

    request.extensions_mut().insert(PublicUser::from(&user));
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Only the owner may update or delete a song.
pub fn ensure_owner(song: &Song, user: &PublicUser) -> Result<()> {
    if song.is_owned_by(&user.id) {
        Ok(())
    } else {
        tracing::warn!(song_id = %song.id, user_id = %user.id, "Rejected non-owner mutation");
        Err(AppError::Unauthorized("Not authorized".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateSongRequest;
    use crate::user_models::User;

    #[test]
    fn test_ensure_owner() {
        let owner = User::new("alice".into(), "a@x.com".into(), "h".into());
        let other = User::new("bob".into(), "b@x.com".into(), "h".into());
        let song = Song::new(
            owner.id.clone(),
            CreateSongRequest {
                title: Some("Song1".into()),
                ..Default::default()
            },
        );

        assert!(ensure_owner(&song, &PublicUser::from(&owner)).is_ok());
        assert!(matches!(
            ensure_owner(&song, &PublicUser::from(&other)),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let request = |value: &str| {
            axum::http::Request::builder()
                .header(AUTHORIZATION, value)
                .body(axum::body::Body::empty())
                .unwrap()
        };

        assert_eq!(bearer_token(&request("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&request("Basic abc")), None);
        assert_eq!(bearer_token(&request("Bearer ")), None);

        let bare = axum::http::Request::builder().body(axum::body::Body::empty()).unwrap();
        assert_eq!(bearer_token(&bare), None);
    }
}
