//! songshare - song-sharing REST backend
//!
//! Users register and log in, share songs with title/description/link/tags,
//! like each other's songs, and browse their own or public songs with
//! sorting, search and tag filtering.

use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod query;
pub mod storage;
pub mod user_models;
pub mod user_storage;

use config::{AuthConfig, StorageConfig};
use credentials::CredentialService;
use storage::{SongStorage, SONGS_FILE};
use user_storage::{UserStorage, USERS_FILE};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub songs: Arc<SongStorage>,
    pub users: Arc<UserStorage>,
    pub credentials: Arc<CredentialService>,
}

impl AppState {
    pub fn new(songs: SongStorage, users: UserStorage, credentials: CredentialService) -> Self {
        Self {
            songs: Arc::new(songs),
            users: Arc::new(users),
            credentials: Arc::new(credentials),
        }
    }

    /// State backed by JSON files under the configured data directory.
    pub fn open(storage: &StorageConfig, auth: AuthConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&storage.data_dir)?;
        let songs = SongStorage::open(storage.data_dir.join(SONGS_FILE))?;
        let users = UserStorage::open(storage.data_dir.join(USERS_FILE))?;
        Ok(Self::new(songs, users, CredentialService::new(auth)))
    }

    pub fn in_memory(auth: AuthConfig) -> Self {
        Self::new(
            SongStorage::in_memory(),
            UserStorage::in_memory(),
            CredentialService::new(auth),
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    // Routes behind the bearer token gate
    let protected = Router::new()
        .route("/api/users/me", get(api::users::get_me))
        .route("/api/songs", get(api::songs::get_songs).post(api::songs::create_song))
        // One segment is a list keyword for GET/POST and a song id for PUT/DELETE.
        // The static segments below take precedence over it.
        .route(
            "/api/songs/:query",
            get(api::songs::get_songs_by_query)
                .post(api::songs::get_songs_by_query)
                .put(api::songs::update_song)
                .delete(api::songs::delete_song),
        )
        .route(
            "/api/songs/:query/:package",
            get(api::songs::get_songs_by_query_and_package)
                .post(api::songs::get_songs_by_query_and_package),
        )
        .route("/api/songs/getPublicSongs", get(api::songs::get_public_songs))
        .route(
            "/api/songs/getPublicSongs/:query",
            get(api::songs::get_public_songs_by_query).post(api::songs::get_public_songs_by_query),
        )
        .route(
            "/api/songs/getPublicSongs/:query/:package",
            get(api::songs::get_public_songs_by_query_and_package)
                .post(api::songs::get_public_songs_by_query_and_package),
        )
        .route("/api/songs/getSongById/:id", get(api::songs::get_song_by_id))
        .route(
            "/api/songs/getSongIdsByUserId/:id",
            get(api::songs::get_song_ids_by_user_id),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware::require_user,
        ));

    let public = Router::new()
        .merge(api::health_routes())
        .route("/api/users", post(api::users::register_user))
        .route("/api/users/login", post(api::users::login_user))
        .route("/api/users/:id", get(api::users::get_user_name))
        .route("/api/songs/like/:id/:user_id", post(api::songs::like_song))
        .route("/api/songs/checkSong/:title", get(api::songs::check_song))
        .route("/api/getPublicSongsIds", get(api::songs::get_public_song_ids))
        .route("/api/getPublicSongsById/:id", get(api::songs::get_public_song_by_id))
        .route(
            "/api/sortCurrentSongs/:query",
            get(api::current_songs::sort_current_songs).post(api::current_songs::sort_current_songs),
        )
        .route(
            "/api/filterCurrentSongs",
            get(api::current_songs::filter_current_songs_untagged)
                .post(api::current_songs::filter_current_songs_untagged),
        )
        .route(
            "/api/filterCurrentSongs/:tags",
            get(api::current_songs::filter_current_songs)
                .post(api::current_songs::filter_current_songs),
        )
        .route(
            "/api/searchCurrentSongs/:query",
            get(api::current_songs::search_current_songs)
                .post(api::current_songs::search_current_songs),
        );

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
