//! Song handlers: listing with sort/search/tag queries, CRUD and likes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{debug, info};

use crate::api::auth_middleware::ensure_owner;
use crate::error::{AppError, Result};
use crate::models::{
    CheckSongResponse, CreateSongRequest, DeleteSongResponse, QueryBody, Song, SongChanges,
};
use crate::query::{apply_query, SongQuery};
use crate::user_models::PublicUser;
use crate::AppState;

const SONG_NOT_FOUND: &str = "Song not found";

/// Builds the query for a list endpoint. The search term comes from the body's
/// `package` field, falling back to the path; tags come from the path.
fn list_query(
    keyword: &str,
    body: Option<Json<QueryBody>>,
    package: Option<&str>,
) -> Result<Option<SongQuery>> {
    let body_term = body.and_then(|Json(b)| b.package);
    let search_term = body_term.as_deref().or(package);
    SongQuery::parse(keyword, search_term, package).map_err(AppError::BadRequest)
}

async fn my_songs(state: &AppState, user: &PublicUser, query: Option<SongQuery>) -> Result<Vec<Song>> {
    let songs = state.songs.get_songs_for_user(&user.id).await?;
    debug!(user_id = %user.id, count = songs.len(), ?query, "Listing songs");
    Ok(apply_query(query.as_ref(), songs))
}

async fn public_songs(state: &AppState, query: Option<SongQuery>) -> Result<Vec<Song>> {
    let songs = state.songs.get_public_songs().await?;
    debug!(count = songs.len(), ?query, "Listing public songs");
    Ok(apply_query(query.as_ref(), songs))
}

/// GET /api/songs - songs the user owns or has liked
pub async fn get_songs(
    State(state): State<AppState>,
    Extension(user): Extension<PublicUser>,
) -> Result<Json<Vec<Song>>> {
    Ok(Json(my_songs(&state, &user, None).await?))
}

/// GET /api/songs/:query
pub async fn get_songs_by_query(
    State(state): State<AppState>,
    Extension(user): Extension<PublicUser>,
    Path(query): Path<String>,
    body: Option<Json<QueryBody>>,
) -> Result<Json<Vec<Song>>> {
    let query = list_query(&query, body, None)?;
    Ok(Json(my_songs(&state, &user, query).await?))
}

/// GET /api/songs/:query/:package
pub async fn get_songs_by_query_and_package(
    State(state): State<AppState>,
    Extension(user): Extension<PublicUser>,
    Path((query, package)): Path<(String, String)>,
    body: Option<Json<QueryBody>>,
) -> Result<Json<Vec<Song>>> {
    let query = list_query(&query, body, Some(&package))?;
    Ok(Json(my_songs(&state, &user, query).await?))
}

/// GET /api/songs/getPublicSongs
pub async fn get_public_songs(State(state): State<AppState>) -> Result<Json<Vec<Song>>> {
    Ok(Json(public_songs(&state, None).await?))
}

/// GET /api/songs/getPublicSongs/:query
pub async fn get_public_songs_by_query(
    State(state): State<AppState>,
    Path(query): Path<String>,
    body: Option<Json<QueryBody>>,
) -> Result<Json<Vec<Song>>> {
    let query = list_query(&query, body, None)?;
    Ok(Json(public_songs(&state, query).await?))
}

/// GET /api/songs/getPublicSongs/:query/:package
pub async fn get_public_songs_by_query_and_package(
    State(state): State<AppState>,
    Path((query, package)): Path<(String, String)>,
    body: Option<Json<QueryBody>>,
) -> Result<Json<Vec<Song>>> {
    let query = list_query(&query, body, Some(&package))?;
    Ok(Json(public_songs(&state, query).await?))
}

/// POST /api/songs
pub async fn create_song(
    State(state): State<AppState>,
    Extension(user): Extension<PublicUser>,
    Json(payload): Json<CreateSongRequest>,
) -> Result<(StatusCode, Json<Song>)> {
    payload.validate().map_err(AppError::BadRequest)?;

    let song = state.songs.add_song(Song::new(user.id.clone(), payload)).await?;
    info!(song_id = %song.id, user_id = %user.id, "Created song");

    Ok((StatusCode::CREATED, Json(song)))
}

/// PUT /api/songs/:id - owner only
pub async fn update_song(
    State(state): State<AppState>,
    Extension(user): Extension<PublicUser>,
    Path(id): Path<String>,
    Json(changes): Json<SongChanges>,
) -> Result<Json<Song>> {
    let song = find_song(&state, &id).await?;
    ensure_owner(&song, &user)?;
    changes.validate().map_err(AppError::BadRequest)?;

    let updated = state
        .songs
        .update_song(&id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound(SONG_NOT_FOUND.to_string()))?;
    info!(song_id = %id, user_id = %user.id, "Updated song");

    Ok(Json(updated))
}

/// DELETE /api/songs/:id - owner only
pub async fn delete_song(
    State(state): State<AppState>,
    Extension(user): Extension<PublicUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteSongResponse>> {
    let song = find_song(&state, &id).await?;
    ensure_owner(&song, &user)?;

    // The song may have been removed between the lookup and here
    if !state.songs.delete_song(&id).await? {
        return Err(AppError::NotFound(SONG_NOT_FOUND.to_string()));
    }
    info!(song_id = %id, user_id = %user.id, "Deleted song");

    Ok(Json(DeleteSongResponse { id }))
}

/// GET /api/songs/getSongById/:id
pub async fn get_song_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Song>> {
    Ok(Json(find_song(&state, &id).await?))
}

/// GET /api/songs/getSongIdsByUserId/:id
pub async fn get_song_ids_by_user_id(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<String>>> {
    Ok(Json(state.songs.get_song_ids_by_owner(&user_id).await?))
}

/// POST /api/songs/like/:id/:user_id - toggles the user's like
pub async fn like_song(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Json<Song>> {
    find_song(&state, &id).await?;
    state
        .users
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let song = state
        .songs
        .toggle_like(&id, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(SONG_NOT_FOUND.to_string()))?;
    debug!(song_id = %id, user_id = %user_id, likes = song.likes, "Toggled like");

    Ok(Json(song))
}

/// GET /api/songs/checkSong/:title
pub async fn check_song(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<CheckSongResponse>> {
    if title.trim().is_empty() {
        return Err(AppError::BadRequest("No song title provided".to_string()));
    }

    let exists = state.songs.title_exists(&title).await?;
    Ok(Json(CheckSongResponse {
        message: exists.to_string(),
    }))
}

/// GET /api/getPublicSongsIds
pub async fn get_public_song_ids(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let songs = state.songs.get_public_songs().await?;
    Ok(Json(songs.into_iter().map(|s| s.id).collect()))
}

/// GET /api/getPublicSongsById/:id - private songs are reported as missing
pub async fn get_public_song_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Song>> {
    let song = find_song(&state, &id).await?;
    if song.is_private {
        return Err(AppError::NotFound(SONG_NOT_FOUND.to_string()));
    }
    Ok(Json(song))
}

async fn find_song(state: &AppState, id: &str) -> Result<Song> {
    state
        .songs
        .get_song(id)
        .await?
        .ok_or_else(|| AppError::NotFound(SONG_NOT_FOUND.to_string()))
}
