//! Sort, filter and search over a song list supplied in the request body, so a
//! client can rework a page it already holds without refetching.

use axum::{
    extract::{rejection::JsonRejection, Path},
    Json,
};

use crate::error::{AppError, Result};
use crate::models::{CurrentSongsBody, Song};
use crate::query::{apply_query, SongQuery};

type SuppliedBody = std::result::Result<Json<CurrentSongsBody>, JsonRejection>;

/// NotFound only when no list was sent at all. A list that does not parse is
/// a bad request.
fn supplied_songs(body: SuppliedBody) -> Result<Vec<Song>> {
    match body {
        Ok(Json(CurrentSongsBody { songs: Some(songs) })) => Ok(songs),
        Ok(_) | Err(JsonRejection::MissingJsonContentType(_)) => {
            Err(AppError::NotFound("Songs not found".to_string()))
        }
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

/// GET|POST /api/sortCurrentSongs/:query
pub async fn sort_current_songs(
    Path(query): Path<String>,
    body: SuppliedBody,
) -> Result<Json<Vec<Song>>> {
    let songs = supplied_songs(body)?;
    Ok(Json(apply_query(SongQuery::sort(&query).as_ref(), songs)))
}

/// GET|POST /api/filterCurrentSongs/:tags
pub async fn filter_current_songs(
    Path(tags): Path<String>,
    body: SuppliedBody,
) -> Result<Json<Vec<Song>>> {
    let songs = supplied_songs(body)?;
    if tags == "none" {
        return Ok(Json(songs));
    }
    Ok(Json(SongQuery::tags(&tags).apply(songs)))
}

/// GET|POST /api/filterCurrentSongs
pub async fn filter_current_songs_untagged(
    body: SuppliedBody,
) -> Result<Json<Vec<Song>>> {
    Ok(Json(supplied_songs(body)?))
}

/// GET|POST /api/searchCurrentSongs/:query
pub async fn search_current_songs(
    Path(query): Path<String>,
    body: SuppliedBody,
) -> Result<Json<Vec<Song>>> {
    let songs = supplied_songs(body)?;
    Ok(Json(SongQuery::Search(query).apply(songs)))
}
