use crate::models::{Song, SongChanges};
use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

pub const SONGS_FILE: &str = "songs.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error(transparent)]
    Persist(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub struct SongStorage {
    songs: RwLock<Vec<Song>>,
    path: Option<PathBuf>,
}

impl SongStorage {
    /// Opens the store backed by `path`, loading existing records if the file
    /// is present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let songs = load_from_disk(&path)?;
        tracing::debug!(count = songs.len(), path = %path.display(), "Loaded songs");

        Ok(Self {
            songs: RwLock::new(songs),
            path: Some(path),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            songs: RwLock::new(Vec::new()),
            path: None,
        }
    }

    pub async fn add_song(&self, song: Song) -> Result<Song> {
        let mut songs = self.songs.write().await;
        let mut next = songs.clone();
        next.push(song.clone());
        self.commit(&mut songs, next)?;
        Ok(song)
    }

    pub async fn get_song(&self, id: &str) -> Result<Option<Song>> {
        let songs = self.songs.read().await;
        Ok(songs.iter().find(|s| s.id == id).cloned())
    }

    /// Songs the user owns or has liked.
    pub async fn get_songs_for_user(&self, user_id: &str) -> Result<Vec<Song>> {
        let songs = self.songs.read().await;
        Ok(songs
            .iter()
            .filter(|s| s.is_owned_by(user_id) || s.is_liked_by(user_id))
            .cloned()
            .collect())
    }

    pub async fn get_public_songs(&self) -> Result<Vec<Song>> {
        let songs = self.songs.read().await;
        Ok(songs.iter().filter(|s| !s.is_private).cloned().collect())
    }

    pub async fn get_song_ids_by_owner(&self, user_id: &str) -> Result<Vec<String>> {
        let songs = self.songs.read().await;
        Ok(songs
            .iter()
            .filter(|s| s.is_owned_by(user_id))
            .map(|s| s.id.clone())
            .collect())
    }

    pub async fn title_exists(&self, title: &str) -> Result<bool> {
        let title = title.to_lowercase();
        let songs = self.songs.read().await;
        Ok(songs.iter().any(|s| s.title.to_lowercase() == title))
    }

    pub async fn update_song(&self, id: &str, changes: SongChanges) -> Result<Option<Song>> {
        let mut songs = self.songs.write().await;
        let mut next = songs.clone();

        let Some(song) = next.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        changes.apply(song);
        let updated = song.clone();

        self.commit(&mut songs, next)?;
        Ok(Some(updated))
    }

    /// Returns false when no record with `id` was present.
    pub async fn delete_song(&self, id: &str) -> Result<bool> {
        let mut songs = self.songs.write().await;

        let next: Vec<Song> = songs.iter().filter(|s| s.id != id).cloned().collect();
        if next.len() == songs.len() {
            return Ok(false);
        }

        self.commit(&mut songs, next)?;
        Ok(true)
    }

    /// Flips the user's like on a song under the write lock, so concurrent
    /// toggles on the same song cannot lose updates.
    pub async fn toggle_like(&self, id: &str, user_id: &str) -> Result<Option<Song>> {
        let mut songs = self.songs.write().await;
        let mut next = songs.clone();

        let Some(song) = next.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        song.toggle_like(user_id);
        let updated = song.clone();

        self.commit(&mut songs, next)?;
        Ok(Some(updated))
    }

    /// Persists `next` and only then makes it the live list. On a failed
    /// write the in-memory songs stay as they were.
    fn commit(&self, songs: &mut Vec<Song>, next: Vec<Song>) -> Result<()> {
        if let Some(path) = &self.path {
            save_to_disk(path, &next)?;
        }
        *songs = next;
        Ok(())
    }
}

pub(crate) fn load_from_disk<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read storage file {}", path.display()))?;
    let records = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse storage file {}", path.display()))?;
    Ok(records)
}

pub(crate) fn save_to_disk<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write to storage file {}", path.display()))?;
    Ok(())
}
