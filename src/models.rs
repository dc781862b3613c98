use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "user")]
    pub user_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default = "Utc::now", alias = "date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub liked_by: Vec<String>,
    #[serde(default = "default_private")]
    pub is_private: bool,
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Owner id. Set once at creation.
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

fn default_private() -> bool {
    true
}

impl Song {
    pub fn new(owner_id: String, request: CreateSongRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: request.title.unwrap_or_default(),
            description: request.description.unwrap_or_default(),
            link: request.link.unwrap_or_default(),
            tags: request.tags,
            likes: 0,
            liked_by: Vec::new(),
            is_private: request.is_private.unwrap_or(true),
            comments: Vec::new(),
            user: owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user == user_id
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.liked_by.iter().any(|id| id == user_id)
    }

    /// Flips `user_id` in `liked_by` and resyncs the counter. Returns whether
    /// the song is liked by the user afterwards.
    pub fn toggle_like(&mut self, user_id: &str) -> bool {
        let liked = if self.is_liked_by(user_id) {
            self.liked_by.retain(|id| id != user_id);
            false
        } else {
            self.liked_by.push(user_id.to_string());
            true
        };
        self.likes = self.liked_by.len() as u64;
        self.updated_at = Utc::now();
        liked
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSongRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_private: Option<bool>,
}

impl CreateSongRequest {
    pub fn validate(&self) -> Result<(), String> {
        if is_blank(&self.title) {
            return Err("No song title provided".to_string());
        }
        if is_blank(&self.description) {
            return Err("Song description is required".to_string());
        }
        if is_blank(&self.link) {
            return Err("Song link is required".to_string());
        }
        Ok(())
    }
}

/// Fields a song owner may change. Counters, likers and ownership are not
/// part of this set.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_private: Option<bool>,
}

impl SongChanges {
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("title", &self.title),
            ("description", &self.description),
            ("link", &self.link),
        ];
        for (field, value) in required {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(format!("Song {} cannot be empty", field));
            }
        }
        Ok(())
    }

    pub fn apply(self, song: &mut Song) {
        if let Some(title) = self.title {
            song.title = title;
        }
        if let Some(description) = self.description {
            song.description = description;
        }
        if let Some(link) = self.link {
            song.link = link;
        }
        if let Some(tags) = self.tags {
            song.tags = tags;
        }
        if let Some(is_private) = self.is_private {
            song.is_private = is_private;
        }
        song.updated_at = Utc::now();
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Body for the search branch of the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct QueryBody {
    pub package: Option<String>,
}

/// Body for the caller-supplied-set endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct CurrentSongsBody {
    pub songs: Option<Vec<Song>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteSongResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckSongResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str) -> CreateSongRequest {
        CreateSongRequest {
            title: Some(title.to_string()),
            description: Some("desc".to_string()),
            link: Some("https://example.com/a".to_string()),
            tags: vec!["rock".to_string()],
            is_private: None,
        }
    }

    #[test]
    fn test_new_song_defaults() {
        let song = Song::new("owner".to_string(), request("Song1"));
        assert_eq!(song.likes, 0);
        assert!(song.liked_by.is_empty());
        assert!(song.comments.is_empty());
        assert!(song.is_private);
        assert!(song.is_owned_by("owner"));
    }

    #[test]
    fn test_toggle_like_keeps_counter_in_sync() {
        let mut song = Song::new("owner".to_string(), request("Song1"));

        assert!(song.toggle_like("b"));
        assert_eq!(song.likes, 1);
        assert_eq!(song.liked_by, vec!["b".to_string()]);

        assert!(!song.toggle_like("b"));
        assert_eq!(song.likes, 0);
        assert!(song.liked_by.is_empty());
    }

    #[test]
    fn test_create_request_requires_title() {
        let mut req = request("  ");
        assert!(req.validate().is_err());
        req.title = None;
        assert_eq!(req.validate().unwrap_err(), "No song title provided");
        assert!(request("ok").validate().is_ok());
    }

    #[test]
    fn test_changes_reject_empty_fields() {
        let changes = SongChanges {
            link: Some(String::new()),
            ..Default::default()
        };
        assert!(changes.validate().is_err());
        assert!(SongChanges::default().validate().is_ok());
    }

    #[test]
    fn test_changes_apply_only_given_fields() {
        let mut song = Song::new("owner".to_string(), request("Song1"));
        SongChanges {
            title: Some("Renamed".to_string()),
            is_private: Some(false),
            ..Default::default()
        }
        .apply(&mut song);

        assert_eq!(song.title, "Renamed");
        assert_eq!(song.description, "desc");
        assert!(!song.is_private);
        assert_eq!(song.user, "owner");
    }

    #[test]
    fn test_deserialize_client_supplied_song() {
        let json = r#"{"_id":"s1","title":"T","user":"u1","likes":3,"likedBy":["a","b","c"]}"#;
        let song: Song = serde_json::from_str(json).unwrap();
        assert_eq!(song.id, "s1");
        assert_eq!(song.likes, 3);
        assert!(song.is_private);
        assert!(song.tags.is_empty());
    }

    #[test]
    fn test_deserialize_song_without_owner() {
        let json = r#"{"_id":"1","title":"Beta","tags":["rock"]}"#;
        let song: Song = serde_json::from_str(json).unwrap();
        assert_eq!(song.user, "");
        assert_eq!(song.likes, 0);
    }
}
