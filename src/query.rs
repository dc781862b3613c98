//! Sorting, searching and tag filtering over song lists.
//!
//! A [`SongQuery`] is built once from the request's keyword and then applied
//! to either freshly fetched songs or a list supplied by the client.

use crate::models::Song;
use feruca::Collator;
use rand::seq::SliceRandom;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongQuery {
    Popularity,
    Recent,
    Alphabetical,
    Random,
    Comments,
    Search(String),
    Tags(Vec<String>),
}

impl SongQuery {
    /// Parses a sort keyword. Search and tag keywords are not sorts and yield
    /// `None`, as does anything unrecognized.
    pub fn sort(keyword: &str) -> Option<Self> {
        match keyword.to_lowercase().as_str() {
            "popularity" => Some(Self::Popularity),
            "recent" => Some(Self::Recent),
            "alphabetical" => Some(Self::Alphabetical),
            "random" => Some(Self::Random),
            "comments" => Some(Self::Comments),
            _ => None,
        }
    }

    /// Parses any list keyword. `search` takes its term from `search_term`,
    /// `tags` takes a comma-separated list from `tags`. Unknown keywords
    /// yield `Ok(None)`; a search without a term is an error.
    pub fn parse(
        keyword: &str,
        search_term: Option<&str>,
        tags: Option<&str>,
    ) -> Result<Option<Self>, String> {
        if let Some(sort) = Self::sort(keyword) {
            return Ok(Some(sort));
        }
        match keyword.to_lowercase().as_str() {
            "search" => search_term
                .map(|term| Some(Self::Search(term.to_string())))
                .ok_or_else(|| "No search term provided".to_string()),
            "tags" => Ok(Some(Self::tags(tags.unwrap_or_default()))),
            _ => Ok(None),
        }
    }

    pub fn tags(raw: &str) -> Self {
        Self::Tags(
            raw.split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        )
    }

    pub fn apply(&self, mut songs: Vec<Song>) -> Vec<Song> {
        match self {
            Self::Popularity => songs.sort_by(|a, b| b.likes.cmp(&a.likes)),
            Self::Recent => songs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::Alphabetical => {
                let mut collator = Collator::default();
                songs.sort_by(|a, b| compare_titles(&mut collator, &a.title, &b.title));
            }
            Self::Random => songs.shuffle(&mut rand::thread_rng()),
            Self::Comments => songs.sort_by(|a, b| b.comments.len().cmp(&a.comments.len())),
            Self::Search(term) => {
                let term = term.to_lowercase();
                songs.retain(|s| s.title.to_lowercase().contains(&term));
            }
            Self::Tags(tags) => {
                let wanted: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
                songs.retain(|s| has_all_tags(s, &wanted));
            }
        }
        songs
    }
}

/// Applies `query` if present, otherwise returns `songs` untouched.
pub fn apply_query(query: Option<&SongQuery>, songs: Vec<Song>) -> Vec<Song> {
    match query {
        Some(query) => query.apply(songs),
        None => songs,
    }
}

// Unicode collation with the root locale: accents sort with their base letter
// and lowercase comes before uppercase. Raw text breaks any remaining tie.
fn compare_titles(collator: &mut Collator, a: &str, b: &str) -> Ordering {
    collator.collate(a, b).then_with(|| a.cmp(b))
}

fn has_all_tags(song: &Song, wanted: &[String]) -> bool {
    let song_tags: Vec<String> = song.tags.iter().map(|t| t.to_lowercase()).collect();
    wanted.iter().all(|tag| song_tags.contains(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Comment;
    use chrono::{Duration, Utc};

    fn song(id: &str, title: &str, likes: u64, comments: usize, age_minutes: i64, tags: &[&str]) -> Song {
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        Song {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            link: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            likes,
            liked_by: (0..likes).map(|i| format!("u{}", i)).collect(),
            is_private: false,
            comments: (0..comments)
                .map(|_| Comment {
                    user_id: "u".to_string(),
                    text: "nice".to_string(),
                    created_at,
                })
                .collect(),
            user: "owner".to_string(),
            created_at,
            updated_at: created_at,
        }
    }

    fn library() -> Vec<Song> {
        vec![
            song("a", "banana", 2, 0, 30, &["Rock", "live"]),
            song("b", "Apple", 5, 3, 10, &["jazz"]),
            song("c", "cherry Pie", 0, 1, 20, &["rock"]),
            song("d", "apple", 5, 2, 40, &[]),
        ]
    }

    fn ids(songs: &[Song]) -> Vec<&str> {
        songs.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_popularity_descending_and_stable() {
        let sorted = SongQuery::Popularity.apply(library());
        assert_eq!(ids(&sorted), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_recent_newest_first() {
        let sorted = SongQuery::Recent.apply(library());
        assert_eq!(ids(&sorted), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_alphabetical_ignores_case() {
        let sorted = SongQuery::Alphabetical.apply(library());
        assert_eq!(ids(&sorted), vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_alphabetical_collates_accents_and_case() {
        let songs = ["zebra", "Éclair", "apple", "Apple", "eclair"]
            .iter()
            .enumerate()
            .map(|(i, title)| song(&i.to_string(), title, 0, 0, 0, &[]))
            .collect();

        let sorted = SongQuery::Alphabetical.apply(songs);
        let titles: Vec<&str> = sorted.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["apple", "Apple", "eclair", "Éclair", "zebra"]);
    }

    #[test]
    fn test_comments_descending() {
        let sorted = SongQuery::Comments.apply(library());
        assert_eq!(ids(&sorted), vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_sorts_are_idempotent() {
        for query in [
            SongQuery::Popularity,
            SongQuery::Recent,
            SongQuery::Alphabetical,
            SongQuery::Comments,
        ] {
            let once = query.apply(library());
            let twice = query.apply(once.clone());
            assert_eq!(ids(&once), ids(&twice), "{:?}", query);
        }
    }

    #[test]
    fn test_random_keeps_all_songs() {
        let shuffled = SongQuery::Random.apply(library());
        let mut got = ids(&shuffled);
        got.sort();
        assert_eq!(got, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let found = SongQuery::Search("APP".to_string()).apply(library());
        assert_eq!(ids(&found), vec!["b", "d"]);

        let found = SongQuery::Search("pie".to_string()).apply(library());
        assert_eq!(ids(&found), vec!["c"]);

        assert!(SongQuery::Search("zzz".to_string()).apply(library()).is_empty());
    }

    #[test]
    fn test_tags_require_every_tag() {
        let found = SongQuery::tags("rock").apply(library());
        assert_eq!(ids(&found), vec!["a", "c"]);

        let found = SongQuery::tags("ROCK,Live").apply(library());
        assert_eq!(ids(&found), vec!["a"]);

        assert!(SongQuery::tags("rock,jazz").apply(library()).is_empty());
    }

    #[test]
    fn test_empty_tags_is_noop() {
        assert_eq!(SongQuery::tags(""), SongQuery::Tags(vec![]));
        assert_eq!(SongQuery::tags(",, ,"), SongQuery::Tags(vec![]));
        let out = SongQuery::tags(",,").apply(library());
        assert_eq!(ids(&out), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(SongQuery::parse("Popularity", None, None), Ok(Some(SongQuery::Popularity)));
        assert_eq!(
            SongQuery::parse("search", Some("x"), None),
            Ok(Some(SongQuery::Search("x".to_string())))
        );
        assert!(SongQuery::parse("search", None, None).is_err());
        assert_eq!(
            SongQuery::parse("tags", None, Some("a,,b")),
            Ok(Some(SongQuery::Tags(vec!["a".to_string(), "b".to_string()])))
        );
        assert_eq!(SongQuery::parse("tags", None, None), Ok(Some(SongQuery::Tags(vec![]))));
        assert_eq!(SongQuery::parse("bogus", None, None), Ok(None));
    }

    #[test]
    fn test_sort_rejects_filters() {
        assert_eq!(SongQuery::sort("RECENT"), Some(SongQuery::Recent));
        assert_eq!(SongQuery::sort("search"), None);
        assert_eq!(SongQuery::sort("tags"), None);
    }

    #[test]
    fn test_apply_query_none_passes_through() {
        let out = apply_query(None, library());
        assert_eq!(ids(&out), vec!["a", "b", "c", "d"]);
    }
}
