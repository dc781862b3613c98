use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use prettytable::{Cell, Row, Table};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use songshare::models::{CheckSongResponse, CreateSongRequest, DeleteSongResponse, Song};
use songshare::user_models::{LoginResponse, PublicUser, RegisterResponse};
use std::fs;
use std::path::Path;

const SESSION_FILE: &str = ".session";

#[derive(Parser)]
#[command(name = "songshare")]
#[command(about = "A CLI client for the songshare service", long_about = None)]
struct Cli {
    #[arg(long, env = "SONGSHARE_API_URL", default_value = "http://localhost:5000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a new account")]
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    #[command(about = "Log in and store the session token")]
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    #[command(about = "Forget the stored session")]
    Logout,

    #[command(about = "Show the logged in user")]
    Whoami,

    #[command(about = "List your songs and songs you liked")]
    List {
        #[arg(short, long, help = "popularity, recent, alphabetical, random, comments, search or tags")]
        query: Option<String>,

        #[arg(short, long, help = "Search term, or comma-separated tags")]
        package: Option<String>,
    },

    #[command(about = "List public songs")]
    Public {
        #[arg(short, long)]
        query: Option<String>,

        #[arg(short, long)]
        package: Option<String>,
    },

    #[command(about = "Share a new song")]
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        #[arg(short, long)]
        link: String,

        #[arg(long, help = "Tags (comma-separated)")]
        tags: Option<String>,

        #[arg(long, help = "Make the song visible to everyone")]
        public: bool,
    },

    #[command(about = "Like or unlike a song")]
    Like {
        #[arg(short, long)]
        song_id: String,
    },

    #[command(about = "Delete one of your songs")]
    Delete {
        #[arg(short, long)]
        song_id: String,
    },

    #[command(about = "Check whether a song title is already shared")]
    Check {
        #[arg(short, long)]
        title: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct Session {
    user_id: String,
    name: String,
    token: String,
}

impl Session {
    fn save(&self) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(SESSION_FILE, json)?;
        Ok(())
    }

    fn load() -> Option<Self> {
        if Path::new(SESSION_FILE).exists() {
            let data = fs::read_to_string(SESSION_FILE).ok()?;
            serde_json::from_str(&data).ok()
        } else {
            None
        }
    }

    fn clear() -> Result<()> {
        if Path::new(SESSION_FILE).exists() {
            fs::remove_file(SESSION_FILE)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

struct Api {
    client: Client,
    base: String,
}

impl Api {
    fn new(base: String) -> Self {
        Self {
            client: Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Appends `segments` to `path`, percent-encoding each one so titles
    /// containing `/`, `?` or `#` stay a single segment.
    fn url_with(&self, path: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.url(path)).context("Invalid API URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL cannot carry a path: {}", self.base))?
            .extend(segments);
        Ok(url)
    }

    fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let session = require_login()?;
        Ok(request.bearer_auth(session.token))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run_command(Api::new(cli.api_url), cli.command).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_command(api: Api, command: Commands) -> Result<()> {
    match command {
        Commands::Register { name, email, password } => register(&api, name, email, password).await,
        Commands::Login { email, password } => login(&api, email, password).await,
        Commands::Logout => {
            Session::clear()?;
            println!("✅ Logged out successfully!");
            Ok(())
        }
        Commands::Whoami => whoami(&api).await,
        Commands::List { query, package } => {
            let segments = list_segments(query.as_deref(), package.as_deref());
            let url = api.url_with("/api/songs", &segments)?;
            list_songs(&api, url, package, "Your songs").await
        }
        Commands::Public { query, package } => {
            let segments = list_segments(query.as_deref(), package.as_deref());
            let url = api.url_with("/api/songs/getPublicSongs", &segments)?;
            list_songs(&api, url, package, "Public songs").await
        }
        Commands::Create { title, description, link, tags, public } => {
            create_song(&api, title, description, link, tags, public).await
        }
        Commands::Like { song_id } => like_song(&api, song_id).await,
        Commands::Delete { song_id } => delete_song(&api, song_id).await,
        Commands::Check { title } => check_song(&api, title).await,
    }
}

async fn register(api: &Api, name: String, email: String, password: String) -> Result<()> {
    let response = api
        .client
        .post(api.url("/api/users"))
        .json(&serde_json::json!({ "name": name, "email": email, "password": password }))
        .send()
        .await
        .context("Failed to connect to songshare. Is the server running?")?;
    let created: RegisterResponse = parse(response).await?;

    Session {
        user_id: created.id.clone(),
        name: created.name.clone(),
        token: created.token,
    }
    .save()?;

    println!("✅ Account created successfully!");
    println!("👤 Name: {}", created.name);
    println!("🆔 User ID: {}", created.id);
    Ok(())
}

async fn login(api: &Api, email: String, password: String) -> Result<()> {
    let response = api
        .client
        .post(api.url("/api/users/login"))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .context("Failed to connect to songshare. Is the server running?")?;
    let logged_in: LoginResponse = parse(response).await?;

    Session {
        user_id: logged_in.user.id,
        name: logged_in.user.name.clone(),
        token: logged_in.token,
    }
    .save()?;

    println!("✅ Login successful!");
    println!("👤 Welcome back, {}!", logged_in.user.name);
    Ok(())
}

async fn whoami(api: &Api) -> Result<()> {
    let response = api.authed(api.client.get(api.url("/api/users/me")))?.send().await?;
    let me: PublicUser = parse(response).await?;

    println!("👤 Logged in as: {} <{}>", me.name, me.email);
    println!("🆔 User ID: {}", me.id);
    Ok(())
}

/// Tags travel in the path; a search term travels in the body.
fn list_segments<'a>(query: Option<&'a str>, package: Option<&'a str>) -> Vec<&'a str> {
    match (query, package) {
        (Some(q), Some(p)) if q.eq_ignore_ascii_case("tags") => vec![q, p],
        (Some(q), _) => vec![q],
        (None, _) => Vec::new(),
    }
}

async fn list_songs(api: &Api, url: Url, package: Option<String>, heading: &str) -> Result<()> {
    let response = api
        .authed(api.client.get(url))?
        .json(&serde_json::json!({ "package": package }))
        .send()
        .await?;
    let songs: Vec<Song> = parse(response).await?;

    if songs.is_empty() {
        println!("📭 No songs found.");
        return Ok(());
    }

    println!("\n🎵 {} ({})\n", heading, songs.len());
    print_songs(&songs);
    Ok(())
}

async fn create_song(
    api: &Api,
    title: String,
    description: String,
    link: String,
    tags: Option<String>,
    public: bool,
) -> Result<()> {
    let tags: Vec<String> = tags
        .map(|t| {
            t.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let payload = CreateSongRequest {
        title: Some(title),
        description: Some(description),
        link: Some(link),
        tags,
        is_private: Some(!public),
    };

    let response = api
        .authed(api.client.post(api.url("/api/songs")))?
        .json(&payload)
        .send()
        .await?;
    let song: Song = parse(response).await?;

    println!("✅ Song shared!");
    println!("🎵 Title: {}", song.title);
    println!("🆔 ID: {}", song.id);
    if !song.tags.is_empty() {
        println!("🏷️  Tags: {}", song.tags.join(", "));
    }
    Ok(())
}

async fn like_song(api: &Api, song_id: String) -> Result<()> {
    let session = require_login()?;
    let response = api
        .client
        .post(api.url_with("/api/songs/like", &[song_id.as_str(), session.user_id.as_str()])?)
        .send()
        .await?;
    let song: Song = parse(response).await?;

    if song.is_liked_by(&session.user_id) {
        println!("❤️  Liked '{}' ({} likes)", song.title, song.likes);
    } else {
        println!("💔 Unliked '{}' ({} likes)", song.title, song.likes);
    }
    Ok(())
}

async fn delete_song(api: &Api, song_id: String) -> Result<()> {
    let response = api
        .authed(api.client.delete(api.url_with("/api/songs", &[song_id.as_str()])?))?
        .send()
        .await?;
    let deleted: DeleteSongResponse = parse(response).await?;

    println!("✅ Deleted song {}", deleted.id);
    Ok(())
}

async fn check_song(api: &Api, title: String) -> Result<()> {
    let response = api
        .client
        .get(api.url_with("/api/songs/checkSong", &[title.as_str()])?)
        .send()
        .await?;
    let result: CheckSongResponse = parse(response).await?;

    if result.message == "true" {
        println!("🎵 '{}' has already been shared", title);
    } else {
        println!("📭 No song titled '{}' yet", title);
    }
    Ok(())
}

fn print_songs(songs: &[Song]) {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Title"),
        Cell::new("Likes"),
        Cell::new("Tags"),
        Cell::new("Visibility"),
        Cell::new("Shared"),
    ]));

    for song in songs {
        let short_id: String = song.id.chars().take(8).collect();
        table.add_row(Row::new(vec![
            Cell::new(&short_id),
            Cell::new(&song.title),
            Cell::new(&song.likes.to_string()),
            Cell::new(&song.tags.join(", ")),
            Cell::new(if song.is_private { "private" } else { "public" }),
            Cell::new(
                &song
                    .created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
        ]));
    }

    table.printstd();
    println!();
}

fn require_login() -> Result<Session> {
    Session::load().ok_or_else(|| {
        anyhow::anyhow!("You must be logged in. Use: songshare login -e <email> -p <password>")
    })
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        bail!("{} ({})", message, status);
    }
    response.json().await.context("Failed to parse response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_title_is_one_encoded_segment() {
        let api = Api::new("http://localhost:5000/".to_string());
        let url = api.url_with("/api/songs/checkSong", &["AC/DC? #1"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/songs/checkSong/AC%2FDC%3F%20%231"
        );
        assert_eq!(url.path_segments().unwrap().count(), 4);
    }

    #[test]
    fn test_list_segments() {
        assert!(list_segments(None, Some("x")).is_empty());
        assert_eq!(list_segments(Some("popularity"), None), vec!["popularity"]);
        assert_eq!(list_segments(Some("search"), Some("love")), vec!["search"]);
        assert_eq!(list_segments(Some("tags"), Some("rock,live")), vec!["tags", "rock,live"]);
    }
}
