//! Song lyrics adapter
//!
//! Wraps a lyrics.ovh-style service: GET `{base}/{artist}/{title}`, 404
//! means the song is unknown. Display output is truncated to a line
//! budget; the stored result always keeps the full text.

use std::time::Duration;

use async_trait::async_trait;
use charla_agent::{Tool, ToolResult};
use serde::Deserialize;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default lyrics service base URL
pub const DEFAULT_BASE_URL: &str = "https://api.lyrics.ovh/v1";

/// Lines shown before the display output is cut off
pub const MAX_DISPLAY_LINES: usize = 30;

/// Lyrics adapter errors
#[derive(Debug, Error)]
pub enum LyricsError {
    #[error("no lyrics found for '{title}' by {artist}")]
    NotFound { artist: String, title: String },

    #[error("lyrics service timed out")]
    Timeout,

    #[error("lyrics service unavailable: {0}")]
    Unavailable(String),
}

impl LyricsError {
    /// User-facing error text
    pub fn user_message(&self) -> String {
        match self {
            LyricsError::NotFound { artist, title } => format!(
                "❌ No encontré la letra de \"{}\" de {}. Verifica los nombres.",
                title, artist
            ),
            LyricsError::Timeout => "❌ Tiempo de espera agotado. Intenta de nuevo.".to_string(),
            LyricsError::Unavailable(_) => {
                "❌ Error de conexión con el servicio de letras.".to_string()
            }
        }
    }
}

/// A found song with its full lyrics text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lyrics {
    pub artist: String,
    pub title: String,
    pub text: String,
    pub line_count: usize,
}

#[derive(Debug, Deserialize)]
struct LyricsResponse {
    #[serde(default)]
    lyrics: Option<String>,
}

/// Client for the lyrics service
pub struct LyricsClient {
    http: reqwest::Client,
    base_url: String,
}

impl LyricsClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the service base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Look up the lyrics for one song
    pub async fn search(&self, artist: &str, title: &str) -> Result<Lyrics, LyricsError> {
        let artist = artist.trim();
        let title = title.trim();
        if artist.is_empty() || title.is_empty() {
            return Err(LyricsError::NotFound {
                artist: artist.to_string(),
                title: title.to_string(),
            });
        }

        tracing::info!(%artist, %title, "searching lyrics");

        let url = build_url(&self.base_url, artist, title).map_err(LyricsError::Unavailable)?;
        let response = self
            .http
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LyricsError::NotFound {
                artist: artist.to_string(),
                title: title.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(LyricsError::Unavailable(format!(
                "status {}",
                response.status()
            )));
        }

        let body: LyricsResponse = response.json().await.map_err(map_reqwest_error)?;
        lyrics_from_text(artist, title, body.lyrics.as_deref().unwrap_or("")).ok_or(
            LyricsError::NotFound {
                artist: artist.to_string(),
                title: title.to_string(),
            },
        )
    }
}

impl Default for LyricsClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the request URL with artist/title as encoded path segments
fn build_url(base_url: &str, artist: &str, title: &str) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(base_url).map_err(|e| e.to_string())?;
    url.path_segments_mut()
        .map_err(|_| "base URL cannot have path segments".to_string())?
        .push(artist)
        .push(title);
    Ok(url)
}

fn map_reqwest_error(e: reqwest::Error) -> LyricsError {
    if e.is_timeout() {
        LyricsError::Timeout
    } else {
        LyricsError::Unavailable(e.to_string())
    }
}

/// Build a `Lyrics` record from raw body text. Empty text means not found.
fn lyrics_from_text(artist: &str, title: &str, text: &str) -> Option<Lyrics> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(Lyrics {
        artist: artist.to_string(),
        title: title.to_string(),
        text: text.to_string(),
        line_count: text.lines().count(),
    })
}

/// Format lyrics for display, truncating above the line budget. The
/// truncation is display-only; callers keep the full text in [`Lyrics`].
pub fn format_lyrics(lyrics: &Lyrics) -> String {
    let lines: Vec<&str> = lyrics.text.lines().collect();
    let body = if lines.len() > MAX_DISPLAY_LINES {
        format!(
            "{}\n\n... ({} líneas más)",
            lines[..MAX_DISPLAY_LINES].join("\n"),
            lines.len() - MAX_DISPLAY_LINES
        )
    } else {
        lyrics.text.clone()
    };

    format!(
        "🎵 {}\n🎤 {}\n\n{}\n\n📊 {} líneas",
        lyrics.title.to_uppercase(),
        lyrics.artist,
        body,
        lyrics.line_count,
    )
}

#[async_trait]
impl Tool for LyricsClient {
    fn name(&self) -> &str {
        "find_lyrics"
    }

    fn description(&self) -> &str {
        "Find the lyrics of a song given the artist and the song title. \
         Works for artists and songs in Spanish and English."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "artist": { "type": "string", "description": "Artist or band name" },
                "title": { "type": "string", "description": "Song title" }
            },
            "required": ["artist", "title"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolResult {
        let artist = match arguments.get("artist").and_then(|v| v.as_str()) {
            Some(a) => a,
            None => return ToolResult::error("Missing 'artist' argument"),
        };
        let title = match arguments.get("title").and_then(|v| v.as_str()) {
            Some(t) => t,
            None => return ToolResult::error("Missing 'title' argument"),
        };

        match self.search(artist, title).await {
            Ok(lyrics) => ToolResult::text(format_lyrics(&lyrics)),
            Err(e) => {
                tracing::warn!(error = %e, "lyrics lookup failed");
                ToolResult::error(e.user_message())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lyrics_from_text_counts_lines() {
        let lyrics = lyrics_from_text("Queen", "Bohemian Rhapsody", "line 1\nline 2\nline 3")
            .unwrap();
        assert_eq!(lyrics.line_count, 3);
        assert_eq!(lyrics.artist, "Queen");
    }

    #[test]
    fn test_lyrics_from_empty_text_is_none() {
        assert!(lyrics_from_text("Queen", "Unknown", "   ").is_none());
    }

    #[test]
    fn test_format_short_lyrics_untruncated() {
        let lyrics = lyrics_from_text("Queen", "Song", "a\nb\nc").unwrap();
        let text = format_lyrics(&lyrics);
        assert!(text.contains("SONG"));
        assert!(text.contains("a\nb\nc"));
        assert!(!text.contains("líneas más"));
    }

    #[test]
    fn test_format_long_lyrics_truncated_with_marker() {
        let body = (0..35).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let lyrics = lyrics_from_text("Queen", "Song", &body).unwrap();

        let text = format_lyrics(&lyrics);
        assert!(text.contains("line 29"));
        assert!(!text.contains("line 30\n"), "lines past the budget must not appear");
        assert!(text.contains("... (5 líneas más)"));
        // The stored result still carries everything
        assert_eq!(lyrics.line_count, 35);
        assert!(lyrics.text.contains("line 34"));
    }

    #[test]
    fn test_build_url_encodes_segments() {
        let url = build_url(DEFAULT_BASE_URL, "Bad Bunny", "Tití Me Preguntó").unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://api.lyrics.ovh/v1/"));
        assert!(s.contains("Bad%20Bunny"));
        assert!(!s.contains(' '));
    }

    #[tokio::test]
    async fn test_execute_missing_args_is_error_result() {
        let tool = LyricsClient::new();
        let result = tool.execute(serde_json::json!({"artist": "Queen"})).await;
        assert!(result.is_error);
        assert!(result.content.contains("'title'"));
    }

    #[test]
    fn test_user_messages_are_nonempty() {
        for e in [
            LyricsError::NotFound {
                artist: "a".into(),
                title: "t".into(),
            },
            LyricsError::Timeout,
            LyricsError::Unavailable("boom".into()),
        ] {
            assert!(!e.user_message().is_empty());
        }
    }
}
