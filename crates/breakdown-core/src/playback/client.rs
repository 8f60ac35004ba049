use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub track_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

// ── Wire shapes ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CurrentlyPlaying {
    #[serde(default)]
    item: Option<WireTrack>,
}

#[derive(Deserialize)]
struct WireTrack {
    name: String,
    #[serde(default)]
    artists: Vec<WireNamed>,
    #[serde(default)]
    album: Option<WireNamed>,
    #[serde(default)]
    duration_ms: u64,
}

#[derive(Deserialize)]
struct WireNamed {
    name: String,
}

#[derive(Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<WirePlaylist>,
}

#[derive(Deserialize)]
struct WirePlaylist {
    id: String,
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    tracks: Option<WireTrackCount>,
}

#[derive(Deserialize)]
struct WireTrackCount {
    total: u64,
}

#[derive(Deserialize)]
struct PlayerStatus {
    #[serde(default)]
    is_playing: bool,
}

impl From<WireTrack> for Track {
    fn from(t: WireTrack) -> Self {
        Self {
            name: t.name,
            artists: t.artists.into_iter().map(|a| a.name).collect(),
            album: t.album.map(|a| a.name),
            duration_ms: t.duration_ms,
        }
    }
}

/// Bearer-authenticated client for the streaming service's Web API.
pub struct PlaybackClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl PlaybackClient {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Track on the user's active device, if any.
    pub async fn currently_playing(&self) -> Result<Option<Track>, PlaybackError> {
        let resp = self
            .authed(self.http.get(self.url("/v1/me/player/currently-playing")))
            .send()
            .await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let resp = check(resp).await?;
        let body: CurrentlyPlaying = resp.json().await?;
        Ok(body.item.map(Track::from))
    }

    pub async fn playlists(&self) -> Result<Vec<Playlist>, PlaybackError> {
        let resp = self
            .authed(self.http.get(self.url("/v1/me/playlists")))
            .send()
            .await?;
        let page: PlaylistPage = check(resp).await?.json().await?;
        Ok(page
            .items
            .into_iter()
            .map(|p| Playlist {
                id: p.id,
                name: p.name,
                uri: p.uri,
                track_count: p.tracks.map(|t| t.total).unwrap_or(0),
            })
            .collect())
    }

    /// Pause if playing, play if paused. Returns the new state.
    pub async fn toggle(&self) -> Result<PlaybackState, PlaybackError> {
        let resp = self
            .authed(self.http.get(self.url("/v1/me/player")))
            .send()
            .await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Err(PlaybackError::UnexpectedResponse(
                "no active playback device".into(),
            ));
        }
        let status: PlayerStatus = check(resp).await?.json().await?;

        let (path, next) = if status.is_playing {
            ("/v1/me/player/pause", PlaybackState::Paused)
        } else {
            ("/v1/me/player/play", PlaybackState::Playing)
        };
        let resp = self
            .authed(self.http.put(self.url(path)))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        check(resp).await?;
        Ok(next)
    }

    /// Start a playlist from its first track.
    pub async fn play_playlist(&self, context_uri: &str) -> Result<(), PlaybackError> {
        let body = serde_json::json!({
            "context_uri": context_uri,
            "offset": { "position": 0 },
            "position_ms": 0,
        });
        let resp = self
            .authed(self.http.put(self.url("/v1/me/player/play")))
            .json(&body)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.access_token)
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, PlaybackError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(PlaybackError::Status {
        status: status.as_u16(),
        body,
    })
}
