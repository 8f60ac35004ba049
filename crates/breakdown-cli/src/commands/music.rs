use clap::Subcommand;

use breakdown_core::playback::{
    self, PlaybackClient, PlaybackTokens, TokenBackend, TokenStore,
};
use breakdown_core::storage::Database;
use breakdown_core::{Config, PlaybackError, UserId};

#[derive(Subcommand)]
pub enum MusicAction {
    /// Print the authorization URL, or finish connecting with the redirect URL
    Connect {
        /// Redirect URL (or bare code) returned after authorizing
        #[arg(long)]
        redirect: Option<String>,
    },
    /// Forget stored tokens
    Disconnect,
    /// Get a fresh access token from the token backend
    Refresh,
    /// Show the track currently playing
    NowPlaying,
    /// List the user's playlists
    Playlists,
    /// Toggle play/pause on the active device
    Toggle,
    /// Start a playlist from its first track
    Play {
        /// Playlist URI, e.g. spotify:playlist:...
        uri: String,
    },
}

pub fn run(action: MusicAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    if !config.playback.enabled {
        return Err(PlaybackError::NotConfigured(
            "set playback.enabled = true to use music commands".into(),
        )
        .into());
    }
    let user = config.user_id()?;
    let db = Database::open()?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(run_async(action, &config, &db, &user))
}

async fn run_async(
    action: MusicAction,
    config: &Config,
    db: &Database,
    user: &UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = TokenStore::new(db);
    let backend = TokenBackend::new(&config.playback.backend_url);

    match action {
        MusicAction::Connect { redirect: None } => {
            let url = playback::authorize_url(&config.playback)?;
            println!("Open this URL to authorize, then run:");
            println!("  breakdown music connect --redirect '<redirected URL>'");
            println!();
            println!("{url}");
        }
        MusicAction::Connect {
            redirect: Some(redirect),
        } => {
            let code = playback::code_from_redirect(&redirect)?;
            let tokens = backend.exchange_code(&code).await?;
            store.save(user, &tokens)?;
            tracing::info!(user = %user, "playback connected");
            println!("connected");
        }
        MusicAction::Disconnect => {
            store.clear(user)?;
            println!("disconnected");
        }
        MusicAction::Refresh => {
            let tokens = refresh(&store, &backend, user).await?;
            println!("access token refreshed at {}", tokens.obtained_at);
        }
        MusicAction::NowPlaying => {
            let track = with_client(config, &store, &backend, user, |c| async move {
                c.currently_playing().await
            })
            .await?;
            match track {
                Some(t) => println!("{} - {}", t.name, t.artists.join(", ")),
                None => println!("nothing playing"),
            }
        }
        MusicAction::Playlists => {
            let lists = with_client(config, &store, &backend, user, |c| async move {
                c.playlists().await
            })
            .await?;
            for p in lists {
                println!("{:<40} {:>5} tracks  {}", p.name, p.track_count, p.uri);
            }
        }
        MusicAction::Toggle => {
            let state = with_client(config, &store, &backend, user, |c| async move {
                c.toggle().await
            })
            .await?;
            println!("{}", serde_json::to_string(&state)?);
        }
        MusicAction::Play { uri } => {
            with_client(config, &store, &backend, user, |c| {
                let uri = uri.clone();
                async move { c.play_playlist(&uri).await }
            })
            .await?;
            println!("playing {uri}");
        }
    }
    Ok(())
}

async fn refresh(
    store: &TokenStore<'_>,
    backend: &TokenBackend,
    user: &UserId,
) -> Result<PlaybackTokens, PlaybackError> {
    let current = store.require(user)?;
    let refresh_token = current
        .refresh_token
        .ok_or_else(|| PlaybackError::NotConnected {
            user: user.to_string(),
        })?;
    let tokens = backend.refresh(&refresh_token).await?;
    store.save(user, &tokens)?;
    Ok(tokens)
}

/// Run a request with the stored token, refreshing once on 401.
async fn with_client<T, F, Fut>(
    config: &Config,
    store: &TokenStore<'_>,
    backend: &TokenBackend,
    user: &UserId,
    call: F,
) -> Result<T, PlaybackError>
where
    F: Fn(PlaybackClient) -> Fut,
    Fut: std::future::Future<Output = Result<T, PlaybackError>>,
{
    let api = &config.playback.api_base_url;
    let tokens = store.require(user)?;
    match call(PlaybackClient::new(api, &tokens.access_token)).await {
        Err(PlaybackError::Status { status: 401, .. }) => {
            tracing::warn!(user = %user, "access token rejected, refreshing");
            let tokens = refresh(store, backend, user).await?;
            call(PlaybackClient::new(api, &tokens.access_token)).await
        }
        other => other,
    }
}
