//! Music-service boundary: playlist export and track metadata lookup.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::AppConfig;

/// Largest number of tracks exported into one playlist.
pub const MAX_PLAYLIST_TRACKS: usize = 1000;

/// Items per add-tracks request.
pub const BATCH_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(ureq::Error),
    #[error("Service returned HTTP {0}")]
    Status(u16),
    #[error("Failed to decode service response: {0}")]
    Decode(String),
    #[error("No access token. Set PLAYTALLY_SPOTIFY_TOKEN or spotify.access_token in config.")]
    MissingToken,
    #[error("No track identifiers to export")]
    NothingToExport,
}

impl From<ureq::Error> for ServiceError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => ServiceError::Status(code),
            other => ServiceError::Http(other),
        }
    }
}

/// Operations the session needs from an external music service.
pub trait MusicService {
    /// Create a private playlist and return its id.
    fn create_playlist(&self, name: &str, description: &str) -> Result<String, ServiceError>;

    /// Append tracks to a playlist. Callers keep `uris` within [`BATCH_SIZE`].
    fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), ServiceError>;

    /// Popularity score (0-100) for a track URI.
    fn track_popularity(&self, track_uri: &str) -> Result<u32, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylist {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    popularity: u32,
}

/// Spotify Web API client using a ready-made bearer token.
pub struct SpotifyClient {
    api_base: String,
    token: String,
}

impl SpotifyClient {
    pub fn new(api_base: &str, token: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::from_token(config, config.access_token())
    }

    /// Build against the configured API base with an already-resolved token.
    pub fn from_token(config: &AppConfig, token: Option<String>) -> Result<Self, ServiceError> {
        let token = token.ok_or(ServiceError::MissingToken)?;
        Ok(Self::new(&config.spotify.api_base, &token))
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// `spotify:track:ID` -> `ID`. Bare ids pass through.
pub fn track_id(uri: &str) -> &str {
    uri.rsplit(':').next().unwrap_or(uri)
}

impl MusicService for SpotifyClient {
    fn create_playlist(&self, name: &str, description: &str) -> Result<String, ServiceError> {
        let url = format!("{}/me/playlists", self.api_base);
        log::debug!("POST {url}");

        let created: CreatedPlaylist = ureq::post(&url)
            .header("Authorization", self.auth())
            .send_json(json!({
                "name": name,
                "description": description,
                "public": false,
            }))?
            .body_mut()
            .read_json()
            .map_err(|e| ServiceError::Decode(e.to_string()))?;

        Ok(created.id)
    }

    fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), ServiceError> {
        let url = format!("{}/playlists/{playlist_id}/tracks", self.api_base);
        log::debug!("POST {url} ({} items)", uris.len());

        ureq::post(&url)
            .header("Authorization", self.auth())
            .send_json(json!({ "uris": uris }))?;
        Ok(())
    }

    fn track_popularity(&self, track_uri: &str) -> Result<u32, ServiceError> {
        let url = format!("{}/tracks/{}", self.api_base, track_id(track_uri));
        log::debug!("GET {url}");

        let track: TrackObject = ureq::get(&url)
            .header("Authorization", self.auth())
            .call()?
            .body_mut()
            .read_json()
            .map_err(|e| ServiceError::Decode(e.to_string()))?;

        Ok(track.popularity)
    }
}

/// Result of a playlist export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub playlist_id: String,
    pub tracks_added: usize,
    pub requests: usize,
}

/// Create a playlist and fill it in batches. Stops at the first failure.
pub fn export_playlist(
    service: &dyn MusicService,
    name: &str,
    description: &str,
    uris: &[String],
) -> Result<ExportResult, ServiceError> {
    if uris.is_empty() {
        return Err(ServiceError::NothingToExport);
    }
    let uris = &uris[..uris.len().min(MAX_PLAYLIST_TRACKS)];

    let playlist_id = service.create_playlist(name, description)?;
    log::info!("Created playlist {playlist_id:?}, adding {} tracks", uris.len());

    let mut requests = 0;
    for batch in uris.chunks(BATCH_SIZE) {
        service.add_tracks(&playlist_id, batch)?;
        requests += 1;
    }

    Ok(ExportResult {
        playlist_id,
        tracks_added: uris.len(),
        requests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingService {
        batches: RefCell<Vec<usize>>,
        fail_on_batch: Option<usize>,
    }

    impl MusicService for RecordingService {
        fn create_playlist(&self, _name: &str, _description: &str) -> Result<String, ServiceError> {
            Ok("pl1".to_string())
        }

        fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), ServiceError> {
            assert_eq!(playlist_id, "pl1");
            let mut batches = self.batches.borrow_mut();
            if self.fail_on_batch == Some(batches.len()) {
                return Err(ServiceError::Status(502));
            }
            batches.push(uris.len());
            Ok(())
        }

        fn track_popularity(&self, _track_uri: &str) -> Result<u32, ServiceError> {
            Ok(50)
        }
    }

    fn make_uris(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("spotify:track:{i}")).collect()
    }

    #[test]
    fn test_batches_of_one_hundred() {
        let service = RecordingService::default();
        let result = export_playlist(&service, "Top", "", &make_uris(250)).unwrap();
        assert_eq!(*service.batches.borrow(), vec![100, 100, 50]);
        assert_eq!(result.tracks_added, 250);
        assert_eq!(result.requests, 3);
    }

    #[test]
    fn test_export_is_capped() {
        let service = RecordingService::default();
        let result = export_playlist(&service, "Top", "", &make_uris(1234)).unwrap();
        assert_eq!(result.tracks_added, MAX_PLAYLIST_TRACKS);
        assert_eq!(service.batches.borrow().len(), 10);
    }

    #[test]
    fn test_failure_aborts_remaining_batches() {
        let service = RecordingService {
            fail_on_batch: Some(1),
            ..Default::default()
        };
        let err = export_playlist(&service, "Top", "", &make_uris(300)).unwrap_err();
        assert!(matches!(err, ServiceError::Status(502)));
        assert_eq!(*service.batches.borrow(), vec![100]);
    }

    #[test]
    fn test_nothing_to_export() {
        let service = RecordingService::default();
        assert!(matches!(
            export_playlist(&service, "Top", "", &[]),
            Err(ServiceError::NothingToExport)
        ));
        assert!(service.batches.borrow().is_empty());
    }

    #[test]
    fn test_track_id() {
        assert_eq!(track_id("spotify:track:4uLU6hMCjMI75M1A2tKUQC"), "4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track_id("4uLU6hMCjMI75M1A2tKUQC"), "4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn test_client_requires_token() {
        let mut config = AppConfig::default();
        let token = config.access_token_with(None);
        assert!(matches!(SpotifyClient::from_token(&config, token), Err(ServiceError::MissingToken)));

        let token = config.access_token_with(Some("  ".into()));
        assert!(matches!(SpotifyClient::from_token(&config, token), Err(ServiceError::MissingToken)));

        config.spotify.api_base = "http://localhost:9/v1/".into();
        config.spotify.access_token = Some("abc".into());
        let client = SpotifyClient::from_token(&config, config.access_token_with(None)).unwrap();
        assert_eq!(client.api_base, "http://localhost:9/v1");
        assert_eq!(client.auth(), "Bearer abc");
    }
}
