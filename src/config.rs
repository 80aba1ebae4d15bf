use std::collections::HashSet;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::report::Entity;
use crate::stats::{Policy, QueryFilter, RankMode};

/// Environment variable holding a music-service access token.
pub const TOKEN_ENV: &str = "PLAYTALLY_SPOTIFY_TOKEN";

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the file itself is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the exported `*.json` history files.
    pub data_dir: PathBuf,
    /// Track names that are different songs on different albums.
    pub duplicates: Vec<String>,
    /// Artists excluded from every statistic.
    pub ignore: Vec<String>,
    /// Rows shown per ranking.
    pub result_limit: usize,
    /// Albums need this many distinct tracks in the window to be ranked.
    pub album_min_distinct_tracks: usize,
    /// Ranking mode per entity type.
    pub modes: ModeConfig,
    /// Music-service API settings.
    pub spotify: SpotifyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            duplicates: vec!["The 1975".to_string()],
            ignore: Vec::new(),
            result_limit: 10,
            album_min_distinct_tracks: 3,
            modes: ModeConfig::default(),
            spotify: SpotifyConfig::default(),
        }
    }
}

/// Default ranking mode for each listing command.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    pub track: RankMode,
    pub album: RankMode,
    pub artist: RankMode,
    pub skip: RankMode,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            track: RankMode::Plays,
            album: RankMode::Time,
            artist: RankMode::Time,
            skip: RankMode::Plays,
        }
    }
}

/// Web API configuration. Token acquisition happens elsewhere; only a
/// ready-made bearer token is read here.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub api_base: String,
    pub access_token: Option<String>,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
            access_token: None,
        }
    }
}

impl ModeConfig {
    pub fn mode_for(&self, entity: Entity) -> RankMode {
        match entity {
            Entity::Track => self.track,
            Entity::Album => self.album,
            Entity::Artist => self.artist,
            Entity::Skip => self.skip,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/playtally/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load from an explicit path, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Identity rules for aggregation.
    pub fn policy(&self) -> Policy {
        Policy {
            duplicates: self.duplicates.iter().cloned().collect::<HashSet<_>>(),
            ignore: self.ignore.iter().cloned().collect::<HashSet<_>>(),
        }
    }

    /// Starting query filter for a session: unbounded window, configured limits.
    pub fn initial_filter(&self) -> QueryFilter {
        QueryFilter {
            result_limit: self.result_limit.max(1),
            album_min_distinct_tracks: self.album_min_distinct_tracks,
            ..QueryFilter::default()
        }
    }

    /// Access token: environment first, then config file.
    pub fn access_token(&self) -> Option<String> {
        self.access_token_with(std::env::var(TOKEN_ENV).ok())
    }

    /// Token resolution against an explicit environment value. Blank values
    /// on either side count as absent.
    pub fn access_token_with(&self, env_token: Option<String>) -> Option<String> {
        env_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.spotify.access_token.clone())
            .filter(|t| !t.trim().is_empty())
    }

    /// Interactive command history, under the per-user data directory.
    /// Separate from `data_dir`, which holds the exported listening history.
    pub fn history_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME).map(|dirs| dirs.data_dir().join("history.txt"))
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
