pub mod config;
pub mod dates;
pub mod fuzzy;
pub mod history;
pub mod report;
pub mod session;
pub mod spotify;
pub mod stats;
pub mod terminal;

/// Application name for XDG paths
pub const APP_NAME: &str = "playtally";
