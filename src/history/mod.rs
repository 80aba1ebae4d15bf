pub mod record;

pub use record::{PlayEvent, RawRecord};

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}: expected a JSON array of play records")]
    NotAnArray(String),
    #[error("History directory not found: {0}")]
    MissingDirectory(PathBuf),
}

/// Everything read from a history directory, plus bookkeeping for the summary.
#[derive(Debug, Default)]
pub struct LoadedHistory {
    pub events: Vec<PlayEvent>,
    pub files_read: usize,
    pub files_failed: usize,
    /// Array elements seen across all readable files.
    pub raw_records: usize,
    /// Elements that were not objects, or had no usable timestamp / duration.
    pub records_malformed: usize,
}

/// Read every `*.json` file directly inside `dir`.
///
/// Files are visited in file-name order so two runs over the same directory
/// produce the same event sequence. A file that cannot be read or is not a
/// JSON array is logged and skipped.
pub fn load_history(dir: &Path) -> Result<LoadedHistory, HistoryError> {
    if !dir.is_dir() {
        return Err(HistoryError::MissingDirectory(dir.to_path_buf()));
    }

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        })
        .collect();

    let pb = if files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut history = LoadedHistory::default();

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        pb.set_message(name.clone());

        match read_file(path) {
            Ok(elements) => {
                history.files_read += 1;
                history.raw_records += elements.len();
                for element in elements {
                    let event = serde_json::from_value::<RawRecord>(element)
                        .ok()
                        .and_then(record::normalize);
                    match event {
                        Some(event) => history.events.push(event),
                        None => history.records_malformed += 1,
                    }
                }
            }
            Err(e) => {
                history.files_failed += 1;
                log::warn!("Error parsing {name}: {e}");
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();
    log::info!(
        "Loaded {} events from {} files ({} failed, {} malformed records)",
        history.events.len(),
        history.files_read,
        history.files_failed,
        history.records_malformed
    );

    Ok(history)
}

fn read_file(path: &Path) -> Result<Vec<serde_json::Value>, HistoryError> {
    let contents = std::fs::read_to_string(path)?;
    match serde_json::from_str::<serde_json::Value>(&contents)? {
        serde_json::Value::Array(elements) => Ok(elements),
        _ => Err(HistoryError::NotAnArray(path.display().to_string())),
    }
}
