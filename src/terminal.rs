//! Line editing for interactive sessions, with history kept across runs.

use std::io::{self, Write};
use std::path::PathBuf;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::session::LineSource;

/// A rustyline editor that remembers non-blank commands.
pub struct Terminal {
    editor: DefaultEditor,
    history: Option<PathBuf>,
}

impl Terminal {
    /// Open an editor and load `history` if it exists. A missing or
    /// unreadable history file starts an empty history.
    pub fn open(history: Option<PathBuf>) -> Result<Self, ReadlineError> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &history {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    log::warn!("Failed to load history from {}: {}", path.display(), e);
                }
            }
        }
        Ok(Self { editor, history })
    }

    /// Record one entered line. Blank lines are skipped.
    pub fn remember(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if let Err(e) = self.editor.add_history_entry(line) {
            log::debug!("History entry dropped: {e}");
        }
    }

    /// Write the history file, creating its directory on first use.
    pub fn save_history(&mut self) -> Result<(), ReadlineError> {
        let Some(path) = &self.history else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.editor.save_history(path)?;
        log::debug!("Saved history to {}", path.display());
        Ok(())
    }
}

impl LineSource for Terminal {
    fn read_line<W: Write>(&mut self, prompt: &str, _out: &mut W) -> io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                self.remember(&line);
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }
}
