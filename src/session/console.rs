//! Where console lines come from.

use std::path::PathBuf;

use log::{info, warn};
use rustyline::{error::ReadlineError, history::FileHistory, Editor};

use crate::{error::Result, history};

/// A source of console lines that keeps a history of the lines dispatched.
pub trait Console {
    /// The next line typed by the user, without its terminator, or `None`
    /// once the user is done (end of input or Ctrl+C).
    fn read_line(&mut self) -> Result<Option<String>>;

    /// Add `line` to the history.
    fn remember(&mut self, line: &str);

    /// Persist the history.
    fn save_history(&mut self) -> Result<()>;
}

/// The interactive console: a line editor with the history of the previous
/// sessions loaded.
pub struct Prompt {
    editor: Editor<(), FileHistory>,
    path: PathBuf,
}
impl Prompt {
    /// Start the line editor with the history stored at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let editor = Editor::with_history(history::config()?, history::load(&path)?)?;
        Ok(Prompt { editor, path })
    }
}
impl Console for Prompt {
    fn read_line(&mut self) -> Result<Option<String>> {
        match self.editor.readline("") {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Interrupted) => {
                info!("interrupted from the console");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn remember(&mut self, line: &str) {
        if let Err(err) = self.editor.add_history_entry(line) {
            warn!("could not add to the history: {}", err);
        }
    }

    fn save_history(&mut self) -> Result<()> {
        history::save(self.editor.history_mut(), &self.path)
    }
}
