//! Console input history persisted across sessions.
//!
//! The history is the one kept by the line editor, so earlier lines can be
//! recalled and edited with the arrow keys. It is read from
//! `<config dir>/history` when the session starts and written back when the
//! console loop ends.

use std::{fs, io, path::Path};

use log::{debug, warn};
use rustyline::{
    error::ReadlineError,
    history::{FileHistory, History},
    Config,
};

use crate::error::Result;

/// Maximum number of lines kept in the history file.
pub const MAX_HISTORY_ENTRIES: usize = 1000;

/// Line editor settings: a bounded history that is only extended with the
/// lines actually dispatched.
pub fn config() -> Result<Config> {
    Ok(Config::builder()
        .max_history_size(MAX_HISTORY_ENTRIES)?
        .auto_add_history(false)
        .build())
}

/// Read the history from `path`. A missing file means no history yet and an
/// unreadable one is reported and skipped, so the session starts anyway.
pub fn load(path: &Path) -> Result<FileHistory> {
    let mut history = FileHistory::new();
    history.set_max_len(MAX_HISTORY_ENTRIES)?;
    match history.load(path) {
        Ok(()) => debug!("{} history entries loaded", history.len()),
        Err(ReadlineError::Io(ref err)) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            warn!("could not read {}: {}", path.display(), err);
            history.clear()?;
        }
    }
    Ok(history)
}

/// Write `history` to `path`, creating the directory if needed.
pub fn save(history: &mut FileHistory, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    history.save(path)?;
    debug!("{} history entries saved", history.len());
    Ok(())
}
