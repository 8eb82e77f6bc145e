//! Data shared by every state of the terminal session.

use std::fs;

use log::debug;

use crate::{
    config::ConfigStore,
    error::Result,
    settings::Settings,
    tables::{self, SharedTables, Tables},
};

/// Settings, tables and configuration store of a session.
///
/// The tables sit behind a shared handle that stays the same for the whole
/// session: the device reader keeps a clone of it.
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: Settings,
    pub tables: SharedTables,
    pub store: ConfigStore,
}
impl Context {
    /// A context with empty tables and store located according to
    /// `settings`. Nothing is read from disk.
    pub fn new(settings: Settings) -> Self {
        Context {
            store: ConfigStore::empty(settings.config_path()),
            tables: Tables::new().shared(),
            settings,
        }
    }

    /// Create the configuration directory if needed, then load the
    /// configuration store into this context.
    ///
    /// The shared tables are filled in place so that clones taken earlier
    /// see the loaded content.
    pub fn load(&mut self) -> Result<()> {
        fs::create_dir_all(&self.settings.config_dir)?;

        let store = ConfigStore::load(self.settings.config_path())?;
        let loaded = store.tables()?;
        store.apply(&mut self.settings);
        debug!(
            "{} aliases, {} filters, {} ignores loaded",
            loaded.aliases.len(),
            loaded.filters.len(),
            loaded.ignores.len()
        );
        *tables::lock(&self.tables) = loaded;
        self.store = store;
        Ok(())
    }
}
