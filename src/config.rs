//! Persistent session configuration.
//!
//! The configuration file is a TOML document grouped in sections:
//!
//! ```toml
//! [general]
//! port = "/dev/ttyUSB0"
//!
//! [aliases]
//! ON = "led on"
//!
//! [filters]
//! filter0 = "ERROR"
//!
//! [ignores]
//! ignore0 = "DEBUG"
//! ```
//!
//! Saving merges the in-memory state into the document that was loaded at
//! startup. Keys written by an earlier session are left in place, which
//! means a filter removed since the last save comes back on the next start
//! unless its index gets reused.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};
use tempfile::NamedTempFile;
use toml::{Table, Value};

use crate::{
    error::{Error, Result},
    settings::Settings,
    tables::{PatternSet, Tables},
};

const GENERAL: &str = "general";
const ALIASES: &str = "aliases";
const FILTERS: &str = "filters";
const IGNORES: &str = "ignores";

const FILTER_KEY: &str = "filter";
const IGNORE_KEY: &str = "ignore";

/// The configuration document and the file it lives in.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigStore {
    path: PathBuf,
    doc: Table,
}
impl ConfigStore {
    /// An empty store that will be saved to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        ConfigStore {
            path: path.into(),
            doc: Table::new(),
        }
    }

    /// Load the store from `path`. A missing file yields an empty store; a
    /// file that is not valid TOML is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str::<Table>(&text).map_err(|source| Error::ConfigParse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no configuration file at {}", path.display());
                Table::new()
            }
            Err(err) => return Err(err.into()),
        };
        Ok(ConfigStore { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build the alias, filter and ignore tables described by the store.
    pub fn tables(&self) -> Result<Tables> {
        let mut tables = Tables::new();
        if let Some(aliases) = self.section(ALIASES) {
            for (name, command) in aliases {
                tables.set_alias(name.as_str(), value_text(command));
            }
        }
        self.load_patterns(FILTERS, &mut tables.filters)?;
        self.load_patterns(IGNORES, &mut tables.ignores)?;
        Ok(tables)
    }

    /// The port saved by a previous session, if any.
    pub fn port(&self) -> Option<String> {
        self.section(GENERAL)
            .and_then(|general| general.get("port"))
            .map(value_text)
    }

    /// Apply the stored settings: the saved port is used unless one was
    /// already given, and every other key outside the alias, filter and
    /// ignore sections lands in [`Settings::extra`].
    pub fn apply(&self, settings: &mut Settings) {
        if settings.port.is_none() {
            settings.port = self.port();
        }
        for (key, value) in &self.doc {
            match (key.as_str(), value) {
                (ALIASES, _) | (FILTERS, _) | (IGNORES, _) => {}
                (section, Value::Table(entries)) => {
                    for (name, value) in entries {
                        if section == GENERAL && name == "port" {
                            continue;
                        }
                        settings.absorb(name.as_str(), value_text(value));
                    }
                }
                (name, value) => settings.absorb(name, value_text(value)),
            }
        }
    }

    /// Merge the current port and tables into the document.
    pub fn merge(&mut self, port: &str, tables: &Tables) {
        self.section_mut(GENERAL)
            .insert("port".into(), Value::String(port.into()));
        if !tables.aliases.is_empty() {
            let section = self.section_mut(ALIASES);
            for (name, command) in &tables.aliases {
                section.insert(name.clone(), Value::String(command.clone()));
            }
        }
        self.merge_patterns(FILTERS, FILTER_KEY, &tables.filters);
        self.merge_patterns(IGNORES, IGNORE_KEY, &tables.ignores);
    }

    /// The document as it would be written to disk.
    pub fn render(&self) -> Result<String> {
        Ok(toml::to_string(&self.doc)?)
    }

    /// Merge the current state and write the whole document. The file is
    /// replaced atomically; on failure the previous content stays intact.
    pub fn save(&mut self, port: &str, tables: &Tables) -> Result<()> {
        self.merge(port, tables);
        let text = self.render()?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut staged = NamedTempFile::new_in(&dir)?;
        staged.write_all(text.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path)?;

        info!("configuration saved to {}", self.path.display());
        Ok(())
    }

    fn section(&self, name: &str) -> Option<&Table> {
        self.doc.get(name).and_then(Value::as_table)
    }

    fn section_mut(&mut self, name: &str) -> &mut Table {
        if !matches!(self.doc.get(name), Some(Value::Table(_))) {
            self.doc.insert(name.into(), Value::Table(Table::new()));
        }
        match self.doc.get_mut(name) {
            Some(Value::Table(section)) => section,
            _ => unreachable!("section `{}` was just inserted", name),
        }
    }

    fn load_patterns(&self, section: &str, set: &mut PatternSet) -> Result<()> {
        let entries = match self.section(section) {
            Some(entries) => entries,
            None => return Ok(()),
        };
        let mut ordered: Vec<(&String, &Value)> = entries.iter().collect();
        // Table keys come sorted by name; `filter10` must still follow
        // `filter2`.
        ordered.sort_by_key(|(key, _)| match key_index(key) {
            Some(index) => (0, index),
            None => (1, 0),
        });
        for (_, value) in ordered {
            let pattern = value_text(value);
            set.add(&pattern).map_err(|source| Error::ConfigPattern {
                path: self.path.clone(),
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn merge_patterns(&mut self, section: &str, key: &str, set: &PatternSet) {
        if set.is_empty() {
            return;
        }
        let entries = self.section_mut(section);
        for (index, pattern) in set.patterns().enumerate() {
            entries.insert(format!("{}{}", key, index), Value::String(pattern.into()));
        }
    }
}

/// Strings are taken as is, anything else as its TOML text.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// The numeric suffix of a positional key such as `filter12`.
fn key_index(key: &str) -> Option<u64> {
    let digits = key.len() - key.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    key[key.len() - digits..].parse().ok()
}

// =============================================================================
// Unit Tests
// =============================================================================
