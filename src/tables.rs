//! The alias, filter and ignore tables shared by the console and the device
//! reader.
//!
//! Both execution paths hold a [`SharedTables`] handle. The console path is the
//! only writer; the reader takes the lock once per completed line.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use regex::bytes::Regex;

/// Tables guarded by a single lock, shared between the two session paths.
pub type SharedTables = Arc<Mutex<Tables>>;

/// Lock the shared tables. A panic while holding the lock cannot leave the
/// tables half updated, so a poisoned lock is simply taken over.
pub fn lock(tables: &SharedTables) -> MutexGuard<'_, Tables> {
    tables.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Pattern sets
// =============================================================================

/// An ordered list of byte-oriented regular expressions.
///
/// Duplicates are allowed; removal takes out the first entry with the same
/// pattern text.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}
impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and append `pattern`.
    pub fn add(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.patterns.push(Regex::new(pattern)?);
        Ok(())
    }

    /// Remove the first pattern whose text equals `pattern`. Returns `false`
    /// if there was none.
    pub fn remove(&mut self, pattern: &str) -> bool {
        match self.patterns.iter().position(|r| r.as_str() == pattern) {
            Some(index) => {
                self.patterns.remove(index);
                true
            }
            None => false,
        }
    }

    /// `true` if any pattern matches somewhere in `line`.
    pub fn any_match(&self, line: &[u8]) -> bool {
        self.patterns.iter().any(|r| r.is_match(line))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Pattern texts, in insertion order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> + '_ {
        self.patterns.iter().map(Regex::as_str)
    }
}
impl PartialEq for PatternSet {
    fn eq(&self, other: &Self) -> bool {
        self.patterns().eq(other.patterns())
    }
}

// =============================================================================
// Tables
// =============================================================================

/// Aliases applied to outgoing lines, and the filters/ignores applied to
/// incoming ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub aliases: BTreeMap<String, String>,
    pub filters: PatternSet,
    pub ignores: PatternSet,
}
impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the tables for sharing between the session paths.
    pub fn shared(self) -> SharedTables {
        Arc::new(Mutex::new(self))
    }

    /// Define or redefine an alias.
    pub fn set_alias(&mut self, name: impl Into<String>, command: impl Into<String>) {
        self.aliases.insert(name.into(), command.into());
    }

    pub fn remove_alias(&mut self, name: &str) -> Option<String> {
        self.aliases.remove(name)
    }

    /// Rewrite `command` if its first whitespace-delimited token is an alias.
    /// Everything after the token is appended verbatim to the replacement.
    pub fn resolve<'a>(&self, command: &'a str) -> std::borrow::Cow<'a, str> {
        let trimmed = command.trim_start();
        let token_len = trimmed
            .find(char::is_whitespace)
            .unwrap_or_else(|| trimmed.len());
        let (token, rest) = trimmed.split_at(token_len);
        match self.aliases.get(token) {
            Some(replacement) if !token.is_empty() => format!("{}{}", replacement, rest).into(),
            _ => command.into(),
        }
    }

    /// Decide whether a completed line from the device gets recorded.
    ///
    /// Ignores win over filters. With no filters, every line that is not
    /// ignored is recorded.
    pub fn should_record(&self, line: &[u8]) -> bool {
        let ignored = self.ignores.any_match(line);
        if ignored {
            return false;
        }
        self.filters.is_empty() || self.filters.any_match(line)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
