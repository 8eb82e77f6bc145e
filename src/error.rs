//! Error types shared by the terminal session, the configuration store and
//! the constfs generator.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in `sercom`.
///
/// User-command errors are wrapped in [`Error::Command`] so that callers can
/// tell them apart from connection and I/O faults: the former are reported
/// and the session goes on, the latter end the session.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("serial port: {0}")]
    Serial(#[from] serialport::Error),

    #[error("console: {0}")]
    Console(#[from] rustyline::error::ReadlineError),

    #[error("malformed configuration file `{}`: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid pattern `{pattern}` in configuration file `{}`: {source}", path.display())]
    ConfigPattern {
        path: PathBuf,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("could not serialize the configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("could not replace the configuration file: {0}")]
    ConfigPersist(#[from] tempfile::PersistError),

    #[error("{0}")]
    Command(#[from] CommandError),

    #[error("walking `{}`: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Errors caused by a meta-command typed on the console. None of them change
/// any state.
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("command `{0}` not found")]
    NotFound(String),

    #[error("command `{name}` is ambiguous ({})", candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<&'static str>,
    },

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("alias `{0}` not found")]
    AliasNotFound(String),

    #[error("ignore for `{0}` not found")]
    IgnoreNotFound(String),

    #[error("filter for `{0}` not found")]
    FilterNotFound(String),

    #[error("invalid pattern `{pattern}`: {reason}")]
    BadPattern { pattern: String, reason: String },
}
