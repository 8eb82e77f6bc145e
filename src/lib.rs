//! Sercom is an interactive terminal for development boards attached over a
//! serial line. Everything typed on the console is sent to the board, one
//! line at a time, and every line the board prints is shown with a timestamp
//! and appended to a session log.
//!
//! Lines starting with `/` are handled locally instead of being sent. They
//! manage a small set of tables that survive between sessions:
//!
//! * **aliases** rewrite the first word of a command before it is sent,
//! * **ignores** are patterns for device lines that are never recorded,
//! * **filters** are patterns that, once any is set, restrict recording to
//!   the device lines matching at least one of them.
//!
//! The tables and the default port are kept in a TOML configuration file
//! under the configuration directory, next to the input history.
//!
//! The session itself is implemented as a state machine in the same way as
//! the rest of the crate: states are consumed by typed **events** and the
//! transitions are `From` implementations converting an event into the next
//! state. Only transitions for which the `From` trait is implemented are
//! authorized, any other is caught at compile time.
//!
//! Device lines are read on a detached thread which shares the tables with
//! the console loop behind a mutex, so table edits apply to the very next
//! line read from the board.
//!
//! The crate also ships `mkconstfs`, a generator turning a directory tree
//! into a C source file that embeds it as a read-only file system image.

mod config;
mod error;
mod session;
mod settings;
mod utils;

pub mod constfs;
pub mod history;
pub mod reader;
pub mod tables;

pub use config::ConfigStore;
pub use error::{CommandError, Error, Result};
pub use history::MAX_HISTORY_ENTRIES;
pub use session::{
    factory, Console, Context, Dispatcher, Flow, Prompt, SerialTerminal, ESCAPE, SEPARATOR,
};
pub use settings::{
    default_config_dir, Settings, SettingsBuilder, DEFAULT_BAUD_RATE, DEFAULT_CONFIG_FILE, DEFAULT_PORT,
};
pub use tables::{PatternSet, SharedTables, Tables};
pub use utils::Link;
