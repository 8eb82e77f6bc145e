//! `sercom` terminal session.
//!
//! **Example** - Importing the public interfaces through session:
//! ```ignore
//! use crate::{
//!     session::{self as ss},
//!     settings::SettingsBuilder,
//! };
//! ```
//!
//! **Example** - Running the session event loop:
//! ```ignore
//! let settings = SettingsBuilder::new()
//!     .port("/dev/ttyACM0")
//!     .baud_rate(115_200)
//!     .finalize();
//! let mut terminal = ss::factory(settings);
//! terminal.run();
//! ```

#[macro_use]
mod macros;

mod console;
mod context;
mod dispatcher;
mod events;
mod state_machine;
mod states;

pub use console::{Console, Prompt};
pub use context::Context;
pub use dispatcher::{Dispatcher, Flow, ESCAPE, SEPARATOR};
pub use state_machine::{factory, SerialTerminal};
