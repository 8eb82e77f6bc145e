//! Helper functions to deal with serial ports.

mod ports;

pub use ports::Link;
pub(crate) use ports::open_and_setup_port;
