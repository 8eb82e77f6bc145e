//! Events for the `sercom` terminal session state machine.
//!
//! This modules is private and restricted to the [`session`](crate::session)
//! scope. Refer to the [`state_machine`](super::state_machine) module for an
//! overview of states, events and transitions.

use std::fmt;

use serialport::SerialPort;

use super::Context;

// =============================================================================
// Crate-Public Interface
// =============================================================================

// ConnectEvent ================================================================

/// Event fired by the [`InitState`](super::states::InitState) once the
/// configuration and history are loaded and the port to use is known.
/// Triggers the transition to the `Connect` state.
#[derive(Debug)]
pub(crate) struct ConnectEvent {
    pub ctx: Context,
}

// StartTerminalEvent ==========================================================

/// Event fired when the serial port is open and configured. Triggers the
/// transition to the `Interactive` state.
pub(crate) struct StartTerminalEvent {
    pub ctx: Context,
    /// The open port, moved into the next state.
    pub port: Box<dyn SerialPort>,
}
impl fmt::Debug for StartTerminalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_fmt_port!("StartTerminalEvent", self.port, f)
    }
}

// DoneEvent ===================================================================

/// Event fired when the session completes and is about to terminate. It
/// triggers a transition to the `Done` state.
///
/// This event can happen at any state: normal termination through the `exit`
/// meta-command or the end of the console input, or abnormal termination
/// caused by a malformed configuration file, a port that cannot be opened or
/// a write fault on the port.
#[derive(Debug)]
pub(crate) struct DoneEvent {
    pub ctx: Context,
    /// When `true`, indicates an abnormal completion caused by an error.
    pub with_errors: bool,
}

// ExitEvent ===================================================================

/// The last event of the session. The event loop terminates with an exit
/// status derived from `with_error`.
#[derive(Debug)]
pub(crate) struct ExitEvent {
    pub ctx: Context,
    pub with_error: bool,
}

// Events enum ==================================================================

/// Events that can be triggered within the terminal session state machine.
#[derive(Debug)]
pub(crate) enum Event {
    Connect(ConnectEvent),
    StartTerminal(StartTerminalEvent),
    Done(DoneEvent),
    Exit(ExitEvent),
}
