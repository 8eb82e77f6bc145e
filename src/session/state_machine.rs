//! `sercom` terminal session state machine.
//!
//! A session loads its configuration, opens the port, then bridges the
//! console and the device until the user exits. The following state diagram
//! summarizes the different states and transitions:
//!
//! ```text
//!        START
//!          |
//!          v
//!      .-------.   config    .---------.  port    .-------------.
//!      | Init  |------------>| Connect |--------->| Interactive |
//!      '-------'   loaded    '---------'  open    '-------------'
//!          |                      |                      |
//!          | malformed            | cannot               | exit, end of input
//!          | config               | open port            | or write fault
//!          |                      v                      |
//!          |                 .--------.                  |
//!          '---------------->|  Done  |<-----------------'
//!                            '--------'
//!                                |
//!                                v
//!                               END
//! ```

use super::events::*;
use super::states::*;
use super::Context;
use crate::settings::Settings;

// =============================================================================
// Public Interface
// =============================================================================

/// Represents a `sercom` terminal session. Use the `factory()` function to
/// get an instance then run it by calling its `run()` method.
pub struct SerialTerminal {
    sm: SessionStates,
}
impl SerialTerminal {
    /// The session event loop runs until the `Done` state is reached and its
    /// `should_exit` flag is set. At such point, the event loop terminates and
    /// returns an exit code indicating no errors when equal to **`0`**;
    /// otherwise a termination with error.
    pub fn run(&mut self) -> i8 {
        loop {
            self.sm = self.sm.step();
            if let SessionStates::Done(sm) = &self.sm {
                if sm.state.should_exit {
                    return if sm.state.with_error { 1 } else { 0 };
                }
            }
        }
    }
}

/// Factory function for the `sercom` terminal session. Use it to get an
/// instance of the state machine, which you can run by invoking its `run()`
/// method.
///
/// ```no_run
/// use sercom::{self as sc, SettingsBuilder};
///
/// let settings = SettingsBuilder::new().port("/dev/ttyUSB0").finalize();
/// let mut terminal = sc::factory(settings);
/// let status = terminal.run(); // status code returned after the `Exit` event
/// std::process::exit(status.into());
/// ```
pub fn factory(settings: Settings) -> SerialTerminal {
    SerialTerminal {
        // The same machine naturally starts in the `Init` state.
        sm: SessionStates::Init(SessionSM::new(Context::new(settings))),
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// The raw state machine implementing the terminal session.
///
/// Note that using a generic type that holds the current state serves two
/// purposes. It allows for also having shared data by all states that is not
/// really part of state data (the session context). Additionally, it's nicer
/// when debugging to see the state machine and the current state it is
/// holding at any time.
#[derive(Debug)]
struct SessionSM<S: Runnable> {
    ctx: Context,
    state: S,
}
impl<S: Runnable> SessionSM<S> {
    fn run(&mut self) -> Event {
        self.state.run(&mut self.ctx)
    }
}

/// The state machine starts in the `InitState`.
impl SessionSM<InitState> {
    fn new(ctx: Context) -> Self {
        SessionSM {
            ctx,
            state: InitState {},
        }
    }
}

/// An enum wrapper around the states of the session state machine. It
/// provides a simpler and more intuitive model for manipulating states and
/// their transitions.
enum SessionStates {
    Init(SessionSM<InitState>),
    Connect(SessionSM<ConnectState>),
    Interactive(SessionSM<InteractiveState>),
    Done(SessionSM<DoneState>),
}
impl SessionStates {
    /// The unit of work in the state machine event loop. It runs the current
    /// state and decides the next transition from the event it returns.
    /// State transitions from events are implemented using the rust
    /// `From`/`Into` pattern, so most state/event mismatches are caught at
    /// compile time.
    fn step(&mut self) -> Self {
        match self {
            SessionStates::Init(sm) => {
                let event = sm.run();
                match event {
                    Event::Connect(ev) => SessionStates::Connect(ev.into()),
                    Event::Done(ev) => SessionStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            SessionStates::Connect(sm) => {
                let event = sm.run();
                match event {
                    Event::StartTerminal(ev) => SessionStates::Interactive(ev.into()),
                    Event::Done(ev) => SessionStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            SessionStates::Interactive(sm) => {
                let event = sm.run();
                match event {
                    Event::Done(ev) => SessionStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            SessionStates::Done(sm) => {
                let event = sm.run();
                match event {
                    Event::Exit(ev) => SessionStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<ConnectEvent> for SessionSM<ConnectState> {
    fn from(event: ConnectEvent) -> SessionSM<ConnectState> {
        SessionSM {
            ctx: event.ctx,
            state: ConnectState {},
        }
    }
}

impl From<StartTerminalEvent> for SessionSM<InteractiveState> {
    fn from(event: StartTerminalEvent) -> SessionSM<InteractiveState> {
        SessionSM {
            ctx: event.ctx,
            state: InteractiveState {
                port: Some(event.port),
            },
        }
    }
}

impl From<DoneEvent> for SessionSM<DoneState> {
    fn from(event: DoneEvent) -> SessionSM<DoneState> {
        SessionSM {
            ctx: event.ctx,
            state: DoneState {
                with_error: event.with_errors,
                should_exit: false,
            },
        }
    }
}
impl From<ExitEvent> for SessionSM<DoneState> {
    fn from(event: ExitEvent) -> SessionSM<DoneState> {
        SessionSM {
            ctx: event.ctx,
            state: DoneState {
                with_error: event.with_error,
                should_exit: true,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
