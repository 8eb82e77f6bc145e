//! States for the `sercom` terminal session state machine.
//!
//! This modules is private and restricted to the [`session`](crate::session)
//! scope. Refer to the [`state_machine`](super::state_machine) module for an
//! overview of states, events and transitions.

use std::fmt;

use chrono::Local;
use console::style;
use log::{error, info, warn};
use serialport::SerialPort;

use super::{dispatcher::Dispatcher, events::*, Context, Prompt};
use crate::{
    reader::{self, SessionLog},
    settings::DEFAULT_PORT,
    utils::open_and_setup_port,
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// A state implements this method so it can be `run` after the state
    /// machine transitions into it.
    ///
    /// During this call, the state can do any work that needs to be done and
    /// when finished, requests a transition to a `new state` by returning the
    /// appropriate `event`. The `state` and the `event` are consumed to create
    /// the `new state` using the corresponding [`From`] trait implementation
    /// (provided such implementation exists).
    fn run(&mut self, ctx: &mut Context) -> Event;
}

// Init State ==================================================================

/// The initial state of the session.
///
/// Loads the configuration file, then settles which port to open:
///
///  * **[`ConnectEvent`] => [`ConnectState`]** once everything is loaded,
///  * **[`DoneEvent`] => [`DoneState`]** when the configuration file is
///    malformed.
#[derive(Debug)]
pub(crate) struct InitState {}
impl Runnable for InitState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> Init");

        if let Err(err) = ctx.load() {
            error!("{}", err);
            eprintln!("{} {}", style("[SC] 💥").red(), err);
            return Event::Done(DoneEvent {
                ctx: ctx.clone(),
                with_errors: true,
            });
        }

        if ctx.settings.port.is_none() {
            warn!("no port specified, using default {}", DEFAULT_PORT);
            eprintln!("No port specified, using default ({})!", DEFAULT_PORT);
            ctx.settings.port = Some(DEFAULT_PORT.into());
        }

        Event::Connect(ConnectEvent { ctx: ctx.clone() })
    }
}

// Connect State ===============================================================

/// Opens the serial port.
///
///  * **[`StartTerminalEvent`] => [`InteractiveState`]** with the open port,
///  * **[`DoneEvent`] => [`DoneState`]** when the port cannot be opened, which
///    is fatal.
#[derive(Debug)]
pub(crate) struct ConnectState {}
impl Runnable for ConnectState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> Connect");

        match open_and_setup_port(&ctx.settings) {
            Ok(port) => Event::StartTerminal(StartTerminalEvent {
                ctx: ctx.clone(),
                port,
            }),
            Err(err) => {
                eprintln!(
                    "{} could not open {}: {}",
                    style("[SC] 💥").red(),
                    style(ctx.settings.port_or_default()).cyan(),
                    err
                );
                Event::Done(DoneEvent {
                    ctx: ctx.clone(),
                    with_errors: true,
                })
            }
        }
    }
}

// Interactive State ===========================================================

/// A `state` where `sercom` runs as a terminal: the device reader records
/// lines on its own thread while the console lines are dispatched here.
///
///  * **[`DoneEvent`] => [`DoneState`]** on `exit`, at the end of the console
///    input, or with errors when writing to the port fails.
pub(crate) struct InteractiveState {
    /// The serial port, already configured and open.
    pub port: Option<Box<dyn SerialPort>>,
}
impl Runnable for InteractiveState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> Interactive");

        let port = match self.port.take() {
            Some(port) => port,
            None => unreachable!("the interactive state always starts with a port"),
        };

        let with_errors = match start_console(port.as_ref(), ctx) {
            Ok((mut console, log)) => {
                println!(
                    "Welcome to sercom! Logging to {}\nType '/exit' to exit.",
                    style(log).dim()
                );
                let mut dispatcher = Dispatcher::new(port, ctx);
                match dispatcher.run(&mut console) {
                    Ok(()) => false,
                    Err(err) => {
                        error!("{}", err);
                        eprintln!("{} {}", style("[SC] 💥 Unrecoverable error:").red(), err);
                        true
                    }
                }
            }
            Err(err) => {
                error!("could not start the terminal: {}", err);
                eprintln!("{} {}", style("[SC] 💥").red(), err);
                true
            }
        };

        Event::Done(DoneEvent {
            ctx: ctx.clone(),
            with_errors,
        })
    }
}
impl fmt::Debug for InteractiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.port {
            Some(port) => debug_fmt_port!("InteractiveState", port, f),
            None => f.debug_tuple("InteractiveState").finish(),
        }
    }
}

/// Start the line editor with the saved history, open the session log and
/// start the detached reader on a clone of the port. Returns the console and
/// the log file path for display.
fn start_console(
    port: &dyn SerialPort,
    ctx: &Context,
) -> crate::error::Result<(Prompt, String)> {
    let console = Prompt::open(ctx.settings.history_path())?;
    let device = port.try_clone()?;
    let log = SessionLog::create(&ctx.settings.config_dir, Local::now())?;
    let path = log.path().display().to_string();
    reader::spawn(device, ctx.tables.clone(), log)?;
    Ok((console, path))
}

// Done State ==================================================================

/// Reached when the session completes its execution and is about to terminate
/// (normally or abnormally).
///
/// This state goes into a 2-phase execution. During the initial phase, it runs
/// like any other state to report errors. It then triggers the [`ExitEvent`]
/// to cause the session state machine to terminate and exit.
#[derive(Debug, Copy, Clone)]
pub(crate) struct DoneState {
    /// When `true`, indicates an abnormal completion caused by an error.
    pub with_error: bool,
    /// When `true` instructs the session state machine to exit its event
    /// loop.
    pub should_exit: bool,
}
impl Runnable for DoneState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!(
            "=> Done with{}errors",
            if self.with_error { " " } else { " no " }
        );
        if self.with_error {
            eprintln!("{}", style("[SC] 💥 Session ended with errors!").red());
        }

        Event::Exit(ExitEvent {
            ctx: ctx.clone(),
            with_error: self.with_error,
        })
    }
}
