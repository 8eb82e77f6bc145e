//! Console-to-device path.
//!
//! Every console line is either a meta-command, when it starts with
//! [`ESCAPE`], or one or more device commands separated by [`SEPARATOR`].
//! Device commands go through the alias table and are written to the link
//! followed by a newline.
//!
//! Meta-command names can be abbreviated to any unique prefix, so `/sh`
//! runs `show_config`.

use console::style;
use log::{debug, error, info, warn};

use super::{Console, Context};
use crate::{
    error::{CommandError, Error, Result},
    tables,
    utils::Link,
};

/// Prefix of local meta-commands.
pub const ESCAPE: char = '/';
/// Separates several device commands typed on one line.
pub const SEPARATOR: char = ';';

/// What the console loop does after a line was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meta {
    Reset,
    Exit,
    Save,
    ShowConfig,
    Alias,
    RmAlias,
    Ignore,
    Unignore,
    Filter,
    Unfilter,
    Help,
}

const ALIAS_USAGE: &str = "alias <ALIAS> = <CMD> | alias list";
const RMALIAS_USAGE: &str = "rmalias <ALIAS>";
const IGNORE_USAGE: &str = "ignore <PATTERN>";
const UNIGNORE_USAGE: &str = "unignore <PATTERN>";
const FILTER_USAGE: &str = "filter <PATTERN>";
const UNFILTER_USAGE: &str = "unfilter <PATTERN>";

const META_COMMANDS: &[(&str, Meta, &str)] = &[
    ("reset", Meta::Reset, "reset the device by toggling DTR"),
    ("exit", Meta::Exit, "save the input history and quit"),
    ("save", Meta::Save, "save port, aliases, filters and ignores"),
    ("show_config", Meta::ShowConfig, "print the current session state"),
    ("alias", Meta::Alias, ALIAS_USAGE),
    ("rmalias", Meta::RmAlias, RMALIAS_USAGE),
    ("ignore", Meta::Ignore, IGNORE_USAGE),
    ("unignore", Meta::Unignore, UNIGNORE_USAGE),
    ("filter", Meta::Filter, FILTER_USAGE),
    ("unfilter", Meta::Unfilter, UNFILTER_USAGE),
    ("help", Meta::Help, "list the meta-commands"),
];

fn lookup(name: &str) -> std::result::Result<Meta, CommandError> {
    if let Some((_, meta, _)) = META_COMMANDS.iter().find(|(n, _, _)| *n == name) {
        return Ok(*meta);
    }
    let candidates: Vec<_> = META_COMMANDS
        .iter()
        .filter(|(n, _, _)| !name.is_empty() && n.starts_with(name))
        .collect();
    match candidates.as_slice() {
        [(_, meta, _)] => Ok(*meta),
        [] => Err(CommandError::NotFound(name.into())),
        many => Err(CommandError::Ambiguous {
            name: name.into(),
            candidates: many.iter().map(|(n, _, _)| *n).collect(),
        }),
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim_start()),
        None => (text, ""),
    }
}

/// Handles console lines for a session, writing device commands to `link`.
pub struct Dispatcher<'a, L: Link> {
    link: L,
    ctx: &'a mut Context,
}
impl<'a, L: Link> Dispatcher<'a, L> {
    pub fn new(link: L, ctx: &'a mut Context) -> Self {
        Dispatcher { link, ctx }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Read lines from `console` until the `exit` meta-command or the end of
    /// the input. Returns an error only for faults on the link or the
    /// console, which end the session.
    ///
    /// The console history is saved however the loop ends.
    pub fn run<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<()> {
        let outcome = self.serve(console);
        if let Err(err) = console.save_history() {
            warn!("could not save the history: {}", err);
        }
        outcome
    }

    fn serve<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<()> {
        while let Some(line) = console.read_line()? {
            console.remember(&line);
            if self.dispatch(&line)? == Flow::Exit {
                return Ok(());
            }
        }
        debug!("end of console input");
        Ok(())
    }

    /// Handle one console line. Meta-command mistakes are reported on
    /// stderr and do not change anything.
    pub fn dispatch(&mut self, line: &str) -> Result<Flow> {
        match self.execute(line) {
            Err(Error::Command(err)) => {
                eprintln!("{} {}", style("[SC]").red(), err);
                Ok(Flow::Continue)
            }
            other => other,
        }
    }

    /// Like [`dispatch`](Self::dispatch) but meta-command mistakes come back
    /// as [`Error::Command`].
    pub fn execute(&mut self, line: &str) -> Result<Flow> {
        match line.strip_prefix(ESCAPE) {
            Some(meta) => self.meta(meta),
            None => {
                self.transmit(line)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn transmit(&mut self, line: &str) -> Result<()> {
        for command in line.split(SEPARATOR) {
            let mut resolved = tables::lock(&self.ctx.tables)
                .resolve(command.trim())
                .trim()
                .to_owned();
            debug!("-> {:?}", resolved);
            resolved.push('\n');
            self.link.write_all(resolved.as_bytes())?;
        }
        self.link.flush()?;
        Ok(())
    }

    fn meta(&mut self, text: &str) -> Result<Flow> {
        let (name, args) = split_word(text);
        match lookup(name)? {
            Meta::Reset => {
                self.link.pulse_reset()?;
                println!("{}", style("[SC] 🔁 Reset sent").dim());
            }
            Meta::Exit => return Ok(Flow::Exit),
            Meta::Save => self.save(),
            Meta::ShowConfig => print!("{}", self.describe()),
            Meta::Alias => self.alias(args)?,
            Meta::RmAlias => self.rmalias(args)?,
            Meta::Ignore => self.ignore(args)?,
            Meta::Unignore => self.unignore(args)?,
            Meta::Filter => self.filter(args)?,
            Meta::Unfilter => self.unfilter(args)?,
            Meta::Help => {
                for (name, _, help) in META_COMMANDS {
                    println!("  {}{:<12} {}", ESCAPE, name, style(help).dim());
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn save(&mut self) {
        let port = self.ctx.settings.port_or_default().to_owned();
        let snapshot = tables::lock(&self.ctx.tables).clone();
        match self.ctx.store.save(&port, &snapshot) {
            Ok(()) => println!("{}", style("Config saved").green()),
            Err(err) => {
                error!("saving {}: {}", self.ctx.store.path().display(), err);
                eprintln!("{} could not save the configuration: {}", style("[SC]").red(), err);
            }
        }
    }

    /// Human readable dump of the session state, as printed by
    /// `show_config`.
    pub fn describe(&self) -> String {
        let settings = &self.ctx.settings;
        let mut out = String::new();
        out.push_str(&format!("port: {}\n", settings.port_or_default()));
        out.push_str(&format!("baud_rate: {}\n", settings.baud_rate));
        out.push_str(&format!(
            "line: {:?} {:?} {:?} flow {:?}\n",
            settings.data_bits, settings.parity, settings.stop_bits, settings.flow_control
        ));
        out.push_str(&format!("config: {}\n", self.ctx.store.path().display()));
        out.push_str(&format!("history: {}\n", settings.history_path().display()));
        for (key, value) in &settings.extra {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        let tables = tables::lock(&self.ctx.tables);
        for (name, command) in &tables.aliases {
            out.push_str(&format!("alias {} = {}\n", name, command));
        }
        for (index, pattern) in tables.filters.patterns().enumerate() {
            out.push_str(&format!("filter{}: {}\n", index, pattern));
        }
        for (index, pattern) in tables.ignores.patterns().enumerate() {
            out.push_str(&format!("ignore{}: {}\n", index, pattern));
        }
        out
    }

    fn alias(&mut self, args: &str) -> Result<()> {
        if args.trim() == "list" {
            for (name, command) in &tables::lock(&self.ctx.tables).aliases {
                println!("{} = {}", name, command);
            }
            return Ok(());
        }
        let (name, command) = args
            .split_once('=')
            .ok_or(CommandError::Usage(ALIAS_USAGE))?;
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(CommandError::Usage(ALIAS_USAGE).into());
        }
        let command = command.trim();
        info!("alias {} = {}", name, command);
        tables::lock(&self.ctx.tables).set_alias(name, command);
        Ok(())
    }

    fn rmalias(&mut self, args: &str) -> Result<()> {
        let name = args.trim();
        if name.is_empty() {
            return Err(CommandError::Usage(RMALIAS_USAGE).into());
        }
        match tables::lock(&self.ctx.tables).remove_alias(name) {
            Some(_) => Ok(()),
            None => Err(CommandError::AliasNotFound(name.into()).into()),
        }
    }

    fn ignore(&mut self, args: &str) -> Result<()> {
        let pattern = pattern_arg(args, IGNORE_USAGE)?;
        tables::lock(&self.ctx.tables)
            .ignores
            .add(pattern)
            .map_err(|err| bad_pattern(pattern, err))?;
        info!("ignoring lines matching {}", pattern);
        Ok(())
    }

    fn unignore(&mut self, args: &str) -> Result<()> {
        let pattern = pattern_arg(args, UNIGNORE_USAGE)?;
        if tables::lock(&self.ctx.tables).ignores.remove(pattern) {
            println!("Remove ignore for {}", pattern);
            Ok(())
        } else {
            Err(CommandError::IgnoreNotFound(pattern.into()).into())
        }
    }

    fn filter(&mut self, args: &str) -> Result<()> {
        let pattern = pattern_arg(args, FILTER_USAGE)?;
        tables::lock(&self.ctx.tables)
            .filters
            .add(pattern)
            .map_err(|err| bad_pattern(pattern, err))?;
        info!("recording only lines matching {}", pattern);
        Ok(())
    }

    fn unfilter(&mut self, args: &str) -> Result<()> {
        let pattern = pattern_arg(args, UNFILTER_USAGE)?;
        if tables::lock(&self.ctx.tables).filters.remove(pattern) {
            println!("Remove filter for {}", pattern);
            Ok(())
        } else {
            Err(CommandError::FilterNotFound(pattern.into()).into())
        }
    }
}

fn pattern_arg<'t>(args: &'t str, usage: &'static str) -> Result<&'t str> {
    let pattern = args.trim();
    if pattern.is_empty() {
        return Err(CommandError::Usage(usage).into());
    }
    Ok(pattern)
}

fn bad_pattern(pattern: &str, err: regex::Error) -> Error {
    CommandError::BadPattern {
        pattern: pattern.into(),
        reason: err.to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================
