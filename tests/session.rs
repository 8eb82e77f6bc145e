//! End to end scenarios over the public API: console lines go through a
//! dispatcher writing to an in-memory link, device bytes are pumped from an
//! in-memory stream.

use std::{
    collections::VecDeque,
    fs,
    io::{self, Cursor, Write},
    path::PathBuf,
};

use rustyline::history::{FileHistory, History};
use sercom::{
    history,
    reader::{self, Recorder},
    CommandError, ConfigStore, Console, Context, Dispatcher, Error, Flow, Link, SettingsBuilder,
};

#[derive(Default)]
struct Wire {
    sent: Vec<u8>,
}
impl Write for Wire {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
impl Link for Wire {
    fn pulse_reset(&mut self) -> sercom::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Recorded(Vec<String>);
impl Recorder for Recorded {
    fn record(&mut self, line: &[u8]) -> io::Result<()> {
        self.0.push(String::from_utf8_lossy(line).into_owned());
        Ok(())
    }
}

fn session(dir: &tempfile::TempDir) -> Context {
    let settings = SettingsBuilder::new()
        .port("/dev/ttyACM0")
        .config_dir(dir.path())
        .finalize();
    let mut ctx = Context::new(settings);
    ctx.load().unwrap();
    ctx
}

fn device(ctx: &Context, bytes: &[u8]) -> Vec<String> {
    let mut recorded = Recorded::default();
    reader::pump(&mut Cursor::new(bytes.to_vec()), &ctx.tables, &mut recorded).unwrap();
    recorded.0
}

#[test]
fn alias_is_expanded_on_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = session(&dir);
    let mut dispatcher = Dispatcher::new(Wire::default(), &mut ctx);

    dispatcher.dispatch("/alias ON = led on").unwrap();
    dispatcher.dispatch("ON 1").unwrap();

    assert_eq!(dispatcher.link().sent, b"led on 1\n");
}

#[test]
fn every_line_is_recorded_without_tables() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = session(&dir);

    let lines = device(&ctx, b"boot\r\nready\n> ");

    assert_eq!(lines, vec!["boot", "ready"]);
}

#[test]
fn ignored_lines_are_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = session(&dir);
    Dispatcher::new(Wire::default(), &mut ctx)
        .dispatch("/ignore DEBUG")
        .unwrap();

    assert!(device(&ctx, b"DEBUG: noisy\r\n").is_empty());
}

#[test]
fn filters_keep_only_matching_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = session(&dir);
    Dispatcher::new(Wire::default(), &mut ctx)
        .dispatch("/filter ERROR")
        .unwrap();

    let lines = device(&ctx, b"ERROR: fail\r\nINFO: ok\r\n");

    assert_eq!(lines, vec!["ERROR: fail"]);
}

#[test]
fn ignores_win_over_filters() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = session(&dir);
    {
        let mut dispatcher = Dispatcher::new(Wire::default(), &mut ctx);
        dispatcher.dispatch("/filter ERROR").unwrap();
        dispatcher.dispatch("/filter fail").unwrap();
        dispatcher.dispatch("/ignore retry").unwrap();
    }

    let lines = device(&ctx, b"ERROR: fail, retry\nERROR: fail\n");

    assert_eq!(lines, vec!["ERROR: fail"]);
}

#[test]
fn unknown_alias_removal_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = session(&dir);
    let mut dispatcher = Dispatcher::new(Wire::default(), &mut ctx);

    assert_eq!(dispatcher.dispatch("/rmalias nope").unwrap(), Flow::Continue);
    match dispatcher.execute("/rmalias nope") {
        Err(Error::Command(CommandError::AliasNotFound(name))) => assert_eq!(name, "nope"),
        other => panic!("unexpected {:?}", other),
    }
    assert!(dispatcher.link().sent.is_empty());
}

#[test]
fn saving_twice_gives_the_same_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = session(&dir);
    let path = ctx.settings.config_path();
    let mut dispatcher = Dispatcher::new(Wire::default(), &mut ctx);
    dispatcher.dispatch("/alias ON = led on").unwrap();
    dispatcher.dispatch("/filter ERR").unwrap();

    dispatcher.dispatch("/save").unwrap();
    let first = fs::read(&path).unwrap();
    dispatcher.dispatch("/save").unwrap();
    let second = fs::read(&path).unwrap();

    assert_eq!(first, second);
}

#[test]
fn saved_tables_come_back_in_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = session(&dir);
    {
        let mut dispatcher = Dispatcher::new(Wire::default(), &mut ctx);
        dispatcher.dispatch("/alias ON = led on").unwrap();
        dispatcher.dispatch("/alias st = status -v").unwrap();
        dispatcher.dispatch("/filter ^ERR").unwrap();
        dispatcher.dispatch("/filter WARN").unwrap();
        dispatcher.dispatch("/ignore heartbeat").unwrap();
        dispatcher.dispatch("/save").unwrap();
    }

    let restored = session(&dir);

    assert_eq!(
        *sercom::tables::lock(&restored.tables),
        *sercom::tables::lock(&ctx.tables)
    );
    assert_eq!(
        ConfigStore::load(ctx.settings.config_path()).unwrap().port(),
        Some("/dev/ttyACM0".to_string())
    );
}

/// Console typing a fixed list of lines, with its history in a file.
struct Typed {
    lines: VecDeque<String>,
    history: FileHistory,
    path: PathBuf,
}
impl Typed {
    fn new(path: PathBuf, lines: &[&str]) -> Self {
        Typed {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            history: history::load(&path).unwrap(),
            path,
        }
    }
}
impl Console for Typed {
    fn read_line(&mut self) -> sercom::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
    fn remember(&mut self, line: &str) {
        self.history.add(line).unwrap();
    }
    fn save_history(&mut self) -> sercom::Result<()> {
        history::save(&mut self.history, &self.path)
    }
}

#[test]
fn history_is_kept_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = session(&dir);
    let path = ctx.settings.history_path();
    let mut console = Typed::new(path.clone(), &["ps", "/exit", "never"]);
    Dispatcher::new(Wire::default(), &mut ctx)
        .run(&mut console)
        .unwrap();

    let restored = Typed::new(path, &[]);
    let lines: Vec<&str> = restored.history.iter().map(String::as_str).collect();

    assert_eq!(lines, vec!["ps", "/exit"]);
}
