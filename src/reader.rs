//! Device-to-console path: line reassembly, filtering and the session log.
//!
//! The reader owns a clone of the port and runs on its own thread for as long
//! as the process lives. Every byte is accepted as is; a carriage return or a
//! line feed completes a line, which is then checked against the ignores and
//! filters before being recorded.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    mem,
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
};

use chrono::{DateTime, Local};
use console::style;
use hexplay::HexViewBuilder;
use log::{debug, error, log_enabled, trace, warn, Level::Trace};

use crate::{
    error::Result,
    tables::{self, SharedTables},
};

/// Largest chunk read from the port at once.
const CHUNK_SIZE: usize = 4096;
/// Timestamp prefixed to every recorded line.
pub const ENTRY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
/// Session log files are named after the session start time.
pub const LOG_NAME_FORMAT: &str = "%Y%m%d-%H%M%S%.3f";

// =============================================================================
// Line reassembly
// =============================================================================

/// Accumulates bytes until a line terminator shows up.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: Vec<u8>,
}
impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns the completed line when `byte` is `\r` or `\n`
    /// and the line is not empty, so `\r\n` produces a single line.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        match byte {
            b'\r' | b'\n' if self.buf.is_empty() => None,
            b'\r' | b'\n' => Some(mem::take(&mut self.buf)),
            other => {
                self.buf.push(other);
                None
            }
        }
    }

    /// Bytes received since the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

// =============================================================================
// Recording
// =============================================================================

/// Destination of the lines that pass the ignores and filters.
pub trait Recorder {
    fn record(&mut self, line: &[u8]) -> io::Result<()>;
}

/// The per-session log file. Every entry is flushed as soon as it is written
/// and echoed on stdout.
pub struct SessionLog {
    path: PathBuf,
    file: BufWriter<File>,
}
impl SessionLog {
    /// Create `<dir>/<started>.log`.
    pub fn create(dir: &Path, started: DateTime<Local>) -> io::Result<Self> {
        let path = dir.join(format!("{}.log", started.format(LOG_NAME_FORMAT)));
        let file = BufWriter::new(File::create(&path)?);
        debug!("session log: {}", path.display());
        Ok(SessionLog { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
impl Recorder for SessionLog {
    fn record(&mut self, line: &[u8]) -> io::Result<()> {
        let entry = format_entry(Local::now(), line);
        writeln!(self.file, "{}", entry)?;
        self.file.flush()?;
        println!("{}", entry);
        Ok(())
    }
}

/// `<timestamp> # <line>`, with invalid UTF-8 replaced.
pub fn format_entry(at: DateTime<Local>, line: &[u8]) -> String {
    format!(
        "{} # {}",
        at.format(ENTRY_TIME_FORMAT),
        String::from_utf8_lossy(line)
    )
}

// =============================================================================
// Reader loop
// =============================================================================

/// Read from `port` until it is closed, recording every completed line the
/// tables let through.
///
/// Read timeouts are the idle state of a serial port and are retried. Returns
/// `Ok(())` when the port reports end of stream, or the first read or record
/// error.
pub fn pump<R, S>(port: &mut R, tables: &SharedTables, sink: &mut S) -> Result<()>
where
    R: Read + ?Sized,
    S: Recorder + ?Sized,
{
    let mut assembler = LineAssembler::new();
    let mut chunk = vec![0; CHUNK_SIZE];
    loop {
        let count = match port.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(count) => count,
            Err(ref e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) =>
            {
                continue
            }
            Err(e) => return Err(e.into()),
        };

        if log_enabled!(Trace) {
            let view = HexViewBuilder::new(&chunk[..count])
                .address_offset(0)
                .row_width(16)
                .finish();
            trace!("{} bytes from device\n{}", count, view);
        }

        for &byte in &chunk[..count] {
            if let Some(line) = assembler.push(byte) {
                let keep = tables::lock(tables).should_record(&line);
                if keep {
                    sink.record(&line)?;
                } else {
                    trace!("dropped: {}", String::from_utf8_lossy(&line));
                }
            }
        }
    }
}

/// Start the reader on a detached thread. The thread ends only when the port
/// fails or closes; that is reported but does not stop the console. Joining
/// the thread gives back how the reader ended.
pub fn spawn<R, S>(
    mut port: R,
    tables: SharedTables,
    mut sink: S,
) -> io::Result<JoinHandle<Result<()>>>
where
    R: Read + Send + 'static,
    S: Recorder + Send + 'static,
{
    thread::Builder::new()
        .name("device-reader".into())
        .spawn(move || {
            let outcome = pump(&mut port, &tables, &mut sink);
            match &outcome {
                Ok(()) => {
                    warn!("device closed the connection");
                    eprintln!("{}", style("[SC] 🔌 Device closed the connection").red());
                }
                Err(err) => {
                    error!("device reader stopped: {}", err);
                    eprintln!(
                        "{} {}",
                        style("[SC] 💥 Device connection lost:").red(),
                        err
                    );
                }
            }
            outcome
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Tables;
    use chrono::TimeZone;
    use crate::error::Error;
    use std::{
        io::Cursor,
        sync::{Arc, Mutex},
    };

    #[derive(Default)]
    struct Lines(Vec<Vec<u8>>);
    impl Recorder for Lines {
        fn record(&mut self, line: &[u8]) -> io::Result<()> {
            self.0.push(line.to_vec());
            Ok(())
        }
    }

    /// Yields its chunks one read at a time, with a timeout in between.
    struct Flaky {
        chunks: Vec<&'static [u8]>,
        timed_out: bool,
    }
    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.timed_out {
                self.timed_out = true;
                return Err(io::Error::new(io::ErrorKind::TimedOut, "idle"));
            }
            self.timed_out = false;
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    struct Broken;
    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }
    }

    fn run(input: &[u8], tables: Tables) -> Vec<Vec<u8>> {
        let shared = tables.shared();
        let mut sink = Lines::default();
        pump(&mut Cursor::new(input.to_vec()), &shared, &mut sink).unwrap();
        sink.0
    }

    #[test]
    fn assembler_splits_on_cr_and_lf() {
        let mut assembler = LineAssembler::new();
        let mut lines = vec![];
        for &b in b"one\r\ntwo\nthree\rfour" {
            if let Some(line) = assembler.push(b) {
                lines.push(line);
            }
        }
        assert_eq!(lines, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
        assert_eq!(assembler.pending(), b"four");
    }

    #[test]
    fn partial_line_is_not_evaluated() {
        let lines = run(b"complete\npartial", Tables::new());
        assert_eq!(lines, vec![b"complete".to_vec()]);
    }

    #[test]
    fn ignored_lines_are_not_recorded() {
        let mut tables = Tables::new();
        tables.ignores.add("DEBUG").unwrap();
        let lines = run(b"DEBUG: noisy\r\nhello\r\n", tables);
        assert_eq!(lines, vec![b"hello".to_vec()]);
    }

    #[test]
    fn filtered_lines_only() {
        let mut tables = Tables::new();
        tables.filters.add("ERROR").unwrap();
        tables.filters.add("fail").unwrap();
        let lines = run(b"ERROR: fail\r\nINFO: ok\r\n", tables);
        assert_eq!(lines, vec![b"ERROR: fail".to_vec()]);
    }

    #[test]
    fn arbitrary_bytes_are_kept() {
        let lines = run(b"\x00\xff\x1b[0m\n", Tables::new());
        assert_eq!(lines, vec![b"\x00\xff\x1b[0m".to_vec()]);
    }

    #[test]
    fn timeouts_are_retried() {
        let shared = Tables::new().shared();
        let mut sink = Lines::default();
        let mut port = Flaky {
            chunks: vec![b"hel", b"lo\r", b"\nworld\n"],
            timed_out: false,
        };
        pump(&mut port, &shared, &mut sink).unwrap();
        assert_eq!(sink.0, vec![b"hello".to_vec(), b"world".to_vec()]);
    }

    #[test]
    fn read_fault_is_returned() {
        let shared = Tables::new().shared();
        let mut sink = Lines::default();
        assert!(pump(&mut Broken, &shared, &mut sink).is_err());
    }

    #[test]
    fn tables_updates_apply_to_following_lines() {
        let shared = Tables::new().shared();
        let mut sink = Lines::default();
        pump(&mut Cursor::new(b"first\n".to_vec()), &shared, &mut sink).unwrap();
        tables::lock(&shared).ignores.add("second").unwrap();
        pump(&mut Cursor::new(b"second\n".to_vec()), &shared, &mut sink).unwrap();
        assert_eq!(sink.0, vec![b"first".to_vec()]);
    }

    /// Recorder handing its lines over to the test thread.
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<Vec<u8>>>>);
    impl Recorder for Shared {
        fn record(&mut self, line: &[u8]) -> io::Result<()> {
            self.0.lock().unwrap().push(line.to_vec());
            Ok(())
        }
    }

    #[test]
    fn spawned_reader_records_until_end_of_stream() {
        let mut tables = Tables::new();
        tables.ignores.add("DEBUG").unwrap();
        let sink = Shared::default();
        let port = Cursor::new(b"boot\r\nDEBUG: x\nready\n".to_vec());

        let handle = spawn(port, tables.shared(), sink.clone()).unwrap();
        assert_eq!(handle.thread().name(), Some("device-reader"));
        assert!(handle.join().unwrap().is_ok());

        let lines = sink.0.lock().unwrap();
        assert_eq!(*lines, vec![b"boot".to_vec(), b"ready".to_vec()]);
    }

    #[test]
    fn spawned_reader_stops_on_read_fault() {
        let sink = Shared::default();
        let handle = spawn(Broken, Tables::new().shared(), sink.clone()).unwrap();
        match handle.join().unwrap() {
            Err(Error::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected {:?}", other),
        }
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn entry_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            format_entry(at, b"ERROR: fail"),
            "2024-03-09 14:05:07.000 # ERROR: fail"
        );
        assert_eq!(format_entry(at, b"\xffx"), "2024-03-09 14:05:07.000 # \u{fffd}x");
    }

    #[test]
    fn session_log_writes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let mut log = SessionLog::create(dir.path(), at).unwrap();
        assert_eq!(
            log.path().file_name().and_then(|n| n.to_str()),
            Some("20240309-140507.000.log")
        );
        log.record(b"ERROR: fail").unwrap();
        let text = std::fs::read_to_string(log.path()).unwrap();
        assert!(text.ends_with(" # ERROR: fail\n"));
        assert_eq!(text.lines().count(), 1);
    }
}
