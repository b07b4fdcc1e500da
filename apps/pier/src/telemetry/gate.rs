//! Stderr sink that steps aside while an exec session owns the terminal.
//!
//! In raw mode a log line written to stderr lands in the middle of the
//! remote shell's output with no carriage return. While a [`TerminalLease`]
//! is alive, formatted records are parked in a bounded backlog and written
//! out when the lease is dropped, after the terminal has been restored.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;

/// Records kept while the terminal is held; the oldest are dropped first.
pub const BACKLOG_LIMIT: usize = 512;

#[derive(Debug, Default)]
struct Backlog {
    records: VecDeque<Vec<u8>>,
    dropped: usize,
}

#[derive(Debug)]
pub struct Gate {
    held: AtomicBool,
    backlog: Mutex<Backlog>,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
            backlog: parking_lot::const_mutex(Backlog {
                records: VecDeque::new(),
                dropped: 0,
            }),
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Parks records until the returned lease is dropped. A nested hold
    /// returns a lease that releases nothing.
    pub fn hold(&self) -> TerminalLease<'_> {
        let _backlog = self.backlog.lock();
        let owner = !self.held.swap(true, Ordering::AcqRel);
        TerminalLease { gate: self, owner }
    }

    /// Number of records waiting for the terminal.
    pub fn parked(&self) -> usize {
        self.backlog.lock().records.len()
    }

    pub fn emit(&self, record: &[u8], out: &mut dyn Write) {
        if record.is_empty() {
            return;
        }
        let mut backlog = self.backlog.lock();
        if self.held.load(Ordering::Acquire) {
            if backlog.records.len() == BACKLOG_LIMIT {
                backlog.records.pop_front();
                backlog.dropped += 1;
            }
            backlog.records.push_back(record.to_vec());
            return;
        }
        drop(backlog);
        let _ = out.write_all(record);
    }

    fn release(&self, out: &mut dyn Write) -> usize {
        let mut backlog = self.backlog.lock();
        let Backlog { records, dropped } = std::mem::take(&mut *backlog);
        if dropped > 0 {
            let _ = writeln!(
                out,
                "[pier] {dropped} log records were discarded while the terminal was in raw mode"
            );
        }
        for record in &records {
            let _ = out.write_all(record);
        }
        let _ = out.flush();
        self.held.store(false, Ordering::Release);
        records.len()
    }
}

/// Keeps log output off the terminal for as long as it is alive.
#[must_use = "logging returns to stderr as soon as the lease is dropped"]
#[derive(Debug)]
pub struct TerminalLease<'a> {
    gate: &'a Gate,
    owner: bool,
}

impl TerminalLease<'_> {
    /// Writes the parked records to `out` instead of stderr.
    pub fn release_into(mut self, out: &mut dyn Write) -> usize {
        if std::mem::take(&mut self.owner) {
            self.gate.release(out)
        } else {
            0
        }
    }
}

impl Drop for TerminalLease<'_> {
    fn drop(&mut self) {
        if self.owner {
            self.gate.release(&mut io::stderr().lock());
        }
    }
}

/// `MakeWriter` for the fmt layer: one buffer per event, handed to the gate
/// when the event is complete.
#[derive(Debug, Clone, Copy)]
pub struct GatedStderr {
    gate: &'static Gate,
}

impl GatedStderr {
    pub fn new(gate: &'static Gate) -> Self {
        Self { gate }
    }
}

pub struct RecordWriter {
    gate: &'static Gate,
    record: Vec<u8>,
}

impl Write for RecordWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.record.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for RecordWriter {
    fn drop(&mut self) {
        self.gate.emit(&self.record, &mut io::stderr().lock());
    }
}

impl<'a> MakeWriter<'a> for GatedStderr {
    type Writer = RecordWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RecordWriter {
            gate: self.gate,
            record: Vec::new(),
        }
    }
}
