//! Local terminal plumbing shared by `pier logs` and `pier exec`.

use std::io::{self, Write};

use crossterm::terminal;
use pier_proto::WindowSize;

use crate::exec::TerminalSink;

pub mod render;
pub mod tty;

pub use render::write_entry;
pub use tty::RawModeGuard;

/// Current size of the controlling terminal, if there is one.
pub fn window_size() -> Option<WindowSize> {
    if let Ok(size) = terminal::window_size() {
        return Some(WindowSize {
            rows: i32::from(size.rows),
            cols: i32::from(size.columns),
            width: i32::from(size.width),
            height: i32::from(size.height),
        });
    }
    terminal::size().ok().map(|(cols, rows)| WindowSize {
        rows: i32::from(rows),
        cols: i32::from(cols),
        width: 0,
        height: 0,
    })
}

/// `TerminalSink` over the process stdout. Write errors are logged and
/// otherwise ignored.
#[derive(Debug, Default)]
pub struct StdoutTerminal;

impl StdoutTerminal {
    pub fn new() -> Self {
        Self
    }

    fn emit(&self, data: &[u8]) {
        let mut stdout = io::stdout().lock();
        if let Err(err) = stdout.write_all(data).and_then(|()| stdout.flush()) {
            tracing::debug!(target: "pier::terminal", error = %err, "stdout write failed");
        }
    }
}

impl TerminalSink for StdoutTerminal {
    fn write(&mut self, text: &str) {
        self.emit(text.as_bytes());
    }

    fn write_bytes(&mut self, data: &[u8]) {
        self.emit(data);
    }

    fn size(&self) -> Option<WindowSize> {
        window_size()
    }
}
