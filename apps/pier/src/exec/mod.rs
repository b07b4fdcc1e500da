//! Interactive exec over a WebSocket carrying enveloped protobuf frames.

use bytes::Bytes;
use grpc_web_codec::{WireError, decode_frame, encode_frame};
use pier_proto::exec::exec_stream_request::{Event as Request, Input, InputEof, Start};
use pier_proto::exec::exec_stream_response::Event as Response;
use pier_proto::{ExecStreamRequest, ExecStreamResponse, Pty, WindowSize};
use thiserror::Error;

use crate::config::ConfigError;

pub mod line;
pub mod listeners;
pub mod ws;

pub use line::{Keystroke, LineDiscipline, LineOutput};
pub use listeners::{ListenerGuard, ListenerSet};

pub const TERM: &str = "xterm-256color";
pub const CONNECTING: &str = "Connecting...";
const CLEAR_LINE: &str = "\r\u{1b}[2K";
const CONNECTION_CLOSED: &str = "\r\nConnection closed\r\n";
const DETACHED: &str = "\r\n[detached]";

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("exec requires a command to run")]
    EmptyArgs,
    #[error("deployment id must not be empty")]
    EmptyDeployment,
    #[error("socket is closed")]
    SocketClosed,
    #[error("websocket error: {0}")]
    WebSocket(String),
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for ExecError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        ExecError::WebSocket(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Outbound half of the exec socket.
pub trait ExecSocket: Send + Sync {
    fn ready_state(&self) -> ReadyState;

    fn send_binary(&self, data: Bytes) -> Result<(), ExecError>;

    fn close(&self) {}
}

/// Local terminal the session renders into.
pub trait TerminalSink: Send {
    fn write(&mut self, text: &str);

    fn write_bytes(&mut self, data: &[u8]);

    fn size(&self) -> Option<WindowSize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

pub struct ExecSession<S, T> {
    deployment_id: String,
    args: Vec<String>,
    socket: S,
    terminal: T,
    line: LineDiscipline,
    listeners: ListenerSet,
    state: SessionState,
    placeholder: bool,
    closed_notice: bool,
    torn_down: bool,
    exit_code: Option<i32>,
    detached: bool,
}

impl<S: ExecSocket, T: TerminalSink> ExecSession<S, T> {
    pub fn new(
        deployment_id: impl Into<String>,
        args: Vec<String>,
        socket: S,
        mut terminal: T,
    ) -> Result<Self, ExecError> {
        let deployment_id = deployment_id.into();
        if deployment_id.trim().is_empty() {
            return Err(ExecError::EmptyDeployment);
        }
        if args.first().is_none_or(|command| command.trim().is_empty()) {
            return Err(ExecError::EmptyArgs);
        }
        terminal.write(CONNECTING);
        Ok(Self {
            deployment_id,
            args,
            socket,
            terminal,
            line: LineDiscipline::new(),
            listeners: ListenerSet::new(),
            state: SessionState::Connecting,
            placeholder: true,
            closed_notice: false,
            torn_down: false,
            exit_code: None,
            detached: false,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// True once the user left with the detach key.
    pub fn detached(&self) -> bool {
        self.detached
    }

    pub fn line_buffer(&self) -> &str {
        self.line.buffer()
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn listeners_mut(&mut self) -> &mut ListenerSet {
        &mut self.listeners
    }

    pub fn on_open(&mut self) {
        let pty = Pty {
            enable: true,
            term: TERM.to_string(),
            window_size: self.terminal.size(),
        };
        tracing::debug!(
            target: "pier::exec",
            deployment_id = %self.deployment_id,
            args = ?self.args,
            "starting exec"
        );
        self.send(Request::Start(Start {
            deployment_id: self.deployment_id.clone(),
            args: self.args.clone(),
            pty: Some(pty),
        }));
    }

    pub fn on_resize(&mut self, size: WindowSize) {
        self.send(Request::Winch(size));
    }

    pub fn on_terminal_data(&mut self, data: &str) {
        let LineOutput {
            echo,
            submit,
            detach,
        } = self.line.feed(data);
        if !echo.is_empty() {
            self.terminal.write(&echo);
        }
        if detach {
            self.detach();
        } else if let Some(command) = submit {
            self.send(Request::Input(Input {
                data: command.into_bytes(),
            }));
        }
    }

    /// Raw bytes bypass the line buffer.
    pub fn on_binary_input(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if data.contains(&(line::DETACH as u8)) {
            self.detach();
            return;
        }
        self.send(Request::Input(Input {
            data: data.to_vec(),
        }));
    }

    pub fn on_input_eof(&mut self) {
        self.send(Request::InputEof(InputEof {}));
    }

    pub fn on_socket_message(&mut self, frame: &[u8]) {
        match decode_frame::<ExecStreamResponse>(frame) {
            Ok(response) => self.handle_response(response),
            Err(err) => {
                tracing::warn!(target: "pier::exec", error = %err, "undecodable exec frame");
                self.terminal
                    .write(&format!("\r\n[failed to decode message: {err}]\r\n"));
            }
        }
    }

    /// Flushes any trailing output carried by the close and prints the
    /// closed notice.
    pub fn on_socket_closed(&mut self, trailing: Option<&[u8]>) {
        if let Some(frame) = trailing.filter(|frame| !frame.is_empty()) {
            match decode_frame::<ExecStreamResponse>(frame) {
                Ok(response) => self.handle_response(response),
                Err(err) => {
                    tracing::debug!(target: "pier::exec", error = %err, "ignoring trailing close payload");
                }
            }
        }
        self.notice_closed();
    }

    /// Releases every listener. Calling it again does nothing.
    pub fn teardown(&mut self) -> usize {
        let disposed = self.listeners.dispose_all();
        if !std::mem::replace(&mut self.torn_down, true) {
            self.socket.close();
        }
        self.state = SessionState::Closed;
        disposed
    }

    /// Leaves the session locally; the remote process is not signalled.
    pub fn detach(&mut self) {
        if self.torn_down {
            return;
        }
        tracing::debug!(target: "pier::exec", deployment_id = %self.deployment_id, "detaching");
        self.detached = true;
        self.terminal.write(DETACHED);
        self.notice_closed();
        self.teardown();
    }

    fn handle_response(&mut self, response: ExecStreamResponse) {
        match response.event {
            Some(Response::Open(_)) => {
                self.clear_placeholder();
                self.state = SessionState::Open;
            }
            Some(Response::Output(output)) => {
                self.clear_placeholder();
                self.terminal.write_bytes(&output.data);
            }
            Some(Response::Exit(exit)) => {
                self.exit_code = Some(exit.code);
                self.terminal
                    .write(&format!("\r\nProcess exited with code {}\r\n", exit.code));
                self.notice_closed();
            }
            None => self.notice_closed(),
        }
    }

    fn clear_placeholder(&mut self) {
        if std::mem::take(&mut self.placeholder) {
            self.terminal.write(CLEAR_LINE);
        }
    }

    fn notice_closed(&mut self) {
        if !std::mem::replace(&mut self.closed_notice, true) {
            self.clear_placeholder();
            self.terminal.write(CONNECTION_CLOSED);
        }
        self.state = SessionState::Closed;
    }

    /// Fire-and-forget; data for a socket that is not open is dropped.
    fn send(&self, event: Request) -> bool {
        let state = self.socket.ready_state();
        if state != ReadyState::Open {
            tracing::debug!(target: "pier::exec", ?state, "dropping frame for socket that is not open");
            return false;
        }
        let frame = encode_frame(&ExecStreamRequest { event: Some(event) });
        match self.socket.send_binary(frame) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(target: "pier::exec", error = %err, "dropping frame");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pier_proto::exec::exec_stream_response::{Exit, Open, Output};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct MockSocket {
        state: Arc<Mutex<ReadyState>>,
        sent: Arc<Mutex<Vec<Bytes>>>,
        closes: Arc<AtomicUsize>,
    }

    impl MockSocket {
        fn new(state: ReadyState) -> Self {
            Self {
                state: Arc::new(Mutex::new(state)),
                sent: Arc::default(),
                closes: Arc::default(),
            }
        }

        fn requests(&self) -> Vec<Request> {
            self.sent
                .lock()
                .iter()
                .map(|frame| {
                    decode_frame::<ExecStreamRequest>(frame)
                        .expect("decode request")
                        .event
                        .expect("event set")
                })
                .collect()
        }
    }

    impl ExecSocket for MockSocket {
        fn ready_state(&self) -> ReadyState {
            *self.state.lock()
        }

        fn send_binary(&self, data: Bytes) -> Result<(), ExecError> {
            self.sent.lock().push(data);
            Ok(())
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
            *self.state.lock() = ReadyState::Closed;
        }
    }

    #[derive(Default)]
    struct MockTerminal {
        output: Vec<u8>,
        size: Option<WindowSize>,
    }

    impl MockTerminal {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.output).into_owned()
        }
    }

    impl TerminalSink for MockTerminal {
        fn write(&mut self, text: &str) {
            self.output.extend_from_slice(text.as_bytes());
        }

        fn write_bytes(&mut self, data: &[u8]) {
            self.output.extend_from_slice(data);
        }

        fn size(&self) -> Option<WindowSize> {
            self.size
        }
    }

    fn session(state: ReadyState) -> (ExecSession<MockSocket, MockTerminal>, MockSocket) {
        let socket = MockSocket::new(state);
        let terminal = MockTerminal {
            size: Some(WindowSize {
                rows: 24,
                cols: 80,
                width: 640,
                height: 480,
            }),
            ..MockTerminal::default()
        };
        let session = ExecSession::new("dep-1", vec!["sh".into()], socket.clone(), terminal)
            .expect("session");
        (session, socket)
    }

    fn response(event: Response) -> Bytes {
        encode_frame(&ExecStreamResponse { event: Some(event) })
    }

    #[test]
    fn rejects_empty_args() {
        let result = ExecSession::new(
            "dep-1",
            Vec::new(),
            MockSocket::new(ReadyState::Open),
            MockTerminal::default(),
        );
        assert!(matches!(result, Err(ExecError::EmptyArgs)));

        for args in [vec![String::new()], vec!["  ".to_string(), "-c".to_string()]] {
            let result = ExecSession::new(
                "dep-1",
                args,
                MockSocket::new(ReadyState::Open),
                MockTerminal::default(),
            );
            assert!(matches!(result, Err(ExecError::EmptyArgs)));
        }
    }

    #[test]
    fn control_keys_other_than_detach_keep_the_session() {
        let (mut session, socket) = session(ReadyState::Open);
        for key in ["\u{3}", "\u{4}", "\u{1c}"] {
            session.on_terminal_data(key);
        }
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(!session.detached());
        assert_eq!(socket.closes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn detach_key_tears_the_session_down() {
        let (mut session, socket) = session(ReadyState::Open);
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        session.listeners_mut().register("stdin", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        session.on_terminal_data("to");
        session.on_terminal_data("\u{1d}");

        assert!(session.detached());
        assert_eq!(session.state(), SessionState::Closed);
        assert!(socket.requests().is_empty());
        assert_eq!(socket.closes.load(Ordering::SeqCst), 1);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        let text = session.terminal().text();
        assert!(text.contains(DETACHED));
        assert_eq!(text.matches("Connection closed").count(), 1);

        session.on_socket_closed(None);
        assert_eq!(session.teardown(), 0);
        assert_eq!(socket.closes.load(Ordering::SeqCst), 1);
        assert_eq!(session.terminal().text().matches("Connection closed").count(), 1);
    }

    #[test]
    fn detach_byte_in_binary_input_is_not_forwarded() {
        let (mut session, socket) = session(ReadyState::Open);
        session.on_binary_input(&[0xff, 0x1d]);
        assert!(session.detached());
        assert!(socket.sent.lock().is_empty());
    }

    #[test]
    fn open_sends_start_with_pty() {
        let (mut session, socket) = session(ReadyState::Open);
        assert_eq!(session.terminal().text(), CONNECTING);
        session.on_open();

        let requests = socket.requests();
        assert_eq!(requests.len(), 1);
        let Request::Start(start) = &requests[0] else {
            panic!("expected start, got {:?}", requests[0]);
        };
        assert_eq!(start.deployment_id, "dep-1");
        assert_eq!(start.args, vec!["sh".to_string()]);
        let pty = start.pty.as_ref().expect("pty");
        assert!(pty.enable);
        assert_eq!(pty.term, TERM);
        assert_eq!(pty.window_size.map(|size| size.cols), Some(80));
    }

    #[test]
    fn typed_command_is_sent_once_on_enter() {
        let (mut session, socket) = session(ReadyState::Open);
        session.on_terminal_data("l");
        session.on_terminal_data("s");
        assert!(socket.requests().is_empty());

        session.on_terminal_data("\r");
        assert_eq!(
            socket.requests(),
            vec![Request::Input(Input {
                data: b"ls\n".to_vec()
            })]
        );
        assert_eq!(session.line_buffer(), "");
    }

    #[test]
    fn sends_on_closed_socket_are_dropped() {
        let (mut session, socket) = session(ReadyState::Connecting);
        session.on_open();
        session.on_terminal_data("x");
        session.on_terminal_data("\r");
        session.on_binary_input(&[0x1b, 0xff]);
        session.on_resize(WindowSize::default());
        assert!(socket.sent.lock().is_empty());
    }

    #[test]
    fn resize_and_binary_input_bypass_the_line() {
        let (mut session, socket) = session(ReadyState::Open);
        let size = WindowSize {
            rows: 40,
            cols: 120,
            width: 0,
            height: 0,
        };
        session.on_terminal_data("pending");
        session.on_resize(size);
        session.on_binary_input(&[0xc3, 0x28]);
        session.on_input_eof();
        assert_eq!(
            socket.requests(),
            vec![
                Request::Winch(size),
                Request::Input(Input {
                    data: vec![0xc3, 0x28]
                }),
                Request::InputEof(InputEof {}),
            ]
        );
        assert_eq!(session.line_buffer(), "pending");
    }

    #[test]
    fn open_ack_clears_placeholder_and_output_is_verbatim() {
        let (mut session, _socket) = session(ReadyState::Open);
        session.on_socket_message(&response(Response::Open(Open {})));
        assert_eq!(session.state(), SessionState::Open);
        session.on_socket_message(&response(Response::Output(Output {
            channel: 1,
            data: b"total 0\r\n".to_vec(),
        })));
        assert_eq!(
            session.terminal().text(),
            format!("{CONNECTING}{CLEAR_LINE}total 0\r\n")
        );
    }

    #[test]
    fn exit_reports_code_and_closes_once() {
        let (mut session, _socket) = session(ReadyState::Open);
        session.on_socket_message(&response(Response::Open(Open {})));
        session.on_socket_message(&response(Response::Exit(Exit { code: 3 })));
        session.on_socket_closed(None);

        let text = session.terminal().text();
        assert!(text.contains("Process exited with code 3"));
        assert_eq!(text.matches("Connection closed").count(), 1);
        assert_eq!(session.exit_code(), Some(3));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn close_flushes_trailing_output() {
        let (mut session, _socket) = session(ReadyState::Open);
        let trailing = response(Response::Output(Output {
            channel: 1,
            data: b"bye".to_vec(),
        }));
        session.on_socket_closed(Some(&trailing));
        let text = session.terminal().text();
        assert!(text.contains("bye\r\nConnection closed"));
    }

    #[test]
    fn unset_event_means_closed() {
        let (mut session, _socket) = session(ReadyState::Open);
        session.on_socket_message(&response_unset());
        assert!(session.terminal().text().ends_with(CONNECTION_CLOSED));
    }

    fn response_unset() -> Bytes {
        encode_frame(&ExecStreamResponse { event: None })
    }

    #[test]
    fn bad_frame_writes_diagnostic() {
        let (mut session, _socket) = session(ReadyState::Open);
        session.on_socket_message(&[0, 0, 0]);
        assert!(session.terminal().text().contains("failed to decode message"));
    }

    #[test]
    fn teardown_twice_is_a_noop() {
        let (mut session, socket) = session(ReadyState::Open);
        let disposed = Arc::new(AtomicUsize::new(0));
        for name in ["input", "resize"] {
            let disposed = Arc::clone(&disposed);
            session.listeners_mut().register(name, move || {
                disposed.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(session.teardown(), 2);
        assert_eq!(session.teardown(), 0);
        assert_eq!(disposed.load(Ordering::SeqCst), 2);
        assert_eq!(socket.closes.load(Ordering::SeqCst), 1);
    }
}
