use std::io::{IsTerminal, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{Connector, connect_async_tls_with_config};

use super::{ExecError, ExecSession, ExecSocket, ListenerGuard, ReadyState};
use crate::api::RequestMetadata;
use crate::config::Config;
use crate::telemetry;
use crate::terminal::{RawModeGuard, StdoutTerminal};

const STDIN_CHUNK: usize = 1024;

/// Inbound traffic from the exec socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Frame(Vec<u8>),
    Closed(Option<Vec<u8>>),
}

fn encode_state(state: ReadyState) -> u8 {
    match state {
        ReadyState::Connecting => 0,
        ReadyState::Open => 1,
        ReadyState::Closing => 2,
        ReadyState::Closed => 3,
    }
}

fn decode_state(raw: u8) -> ReadyState {
    match raw {
        0 => ReadyState::Connecting,
        1 => ReadyState::Open,
        2 => ReadyState::Closing,
        _ => ReadyState::Closed,
    }
}

/// Outbound handle. Frames are queued to a writer task; the ready state is
/// shared with the reader so a closed connection stops accepting sends.
#[derive(Clone)]
pub struct WsExecSocket {
    state: Arc<AtomicU8>,
    tx: mpsc::UnboundedSender<Message>,
}

impl WsExecSocket {
    fn set_state(&self, state: ReadyState) {
        self.state.store(encode_state(state), Ordering::SeqCst);
    }
}

impl ExecSocket for WsExecSocket {
    fn ready_state(&self) -> ReadyState {
        decode_state(self.state.load(Ordering::SeqCst))
    }

    fn send_binary(&self, data: Bytes) -> Result<(), ExecError> {
        self.tx
            .send(Message::Binary(data.to_vec()))
            .map_err(|_| ExecError::SocketClosed)
    }

    fn close(&self) {
        if self.ready_state() == ReadyState::Open {
            self.set_state(ReadyState::Closing);
            let _ = self.tx.send(Message::Close(None));
        }
    }
}

pub struct WsConnection {
    pub socket: WsExecSocket,
    pub events: mpsc::UnboundedReceiver<SocketEvent>,
    pub task: JoinHandle<()>,
}

/// Opens the exec WebSocket with the request metadata as upgrade headers.
pub async fn connect(config: &Config, metadata: &RequestMetadata) -> Result<WsConnection, ExecError> {
    let url = config.exec_url()?;
    let mut request = url.as_str().into_client_request()?;
    for (name, value) in metadata.headers() {
        let value = HeaderValue::from_str(&value).map_err(|err| ExecError::InvalidHeader {
            name,
            reason: err.to_string(),
        })?;
        request.headers_mut().insert(name, value);
    }

    let connector = if config.tls_skip_verify && url.scheme() == "wss" {
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|err| ExecError::WebSocket(err.to_string()))?;
        Some(Connector::NativeTls(tls))
    } else {
        None
    };

    tracing::debug!(target: "pier::exec", url = %url, "connecting exec socket");
    let (stream, _) = connect_async_tls_with_config(request, None, false, connector).await?;
    let (mut sink, mut source) = stream.split();

    let state = Arc::new(AtomicU8::new(encode_state(ReadyState::Open)));
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let reader_state = Arc::clone(&state);
    let task = tokio::spawn(async move {
        let writer = tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if sink.send(message).await.is_err() || closing {
                    break;
                }
            }
        });

        let mut trailing = None;
        while let Some(message) = source.next().await {
            match message {
                Ok(Message::Binary(data)) => {
                    if event_tx.send(SocketEvent::Frame(data)).is_err() {
                        break;
                    }
                }
                Ok(Message::Text(text)) => {
                    if event_tx.send(SocketEvent::Frame(text.into_bytes())).is_err() {
                        break;
                    }
                }
                Ok(Message::Close(frame)) => {
                    trailing = frame
                        .map(|frame| frame.reason.as_bytes().to_vec())
                        .filter(|reason| !reason.is_empty());
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(target: "pier::exec", error = %err, "exec socket error");
                    break;
                }
            }
        }

        reader_state.store(encode_state(ReadyState::Closed), Ordering::SeqCst);
        let _ = event_tx.send(SocketEvent::Closed(trailing));
        writer.abort();
    });

    Ok(WsConnection {
        socket: WsExecSocket { state, tx: out_tx },
        events: event_rx,
        task,
    })
}

fn spawn_stdin_reader(tx: mpsc::UnboundedSender<Vec<u8>>) {
    thread::spawn(move || {
        let mut stdin = std::io::stdin();
        let mut buffer = [0u8; STDIN_CHUNK];
        loop {
            match stdin.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buffer[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::warn!(target: "pier::exec", error = %err, "stdin read failed");
                    break;
                }
            }
        }
        tracing::trace!(target: "pier::exec", "stdin reader exited");
    });
}

#[cfg(unix)]
fn spawn_resize_watcher(tx: mpsc::UnboundedSender<pier_proto::WindowSize>) -> Option<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut winch = match signal(SignalKind::window_change()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::debug!(target: "pier::exec", error = %err, "resize signal unavailable");
            return None;
        }
    };
    Some(tokio::spawn(async move {
        while winch.recv().await.is_some() {
            let Some(size) = crate::terminal::window_size() else {
                continue;
            };
            if tx.send(size).is_err() {
                break;
            }
        }
    }))
}

#[cfg(not(unix))]
fn spawn_resize_watcher(_tx: mpsc::UnboundedSender<pier_proto::WindowSize>) -> Option<JoinHandle<()>> {
    None
}

/// Runs an interactive exec against the local terminal until the remote
/// side closes or the user presses Ctrl-]. Returns the remote exit code
/// when one was reported.
pub async fn run_exec(
    config: &Config,
    metadata: &RequestMetadata,
    deployment_id: &str,
    args: Vec<String>,
) -> Result<Option<i32>, ExecError> {
    let WsConnection {
        socket,
        mut events,
        task,
    } = connect(config, metadata).await?;
    let mut session = ExecSession::new(deployment_id, args, socket, StdoutTerminal::new())?;
    session
        .listeners_mut()
        .push(ListenerGuard::new("socket", move || task.abort()));

    // Declared before the raw-mode guard so parked log records are written
    // after the terminal is restored.
    let _logs = telemetry::hold_terminal();
    let _raw = RawModeGuard::new(std::io::stdin().is_terminal());

    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    spawn_stdin_reader(input_tx);

    let (resize_tx, mut resize_rx) = mpsc::unbounded_channel();
    if let Some(watcher) = spawn_resize_watcher(resize_tx) {
        session
            .listeners_mut()
            .push(ListenerGuard::new("resize", move || watcher.abort()));
    }

    session.on_open();

    let mut input_open = true;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SocketEvent::Frame(frame)) => session.on_socket_message(&frame),
                Some(SocketEvent::Closed(trailing)) => {
                    session.on_socket_closed(trailing.as_deref());
                    break;
                }
                None => {
                    session.on_socket_closed(None);
                    break;
                }
            },
            input = input_rx.recv(), if input_open => match input {
                Some(chunk) => match std::str::from_utf8(&chunk) {
                    Ok(text) => session.on_terminal_data(text),
                    Err(_) => session.on_binary_input(&chunk),
                },
                None => {
                    input_open = false;
                    session.on_input_eof();
                }
            },
            Some(size) = resize_rx.recv() => session.on_resize(size),
        }
        if session.detached() {
            break;
        }
    }

    let disposed = session.teardown();
    tracing::debug!(target: "pier::exec", disposed, exit_code = ?session.exit_code(), "exec finished");
    Ok(session.exit_code())
}
