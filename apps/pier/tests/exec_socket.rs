use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use grpc_web_codec::{decode_frame, encode_frame};
use parking_lot::Mutex;
use pier_client_core::api::RequestMetadata;
use pier_client_core::config::Config;
use pier_client_core::exec::ws::{SocketEvent, WsConnection, connect};
use pier_client_core::exec::{ExecSession, ExecSocket, ReadyState, TerminalSink};
use pier_proto::exec::exec_stream_request::Event as Request;
use pier_proto::exec::exec_stream_response::{Event as Response, Exit, Open, Output};
use pier_proto::{ExecStreamRequest, ExecStreamResponse, WindowSize};
use tokio::net::TcpListener;
use tokio::time::timeout;

#[derive(Default)]
struct Backend {
    authorization: Option<String>,
    requests: Vec<Request>,
}

type Shared = Arc<Mutex<Backend>>;

#[derive(Default)]
struct RecordingTerminal {
    output: Vec<u8>,
}

impl RecordingTerminal {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl TerminalSink for RecordingTerminal {
    fn write(&mut self, text: &str) {
        self.output.extend_from_slice(text.as_bytes());
    }

    fn write_bytes(&mut self, data: &[u8]) {
        self.output.extend_from_slice(data);
    }

    fn size(&self) -> Option<WindowSize> {
        Some(WindowSize {
            rows: 30,
            cols: 100,
            width: 0,
            height: 0,
        })
    }
}

fn frame(event: Response) -> Message {
    Message::Binary(encode_frame(&ExecStreamResponse { event: Some(event) }).to_vec())
}

async fn next_request(socket: &mut WebSocket) -> Option<Request> {
    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Binary(data) = message {
            let request: ExecStreamRequest = decode_frame(&data).expect("decode request");
            return request.event;
        }
    }
    None
}

async fn exec_backend(mut socket: WebSocket, backend: Shared) {
    let Some(start) = next_request(&mut socket).await else {
        return;
    };
    backend.lock().requests.push(start);
    socket.send(frame(Response::Open(Open {}))).await.expect("send open");
    socket
        .send(frame(Response::Output(Output {
            channel: 1,
            data: b"$ ".to_vec(),
        })))
        .await
        .expect("send prompt");

    let Some(input) = next_request(&mut socket).await else {
        return;
    };
    backend.lock().requests.push(input);
    socket
        .send(frame(Response::Output(Output {
            channel: 1,
            data: b"README.md\r\n".to_vec(),
        })))
        .await
        .expect("send output");
    socket
        .send(frame(Response::Exit(Exit { code: 7 })))
        .await
        .expect("send exit");
    let _ = socket.send(Message::Close(None)).await;
}

async fn upgrade(
    State(backend): State<Shared>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    backend.lock().authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    ws.on_upgrade(move |socket| exec_backend(socket, backend))
}

async fn start() -> (SocketAddr, Shared) {
    let backend = Shared::default();
    let router = Router::new()
        .route("/v1/exec", get(upgrade))
        .with_state(Arc::clone(&backend));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    (addr, backend)
}

#[tokio::test]
async fn exec_round_trip_over_websocket() {
    let (addr, backend) = start().await;
    let config = Config {
        server_addr: format!("http://{addr}"),
        ..Config::default()
    };
    let metadata = RequestMetadata::new(Some("exec-token".into()));

    let WsConnection {
        socket,
        mut events,
        task,
    } = connect(&config, &metadata).await.expect("connect");
    assert_eq!(socket.ready_state(), ReadyState::Open);

    let mut session = ExecSession::new(
        "dep-1",
        vec!["sh".into()],
        socket,
        RecordingTerminal::default(),
    )
    .expect("session");
    session.listeners_mut().register("socket", move || task.abort());
    session.on_open();

    let mut typed = false;
    let finished = timeout(Duration::from_secs(5), async {
        while let Some(event) = events.recv().await {
            match event {
                SocketEvent::Frame(frame) => {
                    session.on_socket_message(&frame);
                    if !typed && session.terminal().text().ends_with("$ ") {
                        typed = true;
                        for key in ["l", "s", "\r"] {
                            session.on_terminal_data(key);
                        }
                    }
                }
                SocketEvent::Closed(trailing) => {
                    session.on_socket_closed(trailing.as_deref());
                    break;
                }
            }
        }
    })
    .await;
    assert!(finished.is_ok(), "exec did not finish in time");

    assert_eq!(session.exit_code(), Some(7));
    assert_eq!(session.teardown(), 1);
    assert_eq!(session.teardown(), 0);

    let text = session.terminal().text();
    assert!(text.contains("README.md"));
    assert!(text.contains("Process exited with code 7"));
    assert_eq!(text.matches("Connection closed").count(), 1);

    let backend = backend.lock();
    assert_eq!(backend.authorization.as_deref(), Some("Bearer exec-token"));
    assert_eq!(backend.requests.len(), 2);
    let Request::Start(start) = &backend.requests[0] else {
        panic!("expected start, got {:?}", backend.requests[0]);
    };
    assert_eq!(start.deployment_id, "dep-1");
    assert_eq!(start.args, vec!["sh".to_string()]);
    assert_eq!(
        start.pty.as_ref().and_then(|pty| pty.window_size).map(|size| size.cols),
        Some(100)
    );
    match &backend.requests[1] {
        Request::Input(input) => assert_eq!(input.data, b"ls\n".to_vec()),
        other => panic!("expected input, got {other:?}"),
    }
}
