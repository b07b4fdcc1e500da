//! Protobuf bindings for the Pier API surface consumed by the client.
//! The canonical schema lives with the server; these structs mirror the
//! subset of `pier.v1` the job log viewer and exec terminal speak, kept in
//! a dedicated crate so the codec can be tested without the client runtime.

pub mod exec;
pub mod job;
pub mod version;

pub use exec::{ExecStreamRequest, ExecStreamResponse, Pty, WindowSize};
pub use job::{GetJobStreamRequest, GetJobStreamResponse, RpcStatus, TerminalEvent};
pub use version::{Empty, GetVersionInfoResponse, ProtocolVersion, VersionInfo};

/// Server-streaming job event feed.
pub const GET_JOB_STREAM: &str = "pier.v1.Pier/GetJobStream";
/// Unary server version probe.
pub const GET_VERSION_INFO: &str = "pier.v1.Pier/GetVersionInfo";
