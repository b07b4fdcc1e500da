//! gRPC-Web client stub for the Pier API.

use std::sync::Arc;

use futures_util::StreamExt;
use grpc_web_codec::{GrpcStatus, WireError, encode};
use pier_proto::{Empty, GetJobStreamRequest, GetJobStreamResponse, GetVersionInfoResponse, VersionInfo};
use prost::Message;
use thiserror::Error;

use crate::config::{Config, ConfigError};

pub mod metadata;
pub mod stream;
pub mod transport;

pub use metadata::RequestMetadata;
pub use stream::{GrpcStream, StreamItem};
pub use transport::{GrpcWebTransport, HttpTransport, ResponseBody};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
    #[error("rpc failed: {0}")]
    Status(GrpcStatus),
    #[error("response carried no message")]
    MissingMessage,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        ApiError::Transport(value.to_string())
    }
}

impl ApiError {
    /// Per-message decode failures leave the stream usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ApiError::Wire(_))
    }
}

pub struct ApiClient<T = HttpTransport> {
    transport: Arc<T>,
    metadata: RequestMetadata,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            metadata: self.metadata.clone(),
        }
    }
}

impl ApiClient<HttpTransport> {
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(config.http_base()?, config.tls_skip_verify)?;
        Ok(Self::new(transport, RequestMetadata::new(config.token.clone())))
    }
}

impl<T: GrpcWebTransport> ApiClient<T> {
    pub fn new(transport: T, metadata: RequestMetadata) -> Self {
        Self {
            transport: Arc::new(transport),
            metadata,
        }
    }

    pub fn metadata(&self) -> &RequestMetadata {
        &self.metadata
    }

    pub async fn server_streaming<Req, Resp>(
        &self,
        method: &str,
        request: &Req,
    ) -> Result<GrpcStream<Resp>, ApiError>
    where
        Req: Message,
        Resp: Message + Default,
    {
        tracing::debug!(
            target: "pier::api",
            method,
            authenticated = self.metadata.is_authenticated(),
            "opening call"
        );
        let body = self
            .transport
            .call(method, &self.metadata, encode(request))
            .await?;
        Ok(GrpcStream::new(body))
    }

    /// Runs a call to completion and returns its single response message.
    pub async fn unary<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp, ApiError>
    where
        Req: Message,
        Resp: Message + Default + Unpin,
    {
        let mut stream = self.server_streaming::<Req, Resp>(method, request).await?;
        let mut message = None;
        let mut status = None;
        while let Some(item) = stream.next().await {
            match item? {
                StreamItem::Message(resp) => {
                    if message.is_none() {
                        message = Some(resp);
                    } else {
                        tracing::warn!(target: "pier::api", method, "extra message in unary response");
                    }
                }
                StreamItem::Status(st) => status = Some(st),
            }
        }
        if let Some(status) = status.filter(|status| !status.is_ok()) {
            return Err(ApiError::Status(status));
        }
        message.ok_or(ApiError::MissingMessage)
    }

    pub async fn get_job_stream(
        &self,
        job_id: &str,
    ) -> Result<GrpcStream<GetJobStreamResponse>, ApiError> {
        if job_id.trim().is_empty() {
            return Err(ApiError::InvalidRequest("job id must not be empty".into()));
        }
        let request = GetJobStreamRequest {
            job_id: job_id.to_string(),
        };
        self.server_streaming(pier_proto::GET_JOB_STREAM, &request)
            .await
    }

    pub async fn get_version_info(&self) -> Result<VersionInfo, ApiError> {
        let response: GetVersionInfoResponse = self
            .unary(pier_proto::GET_VERSION_INFO, &Empty {})
            .await?;
        response.info.ok_or(ApiError::MissingMessage)
    }
}
