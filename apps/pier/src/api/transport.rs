use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use grpc_web_codec::{CONTENT_TYPE_TEXT, GrpcStatus, status_from_headers};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use super::{ApiError, RequestMetadata};

const USER_AGENT: &str = concat!("pier/", env!("CARGO_PKG_VERSION"));

pub type ChunkStream = BoxStream<'static, Result<Bytes, ApiError>>;

/// Raw response of a gRPC-Web call, before frame decoding.
pub struct ResponseBody {
    /// Status from a trailers-only response, if the server sent one.
    pub header_status: Option<GrpcStatus>,
    pub chunks: ChunkStream,
}

#[async_trait]
pub trait GrpcWebTransport: Send + Sync {
    /// Issues one call; `body` is the base64 text-mode request frame.
    async fn call(
        &self,
        method: &str,
        metadata: &RequestMetadata,
        body: String,
    ) -> Result<ResponseBody, ApiError>;
}

/// gRPC-Web text mode over HTTP/1.1 via reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(mut base: Url, tls_skip_verify: bool) -> Result<Self, ApiError> {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(tls_skip_verify)
            .build()?;
        Ok(Self { http, base })
    }

    pub fn endpoint(&self, method: &str) -> Result<Url, ApiError> {
        self.base
            .join(method.trim_start_matches('/'))
            .map_err(|err| ApiError::InvalidRequest(format!("bad method path {method}: {err}")))
    }
}

#[async_trait]
impl GrpcWebTransport for HttpTransport {
    async fn call(
        &self,
        method: &str,
        metadata: &RequestMetadata,
        body: String,
    ) -> Result<ResponseBody, ApiError> {
        let url = self.endpoint(method)?;
        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, CONTENT_TYPE_TEXT)
            .header(ACCEPT, CONTENT_TYPE_TEXT)
            .header("x-grpc-web", "1")
            .header("x-user-agent", USER_AGENT)
            .body(body);
        for (name, value) in metadata.headers() {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let header_status = status_from_headers(
            response
                .headers()
                .iter()
                .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
        )?;
        tracing::trace!(
            target: "pier::api",
            method,
            trailers_only = header_status.is_some(),
            "response headers received"
        );

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ApiError::from))
            .boxed();
        Ok(ResponseBody {
            header_status,
            chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_method_under_base_path() {
        let transport =
            HttpTransport::new(Url::parse("https://pier.example.com/grpc").unwrap(), false)
                .unwrap();
        assert_eq!(
            transport.endpoint(pier_proto::GET_JOB_STREAM).unwrap().as_str(),
            "https://pier.example.com/grpc/pier.v1.Pier/GetJobStream"
        );

        let root = HttpTransport::new(Url::parse("http://127.0.0.1:9702").unwrap(), false)
            .unwrap();
        assert_eq!(
            root.endpoint("/pier.v1.Pier/GetVersionInfo").unwrap().as_str(),
            "http://127.0.0.1:9702/pier.v1.Pier/GetVersionInfo"
        );
    }
}
