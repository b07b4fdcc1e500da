use std::fmt;

use percent_encoding::percent_decode_str;

use crate::WireError;

const STATUS_KEY: &str = "grpc-status";
const MESSAGE_KEY: &str = "grpc-message";

/// Canonical gRPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrpcCode {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
    /// A code outside the canonical range, kept verbatim.
    Other(i32),
}

impl GrpcCode {
    pub fn from_i32(code: i32) -> Self {
        match code {
            0 => GrpcCode::Ok,
            1 => GrpcCode::Cancelled,
            2 => GrpcCode::Unknown,
            3 => GrpcCode::InvalidArgument,
            4 => GrpcCode::DeadlineExceeded,
            5 => GrpcCode::NotFound,
            6 => GrpcCode::AlreadyExists,
            7 => GrpcCode::PermissionDenied,
            8 => GrpcCode::ResourceExhausted,
            9 => GrpcCode::FailedPrecondition,
            10 => GrpcCode::Aborted,
            11 => GrpcCode::OutOfRange,
            12 => GrpcCode::Unimplemented,
            13 => GrpcCode::Internal,
            14 => GrpcCode::Unavailable,
            15 => GrpcCode::DataLoss,
            16 => GrpcCode::Unauthenticated,
            other => GrpcCode::Other(other),
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            GrpcCode::Ok => 0,
            GrpcCode::Cancelled => 1,
            GrpcCode::Unknown => 2,
            GrpcCode::InvalidArgument => 3,
            GrpcCode::DeadlineExceeded => 4,
            GrpcCode::NotFound => 5,
            GrpcCode::AlreadyExists => 6,
            GrpcCode::PermissionDenied => 7,
            GrpcCode::ResourceExhausted => 8,
            GrpcCode::FailedPrecondition => 9,
            GrpcCode::Aborted => 10,
            GrpcCode::OutOfRange => 11,
            GrpcCode::Unimplemented => 12,
            GrpcCode::Internal => 13,
            GrpcCode::Unavailable => 14,
            GrpcCode::DataLoss => 15,
            GrpcCode::Unauthenticated => 16,
            GrpcCode::Other(code) => code,
        }
    }
}

impl fmt::Display for GrpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrpcCode::Other(code) => write!(f, "code {code}"),
            known => write!(f, "{known:?}"),
        }
    }
}

/// Call outcome reported in the trailers frame (or trailers-only headers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcStatus {
    pub code: GrpcCode,
    pub message: String,
    pub metadata: Vec<(String, String)>,
}

impl GrpcStatus {
    pub fn new(code: GrpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            metadata: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(GrpcCode::Ok, "")
    }

    pub fn is_ok(&self) -> bool {
        self.code == GrpcCode::Ok
    }

    /// Human-readable details text, empty when the server sent none.
    pub fn details(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for GrpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

/// Parses the HTTP/1 style header block carried by a trailers frame.
pub fn parse_trailers(payload: &[u8]) -> Result<GrpcStatus, WireError> {
    let text = String::from_utf8_lossy(payload);
    let pairs = text
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split_once(':')
                .map(|(key, value)| (key.trim(), value.trim()))
                .ok_or(WireError::InvalidTrailers("header line without ':'"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let (code, message, metadata) = split_pairs(pairs)?;
    Ok(GrpcStatus {
        code: code.unwrap_or(GrpcCode::Unknown),
        message,
        metadata,
    })
}

/// Extracts a status from response headers, for trailers-only responses.
pub fn status_from_headers<'a, I>(headers: I) -> Result<Option<GrpcStatus>, WireError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let (code, message, metadata) = split_pairs(headers)?;
    Ok(code.map(|code| GrpcStatus {
        code,
        message,
        metadata,
    }))
}

type SplitStatus = (Option<GrpcCode>, String, Vec<(String, String)>);

fn split_pairs<'a, I>(pairs: I) -> Result<SplitStatus, WireError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut code = None;
    let mut message = String::new();
    let mut metadata = Vec::new();
    for (key, value) in pairs {
        let key = key.to_ascii_lowercase();
        match key.as_str() {
            STATUS_KEY => {
                let parsed = value
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| WireError::InvalidTrailers("non-numeric grpc-status"))?;
                code = Some(GrpcCode::from_i32(parsed));
            }
            MESSAGE_KEY => {
                message = percent_decode_str(value.trim())
                    .decode_utf8_lossy()
                    .into_owned();
            }
            _ => metadata.push((key, value.to_string())),
        }
    }
    Ok((code, message, metadata))
}
