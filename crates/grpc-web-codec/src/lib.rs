//! gRPC-Web envelope codec.
//!
//! Every message on the wire is wrapped in a five byte envelope: one flag
//! byte followed by the payload length as a big-endian `u32`. Text mode
//! (`application/grpc-web-text`) additionally base64-encodes the envelope,
//! while the exec WebSocket carries the raw envelope as a binary message.

mod decoder;
mod status;

pub use decoder::{Frame, FrameDecoder, FrameKind, MAX_FRAME_LEN};
pub use status::{parse_trailers, status_from_headers, GrpcCode, GrpcStatus};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::{BufMut, Bytes, BytesMut};
use prost::Message;

pub const ENVELOPE_LEN: usize = 5;

pub const FLAG_DATA: u8 = 0x00;
pub const FLAG_COMPRESSED: u8 = 0x01;
pub const FLAG_TRAILERS: u8 = 0x80;

pub const CONTENT_TYPE_TEXT: &str = "application/grpc-web-text";

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("invalid base64: {0}")]
    Base64(String),
    #[error("envelope shorter than {ENVELOPE_LEN} bytes")]
    ShortEnvelope,
    #[error("length prefix {declared} does not match {actual} payload bytes")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("compressed frames are not supported")]
    Compressed,
    #[error("expected a data frame, found trailers")]
    UnexpectedTrailers,
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },
    #[error("stream ended with {remaining} undecoded bytes")]
    Truncated { remaining: usize },
    #[error("protobuf decode failed: {0}")]
    Protobuf(String),
    #[error("invalid trailers: {0}")]
    InvalidTrailers(&'static str),
}

/// Wraps `payload` in a gRPC-Web envelope.
pub fn encode_envelope(flag: u8, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(ENVELOPE_LEN + payload.len());
    buf.put_u8(flag);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// Serializes `message` as a binary data frame.
pub fn encode_frame<M: Message>(message: &M) -> Bytes {
    encode_envelope(FLAG_DATA, &message.encode_to_vec())
}

/// Serializes `message` as a base64 data frame for text-mode transport.
pub fn encode<M: Message>(message: &M) -> String {
    STANDARD.encode(encode_frame(message))
}

/// Decodes exactly one binary data frame into `M`.
///
/// The length prefix must account for every remaining byte; anything else
/// means the frame was cut or concatenated and is rejected.
pub fn decode_frame<M: Message + Default>(bytes: &[u8]) -> Result<M, WireError> {
    if bytes.len() < ENVELOPE_LEN {
        return Err(WireError::ShortEnvelope);
    }
    let flag = bytes[0];
    if flag & FLAG_COMPRESSED != 0 {
        return Err(WireError::Compressed);
    }
    if flag & FLAG_TRAILERS != 0 {
        return Err(WireError::UnexpectedTrailers);
    }
    let declared = read_length(bytes);
    let payload = &bytes[ENVELOPE_LEN..];
    if declared != payload.len() {
        return Err(WireError::LengthMismatch {
            declared,
            actual: payload.len(),
        });
    }
    decode_message(payload)
}

/// Decodes one base64 text-mode data frame into `M`.
pub fn decode<M: Message + Default>(text: &str) -> Result<M, WireError> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|err| WireError::Base64(err.to_string()))?;
    decode_frame(&bytes)
}

/// Decodes a bare protobuf payload (envelope already stripped).
pub fn decode_message<M: Message + Default>(payload: &[u8]) -> Result<M, WireError> {
    M::decode(payload).map_err(|err| WireError::Protobuf(err.to_string()))
}

fn read_length(bytes: &[u8]) -> usize {
    u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize
}
