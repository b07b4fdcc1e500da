use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::{Buf, Bytes, BytesMut};

use crate::{ENVELOPE_LEN, FLAG_COMPRESSED, FLAG_TRAILERS, WireError, read_length};

/// Upper bound for a single frame payload.
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Data,
    Trailers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

/// Incremental decoder for a gRPC-Web response body.
///
/// Chunk boundaries are arbitrary: a chunk may end in the middle of a base64
/// quad or in the middle of an envelope. Servers encode each write
/// separately, so the text stream is a concatenation of independently padded
/// base64 segments.
#[derive(Debug)]
pub struct FrameDecoder {
    text: Vec<u8>,
    bytes: BytesMut,
    max_frame_len: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_frame_len(MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            text: Vec::new(),
            bytes: BytesMut::new(),
            max_frame_len,
        }
    }

    /// Feeds a chunk of `application/grpc-web-text` body.
    pub fn push_text(&mut self, chunk: &[u8]) -> Vec<Result<Frame, WireError>> {
        self.text
            .extend(chunk.iter().copied().filter(|b| !b.is_ascii_whitespace()));

        let mut out = Vec::new();
        let complete = self.text.len() / 4 * 4;
        if complete > 0 {
            let ready: Vec<u8> = self.text.drain(..complete).collect();
            for segment in padded_segments(&ready) {
                match STANDARD.decode(segment) {
                    Ok(decoded) => self.bytes.extend_from_slice(&decoded),
                    Err(err) => {
                        tracing::debug!(
                            target: "grpc_web::decoder",
                            error = %err,
                            segment_len = segment.len(),
                            discarded = self.bytes.len(),
                            "dropping undecodable base64 segment"
                        );
                        // A partial envelope cannot be completed past a lost segment.
                        self.bytes.clear();
                        out.push(Err(WireError::Base64(err.to_string())));
                    }
                }
            }
        }
        self.drain_frames(&mut out);
        out
    }

    /// Feeds a chunk of binary (`application/grpc-web`) body.
    pub fn push_binary(&mut self, chunk: &[u8]) -> Vec<Result<Frame, WireError>> {
        self.bytes.extend_from_slice(chunk);
        let mut out = Vec::new();
        self.drain_frames(&mut out);
        out
    }

    /// Number of buffered bytes and base64 characters not yet emitted.
    pub fn pending(&self) -> usize {
        self.text.len() + self.bytes.len()
    }

    /// Consumes the decoder, reporting a partial frame left in the buffer.
    pub fn finish(self) -> Result<(), WireError> {
        match self.pending() {
            0 => Ok(()),
            remaining => Err(WireError::Truncated { remaining }),
        }
    }

    fn drain_frames(&mut self, out: &mut Vec<Result<Frame, WireError>>) {
        while self.bytes.len() >= ENVELOPE_LEN {
            let flag = self.bytes[0];
            let len = read_length(&self.bytes);
            if len > self.max_frame_len {
                // The stream cannot be resynchronised past a bad length.
                self.bytes.clear();
                out.push(Err(WireError::FrameTooLarge {
                    len,
                    max: self.max_frame_len,
                }));
                return;
            }
            if self.bytes.len() < ENVELOPE_LEN + len {
                return;
            }
            self.bytes.advance(ENVELOPE_LEN);
            let payload = self.bytes.split_to(len).freeze();
            if flag & FLAG_COMPRESSED != 0 {
                out.push(Err(WireError::Compressed));
                continue;
            }
            let kind = if flag & FLAG_TRAILERS != 0 {
                FrameKind::Trailers
            } else {
                FrameKind::Data
            };
            out.push(Ok(Frame { kind, payload }));
        }
    }
}

/// Splits whole base64 quads into segments that each end at padding.
fn padded_segments(text: &[u8]) -> Vec<&[u8]> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (index, quad) in text.chunks(4).enumerate() {
        if quad.contains(&b'=') {
            let end = (index + 1) * 4;
            segments.push(&text[start..end]);
            start = end;
        }
    }
    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}
