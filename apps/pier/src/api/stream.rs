use std::collections::VecDeque;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use grpc_web_codec::{Frame, FrameDecoder, FrameKind, GrpcStatus, WireError, decode_message, parse_trailers};
use prost::Message;

use super::ApiError;
use super::transport::{ChunkStream, ResponseBody};

/// One decoded item of a server stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem<M> {
    Message(M),
    /// Final call status from the trailers.
    Status(GrpcStatus),
}

/// Decoded view over a gRPC-Web response body.
///
/// Yields `Err(ApiError::Wire)` for a single undecodable frame and keeps
/// going; a transport error is yielded once and ends the stream. Dropping
/// the stream drops the HTTP body, which cancels the call.
pub struct GrpcStream<M> {
    chunks: Option<ChunkStream>,
    decoder: FrameDecoder,
    pending: VecDeque<Result<StreamItem<M>, ApiError>>,
    _message: PhantomData<fn() -> M>,
}

impl<M: Message + Default> GrpcStream<M> {
    pub fn new(body: ResponseBody) -> Self {
        let mut pending = VecDeque::new();
        if let Some(status) = body.header_status {
            pending.push_back(Ok(StreamItem::Status(status)));
        }
        Self {
            chunks: Some(body.chunks),
            decoder: FrameDecoder::new(),
            pending,
            _message: PhantomData,
        }
    }

    fn enqueue(&mut self, frame: Result<Frame, WireError>) {
        let item = frame.and_then(|frame| match frame.kind {
            FrameKind::Data => decode_message::<M>(&frame.payload).map(StreamItem::Message),
            FrameKind::Trailers => parse_trailers(&frame.payload).map(StreamItem::Status),
        });
        self.pending.push_back(item.map_err(ApiError::from));
    }

    fn end_of_body(&mut self) {
        self.chunks = None;
        let decoder = std::mem::take(&mut self.decoder);
        if let Err(err) = decoder.finish() {
            self.pending.push_back(Err(ApiError::Wire(err)));
        }
    }
}

impl<M: Message + Default + Unpin> Stream for GrpcStream<M> {
    type Item = Result<StreamItem<M>, ApiError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(item) = this.pending.pop_front() {
                return Poll::Ready(Some(item));
            }
            let Some(chunks) = this.chunks.as_mut() else {
                return Poll::Ready(None);
            };
            match chunks.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(bytes))) => {
                    for frame in this.decoder.push_text(&bytes) {
                        this.enqueue(frame);
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    this.chunks = None;
                    this.pending.push_back(Err(err));
                }
                Poll::Ready(None) => this.end_of_body(),
            }
        }
    }
}
