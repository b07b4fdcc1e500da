//! Server-streamed job log consumer.
//!
//! `JobLog` is a synchronous state machine that turns decoded stream events
//! into an append-only list of entries. `JobLogViewer` couples it with at
//! most one live stream and guarantees that events of a previous
//! subscription never reach the new buffer.

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use grpc_web_codec::GrpcStatus;
use pier_proto::GetJobStreamResponse;

use crate::api::{ApiClient, ApiError, GrpcStream, GrpcWebTransport, StreamItem};

pub mod entry;
pub mod event;

pub use entry::{EntryKind, LineStyle, LogEntry};
pub use event::{JobEvent, TerminalEvent};

pub const LOGS_UNAVAILABLE: &str = "Logs are no longer available for this operation";

/// Tags every subscription; events carrying an older tag are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Subscribed,
    Receiving,
    Completed,
    Errored,
    Cancelled,
}

impl StreamState {
    pub fn is_active(self) -> bool {
        matches!(self, StreamState::Subscribed | StreamState::Receiving)
    }

    pub fn is_finished(self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Errored | StreamState::Cancelled
        )
    }
}

#[derive(Debug)]
pub struct JobLog {
    state: StreamState,
    job_id: Option<String>,
    generation: u64,
    entries: Vec<LogEntry>,
    unread: usize,
    following: bool,
}

impl Default for JobLog {
    fn default() -> Self {
        Self {
            state: StreamState::Idle,
            job_id: None,
            generation: 0,
            entries: Vec::new(),
            unread: 0,
            following: true,
        }
    }
}

impl JobLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn generation(&self) -> Generation {
        Generation(self.generation)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn unread(&self) -> usize {
        self.unread
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    /// Starts a fresh subscription, discarding everything buffered so far.
    pub fn subscribe(&mut self, job_id: impl Into<String>) -> Generation {
        let job_id = job_id.into();
        if self.state.is_active() {
            tracing::debug!(
                target: "pier::job_stream",
                previous = ?self.job_id,
                next = %job_id,
                "replacing active subscription"
            );
        }
        self.generation += 1;
        self.job_id = Some(job_id);
        self.entries.clear();
        self.unread = 0;
        self.state = StreamState::Subscribed;
        Generation(self.generation)
    }

    pub fn cancel(&mut self) {
        if self.state.is_active() {
            self.state = StreamState::Cancelled;
        }
        self.generation += 1;
    }

    /// Applies one event and returns the number of entries appended.
    pub fn apply(&mut self, generation: Generation, event: JobEvent) -> usize {
        if !self.accepts(generation) {
            tracing::trace!(target: "pier::job_stream", ?generation, "dropping stale event");
            return 0;
        }
        if self.state == StreamState::Subscribed {
            self.state = StreamState::Receiving;
        }
        let before = self.entries.len();
        match event {
            JobEvent::Terminal { events, .. } => {
                if events.is_empty() {
                    if self.entries.is_empty() {
                        self.push(LogEntry::status(LOGS_UNAVAILABLE));
                    }
                } else {
                    for event in events {
                        self.apply_terminal(event);
                    }
                }
            }
            JobEvent::Complete { error: Some(message) } | JobEvent::Error { message } => {
                self.push(LogEntry::line(message, LineStyle::ErrorBold));
                self.finish(StreamState::Errored);
            }
            JobEvent::Complete { error: None } => self.finish(StreamState::Completed),
            JobEvent::State { previous, current } => {
                tracing::debug!(target: "pier::job_stream", %previous, %current, "job state changed");
            }
            JobEvent::Open | JobEvent::Empty => {}
        }
        self.entries.len() - before
    }

    /// Applies the final call status from the trailers.
    pub fn apply_status(&mut self, generation: Generation, status: &GrpcStatus) -> usize {
        if !self.accepts(generation) {
            return 0;
        }
        let before = self.entries.len();
        if !status.details().is_empty() {
            self.push(LogEntry::status(status.details()));
        }
        if status.is_ok() {
            self.finish(StreamState::Completed);
        } else {
            self.finish(StreamState::Errored);
        }
        self.entries.len() - before
    }

    /// Records a stream failure as a diagnostic entry.
    pub fn record_failure(&mut self, generation: Generation, error: &ApiError) -> usize {
        if !self.accepts(generation) {
            return 0;
        }
        tracing::warn!(target: "pier::job_stream", error = %error, "job stream failure");
        let details = if error.is_recoverable() {
            format!("Failed to decode stream message: {error}")
        } else {
            format!("Job stream failed: {error}")
        };
        self.push(LogEntry::status(details));
        if !error.is_recoverable() {
            self.finish(StreamState::Errored);
        }
        1
    }

    pub fn set_following(&mut self, following: bool) {
        self.following = following;
        if following {
            self.unread = 0;
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.set_following(true);
    }

    fn accepts(&self, generation: Generation) -> bool {
        generation.0 == self.generation
            && !matches!(self.state, StreamState::Idle | StreamState::Cancelled)
    }

    fn finish(&mut self, state: StreamState) {
        if !self.state.is_finished() {
            self.state = state;
        }
    }

    fn apply_terminal(&mut self, event: TerminalEvent) {
        match event {
            TerminalEvent::Line { msg, style } if !msg.is_empty() => {
                self.push(LogEntry::Line { msg, style });
            }
            TerminalEvent::Step {
                id,
                msg,
                status,
                output,
                ..
            } if !msg.is_empty() || !output.is_empty() => {
                self.push(LogEntry::Step {
                    id,
                    msg,
                    status,
                    output: String::from_utf8_lossy(&output).into_owned(),
                });
            }
            TerminalEvent::Raw { data, stderr } if !data.is_empty() => {
                self.push(LogEntry::Raw {
                    text: String::from_utf8_lossy(&data).into_owned(),
                    stderr,
                });
            }
            TerminalEvent::NamedValues(values) => {
                for (name, value) in values {
                    self.push(LogEntry::line(format!("{name}: {value}"), LineStyle::Plain));
                }
            }
            _ => {}
        }
    }

    fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
        if !self.following {
            self.unread += 1;
        }
    }
}

/// Opens job event streams.
#[async_trait]
pub trait JobStreamSource: Send + Sync {
    type Stream: Stream<Item = Result<StreamItem<GetJobStreamResponse>, ApiError>> + Send + Unpin;

    async fn open(&self, job_id: &str) -> Result<Self::Stream, ApiError>;
}

#[async_trait]
impl<T: GrpcWebTransport> JobStreamSource for ApiClient<T> {
    type Stream = GrpcStream<GetJobStreamResponse>;

    async fn open(&self, job_id: &str) -> Result<Self::Stream, ApiError> {
        self.get_job_stream(job_id).await
    }
}

pub struct JobLogViewer<S: JobStreamSource> {
    source: S,
    log: JobLog,
    active: Option<(Generation, S::Stream)>,
}

impl<S: JobStreamSource> JobLogViewer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            log: JobLog::new(),
            active: None,
        }
    }

    pub fn log(&self) -> &JobLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut JobLog {
        &mut self.log
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// Replaces the current subscription. The previous stream is dropped
    /// before the new one is opened.
    pub async fn switch_job(&mut self, job_id: &str) -> Result<Generation, ApiError> {
        self.active = None;
        let generation = self.log.subscribe(job_id);
        match self.source.open(job_id).await {
            Ok(stream) => {
                tracing::debug!(target: "pier::job_stream", job_id, "subscribed");
                self.active = Some((generation, stream));
                Ok(generation)
            }
            Err(err) => {
                self.log.record_failure(generation, &err);
                Err(err)
            }
        }
    }

    pub fn cancel(&mut self) {
        self.active = None;
        self.log.cancel();
    }

    /// Waits for the next stream item and returns the entries it appended.
    /// Returns `None` once the stream has ended or nothing is subscribed.
    pub async fn next(&mut self) -> Option<&[LogEntry]> {
        let (generation, stream) = self.active.as_mut()?;
        let generation = *generation;
        let item = stream.next().await;
        let before = self.log.entries().len();
        match item {
            None => {
                tracing::debug!(target: "pier::job_stream", state = ?self.log.state(), "stream ended");
                self.active = None;
                return None;
            }
            Some(Ok(StreamItem::Message(response))) => {
                self.log.apply(generation, JobEvent::from(response));
            }
            Some(Ok(StreamItem::Status(status))) => {
                self.log.apply_status(generation, &status);
            }
            Some(Err(err)) => {
                self.log.record_failure(generation, &err);
                if !err.is_recoverable() {
                    self.active = None;
                }
            }
        }
        Some(&self.log.entries()[before..])
    }

    /// Drains the stream, handing every appended entry to `on_entry`.
    pub async fn run_to_end<F>(&mut self, mut on_entry: F) -> StreamState
    where
        F: FnMut(&LogEntry),
    {
        while let Some(appended) = self.next().await {
            for entry in appended {
                on_entry(entry);
            }
        }
        self.log.state()
    }
}
