//! Fragment Stream
//!
//! Turns the event channel fed by `LlmProvider::stream_message` into a lazy
//! stream of answer-text fragments. Thinking and usage events are dropped;
//! the stream finishes on `Complete` and yields at most one error.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use sentilens_core::streaming::UnifiedStreamEvent;

/// Failure reported while a fragment stream is being consumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamError {
    pub message: String,
    pub code: Option<String>,
}

impl StreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for StreamError {}

/// Ordered, finite stream of answer-text fragments.
///
/// Not restartable. Dropping it before the end stops delivery; the producer
/// notices the closed channel and its sends become no-ops.
pub struct FragmentStream {
    inner: ReceiverStream<UnifiedStreamEvent>,
    /// A fragment read ahead of time (see `prime`).
    pending: Option<String>,
    finished: bool,
}

impl FragmentStream {
    pub fn new(rx: mpsc::Receiver<UnifiedStreamEvent>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            pending: None,
            finished: false,
        }
    }

    /// Build a stream over a fixed list of fragments. Used by test doubles.
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments: Vec<String> = fragments.into_iter().map(Into::into).collect();
        let (tx, rx) = mpsc::channel(fragments.len() + 1);
        for content in fragments {
            let _ = tx.try_send(UnifiedStreamEvent::TextDelta { content });
        }
        let _ = tx.try_send(UnifiedStreamEvent::Complete { stop_reason: None });
        Self::new(rx)
    }

    /// Wait until the stream has either produced its first fragment, finished
    /// cleanly, or failed.
    ///
    /// A failure seen here is returned as `Err` so callers can tell a failed
    /// request apart from a stream that broke after content began. A fragment
    /// read here is held and yielded first by the stream.
    pub async fn prime(&mut self) -> Result<(), StreamError> {
        use futures_util::StreamExt;

        if self.pending.is_some() || self.finished {
            return Ok(());
        }

        loop {
            let Some(event) = self.inner.next().await else {
                self.finished = true;
                return Err(closed_early());
            };
            self.finished = event.is_terminal();
            match event {
                UnifiedStreamEvent::TextDelta { content } if !content.is_empty() => {
                    self.pending = Some(content);
                    return Ok(());
                }
                UnifiedStreamEvent::Error { message, code } => {
                    return Err(StreamError { message, code });
                }
                _ if self.finished => return Ok(()),
                _ => continue,
            }
        }
    }
}

fn closed_early() -> StreamError {
    StreamError::new("stream closed before completion")
}

impl Stream for FragmentStream {
    type Item = Result<String, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(fragment) = self.pending.take() {
            return Poll::Ready(Some(Ok(fragment)));
        }
        if self.finished {
            return Poll::Ready(None);
        }

        loop {
            let event = match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(event)) => event,
                Poll::Ready(None) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(closed_early())));
                }
            };
            self.finished = event.is_terminal();
            match event {
                UnifiedStreamEvent::TextDelta { content } if !content.is_empty() => {
                    return Poll::Ready(Some(Ok(content)));
                }
                UnifiedStreamEvent::Error { message, code } => {
                    return Poll::Ready(Some(Err(StreamError { message, code })));
                }
                // Complete ends the stream; anything else carries no text.
                _ if self.finished => return Poll::Ready(None),
                _ => continue,
            }
        }
    }
}
