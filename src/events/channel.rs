//! Streaming adapter
//!
//! Forwards step results over a bounded channel with room for a single
//! event, so the run can never get more than one event ahead of its
//! consumer. A closed receiver surfaces as `RagError::Cancelled`.

use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::{RagError, Result};
use crate::events::{StepResult, StepSink, StreamEvent};

/// Unconsumed events allowed in flight
pub const STREAM_BUFFER: usize = 1;

/// Sink half of the streaming adapter
pub struct ChannelSink {
    sender: mpsc::Sender<StreamEvent>,
}

impl ChannelSink {
    /// Create a connected sink/receiver pair
    pub fn channel() -> (Self, mpsc::Receiver<StreamEvent>) {
        let (sender, receiver) = mpsc::channel(STREAM_BUFFER);
        (Self { sender }, receiver)
    }

    async fn send(&self, event: StreamEvent) -> Result<()> {
        self.sender.send(event).await.map_err(|_| {
            debug!("stream consumer disconnected");
            RagError::Cancelled
        })
    }

    /// Send the end-of-stream marker
    pub async fn finish(self) -> Result<()> {
        self.send(StreamEvent::Done).await
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[async_trait]
impl StepSink for ChannelSink {
    async fn accept(&mut self, step: StepResult) -> Result<()> {
        for event in StreamEvent::from_step(step) {
            self.send(event).await?;
        }
        Ok(())
    }
}

/// Incremental event sequence of one run
///
/// Dropping the stream aborts the producing task.
pub struct EventStream {
    receiver: mpsc::Receiver<StreamEvent>,
    task: Option<JoinHandle<()>>,
}

impl EventStream {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>, task: JoinHandle<()>) -> Self {
        Self {
            receiver,
            task: Some(task),
        }
    }

    /// Next event, or `None` once the run has ended and the buffer is drained
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
