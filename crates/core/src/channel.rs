//! Channel seams.
//!
//! A [`Channel`] yields inbound user lines (the CLI reads stdin). A
//! [`ReplySink`] receives outbound reply text chunk by chunk; every transport
//! provides one so the turn cycle can relay streamed replies without knowing
//! where they go.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;

/// A line of user input received from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Channel name that produced the message
    pub channel: String,

    pub sender_id: String,

    pub content: String,
}

#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start listening. The receiver yields messages until the input ends.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ChannelMessage, ChannelError>>,
        ChannelError,
    >;

    /// Send one complete message to the user.
    async fn send(&self, content: &str) -> std::result::Result<(), ChannelError>;
}

/// Destination for reply text, in arrival order.
#[async_trait]
pub trait ReplySink: Send {
    /// Relay one increment. An error means the peer is gone and the turn
    /// should stop at this chunk boundary.
    async fn chunk(&mut self, text: &str) -> std::result::Result<(), ChannelError>;

    /// Called once after the last chunk of a reply.
    async fn finish(&mut self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }
}

/// Collects a reply into a string. Used by transports that answer with one
/// complete body.
#[derive(Debug, Default)]
pub struct BufferSink {
    pub text: String,
}

#[async_trait]
impl ReplySink for BufferSink {
    async fn chunk(&mut self, text: &str) -> std::result::Result<(), ChannelError> {
        self.text.push_str(text);
        Ok(())
    }
}
