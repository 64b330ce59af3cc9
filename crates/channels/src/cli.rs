//! Terminal channel: user lines from stdin, reply text to stdout.

use async_trait::async_trait;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use wordtutor_core::channel::{Channel, ChannelMessage, ReplySink};
use wordtutor_core::error::ChannelError;

/// Interactive terminal channel for one local user.
pub struct CliChannel {
    sender_id: String,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            sender_id: "local_user".into(),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward trimmed, non-empty lines from `reader` until EOF or until the
/// receiver is dropped.
pub fn spawn_line_reader<R>(reader: R, channel: &str, sender_id: &str) -> mpsc::Receiver<Result<ChannelMessage, ChannelError>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(32);
    let channel = channel.to_string();
    let sender_id = sender_id.to_string();

    tokio::spawn(async move {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let msg = ChannelMessage {
                        channel: channel.clone(),
                        sender_id: sender_id.clone(),
                        content: line.to_string(),
                    };
                    if tx.send(Ok(msg)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF (Ctrl+D)
                Err(e) => {
                    tracing::warn!(error = %e, "Input read failed");
                    let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                    break;
                }
            }
        }
    });

    rx
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        Ok(spawn_line_reader(BufReader::new(io::stdin()), self.name(), &self.sender_id))
    }

    async fn send(&self, content: &str) -> Result<(), ChannelError> {
        println!("{content}");
        Ok(())
    }
}

/// Writes each reply chunk as soon as it arrives; ends a reply with a newline.
///
/// An optional prefix is written before the first chunk of every reply, so
/// nothing is printed for a reply that never starts.
pub struct WriterSink<W> {
    writer: W,
    prefix: Option<String>,
    started: bool,
}

pub type StdoutSink = WriterSink<io::Stdout>;

impl StdoutSink {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            prefix: None,
            started: false,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Write a line outside of any reply.
    pub async fn line(&mut self, text: &str) -> Result<(), ChannelError> {
        self.write(text).await?;
        self.write("\n").await
    }

    /// Write `text` without a newline, e.g. an input prompt.
    pub async fn write(&mut self, text: &str) -> Result<(), ChannelError> {
        self.writer.write_all(text.as_bytes()).await.map_err(write_failed)?;
        self.writer.flush().await.map_err(write_failed)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn write_failed(e: std::io::Error) -> ChannelError {
    ChannelError::DeliveryFailed {
        channel: "cli".into(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ReplySink for WriterSink<W> {
    async fn chunk(&mut self, text: &str) -> Result<(), ChannelError> {
        if !self.started {
            self.started = true;
            if let Some(prefix) = self.prefix.clone() {
                self.write(&prefix).await?;
            }
        }
        self.write(text).await
    }

    async fn finish(&mut self) -> Result<(), ChannelError> {
        self.started = false;
        self.write("\n").await
    }
}
