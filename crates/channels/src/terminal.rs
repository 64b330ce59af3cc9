//! The interactive terminal session: greeting, prompt, reply, repeat.

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use wordtutor_agent::{Outcome, QuitPolicy, TurnCycle, TurnError, TurnInput};
use wordtutor_core::channel::ChannelMessage;
use wordtutor_core::error::ChannelError;
use wordtutor_core::SessionId;

use crate::cli::WriterSink;

pub const USER_PROMPT: &str = "你：";
pub const ASSISTANT_PREFIX: &str = "助手：";
pub const SESSION_ENDED: &str = "结束会话。";

/// Why a terminal session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed a quit keyword.
    Quit,
    /// Input ran out (Ctrl+D or a closed pipe).
    EndOfInput,
}

/// Run one session over `input` lines, writing prompts and replies to `out`.
///
/// Model errors are printed and the session continues; the failed user turn
/// stays in history. Output errors end the session.
pub async fn run_terminal<W>(
    cycle: &TurnCycle,
    id: &SessionId,
    word: &str,
    mut input: mpsc::Receiver<Result<ChannelMessage, ChannelError>>,
    out: &mut WriterSink<W>,
) -> Result<SessionEnd, TurnError>
where
    W: AsyncWrite + Unpin + Send,
{
    let handle = cycle.open(id, Some(word)).await;
    cycle.run(&handle, TurnInput::Start, QuitPolicy::Honour, out).await?;

    loop {
        out.write(USER_PROMPT).await?;
        let line = match input.recv().await {
            Some(Ok(msg)) => msg.content,
            Some(Err(e)) => {
                warn!(error = %e, "Terminal input failed");
                return Ok(SessionEnd::EndOfInput);
            }
            None => {
                out.line("").await?;
                return Ok(SessionEnd::EndOfInput);
            }
        };

        match cycle.run(&handle, TurnInput::User(&line), QuitPolicy::Honour, out).await {
            Ok(Outcome::Replied(exchange)) => {
                debug!(chars = exchange.text.chars().count(), "Terminal reply done");
            }
            Ok(Outcome::Terminated) => {
                out.line(SESSION_ENDED).await?;
                return Ok(SessionEnd::Quit);
            }
            Err(TurnError::Provider(e)) => {
                out.line("").await?;
                out.line(&format!("[错误] {e}")).await?;
            }
            Err(e) => return Err(e),
        }
    }
}
