//! The turn cycle shared by every transport.
//!
//! A turn locks its session for its whole duration, so two inputs for the
//! same session never interleave. History only grows when a turn finishes:
//! the user turn first, then the exchange transcript (tool round-trips and
//! the assistant turn) once the reply is complete.

use std::sync::Arc;

use tracing::{debug, info, warn};
use wordtutor_config::GreetingMode;
use wordtutor_core::{History, Message, ReplySink, SessionId};
use wordtutor_memory::{InMemorySessionStore, SessionHandle};

use crate::prompt::render_greeting;
use crate::router::{QuitDetector, Route};
use crate::tutor::{Exchange, TurnError, Tutor};

/// What arrived at the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnInput<'a> {
    /// A new connection; produces the greeting if the session is fresh.
    Start,
    User(&'a str),
}

/// Whether quit keywords end the session on this transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitPolicy {
    Honour,
    /// The input goes to the model like any other text.
    Ignore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A quit keyword was seen. No model call was made.
    Terminated,
    Replied(Exchange),
}

pub struct TurnCycle {
    store: Arc<InMemorySessionStore>,
    tutor: Arc<Tutor>,
    greeting: GreetingMode,
    quit: QuitDetector,
}

impl TurnCycle {
    pub fn new(store: Arc<InMemorySessionStore>, tutor: Arc<Tutor>) -> Self {
        Self {
            store,
            tutor,
            greeting: GreetingMode::default(),
            quit: QuitDetector::default(),
        }
    }

    pub fn with_greeting(mut self, greeting: GreetingMode) -> Self {
        self.greeting = greeting;
        self
    }

    pub fn with_quit_detector(mut self, quit: QuitDetector) -> Self {
        self.quit = quit;
        self
    }

    pub fn store(&self) -> &Arc<InMemorySessionStore> {
        &self.store
    }

    pub fn tutor(&self) -> &Arc<Tutor> {
        &self.tutor
    }

    pub fn default_word(&self) -> &str {
        self.store.default_word()
    }

    /// Fetch or create the session and, when `word` is non-blank, make it the
    /// active word. A session that already has turns keeps its word.
    pub async fn open(&self, id: &SessionId, word: Option<&str>) -> SessionHandle {
        let handle = self.store.get_or_create(id).await;
        if let Some(word) = word.map(str::trim).filter(|w| !w.is_empty()) {
            let mut session = handle.lock().await;
            if session.word() != word && !session.switch_word(word) {
                debug!(session = %id, requested = word, active = session.word(), "Word switch ignored");
            }
        }
        handle
    }

    /// Run one turn for `id`, creating the session on first contact.
    pub async fn run_for(
        &self,
        id: &SessionId,
        input: TurnInput<'_>,
        policy: QuitPolicy,
        sink: &mut dyn ReplySink,
    ) -> Result<Outcome, TurnError> {
        let handle = self.store.get_or_create(id).await;
        self.run(&handle, input, policy, sink).await
    }

    pub async fn run(
        &self,
        handle: &SessionHandle,
        input: TurnInput<'_>,
        policy: QuitPolicy,
        sink: &mut dyn ReplySink,
    ) -> Result<Outcome, TurnError> {
        let mut session = handle.lock().await;
        let word = session.word().to_string();

        let text = match input {
            TurnInput::Start => {
                if !session.history.is_empty() {
                    return Ok(Outcome::Replied(Exchange::default()));
                }
                let exchange = match self.greeting {
                    GreetingMode::Template => {
                        let greeting = render_greeting(&word);
                        sink.chunk(&greeting).await?;
                        sink.finish().await?;
                        Exchange::canned(greeting)
                    }
                    GreetingMode::Model => self.tutor.respond(&word, &[], "", sink).await?,
                };
                commit(&mut session.history, &exchange);
                info!(session = %session.id, word = %word, "Session greeted");
                return Ok(Outcome::Replied(exchange));
            }
            TurnInput::User(text) => text,
        };

        session.history.push(Message::user(text));
        if policy == QuitPolicy::Honour && self.quit.decide(session.history.as_slice()) == Route::Terminate {
            info!(session = %session.id, "Session ended by user");
            return Ok(Outcome::Terminated);
        }

        let turns = session.history.len();
        let prior = &session.history.as_slice()[..turns - 1];
        let result = self.tutor.respond(&word, prior, text, sink).await;
        match result {
            Ok(exchange) => {
                commit(&mut session.history, &exchange);
                Ok(Outcome::Replied(exchange))
            }
            Err(e) => {
                warn!(session = %session.id, error = %e, "Turn failed");
                Err(e)
            }
        }
    }
}

fn commit(history: &mut History, exchange: &Exchange) {
    for turn in &exchange.transcript {
        history.push(turn.clone());
    }
}
