//! The tutoring turn cycle.
//!
//! Every transport drives the same loop:
//!
//! 1. **Receive** a user line (or a session start) for a session id
//! 2. **Route**: a quit keyword ends the session without a model call
//! 3. **Assemble** the word-scoped instructions plus the stored history
//! 4. **Call** the model, running any requested word tools in between
//! 5. **Relay** the reply chunk by chunk and store the finished turn

pub mod prompt;
pub mod retrieval;
pub mod router;
pub mod runtime;
pub mod turn;
pub mod tutor;

#[cfg(test)]
mod testing;

pub use prompt::{PlaceholderFilter, PromptAssembler, PromptPayload, fill_placeholder, render_greeting};
pub use retrieval::RetrievalHelper;
pub use router::{QUIT_KEYWORDS, QuitDetector, Route};
pub use runtime::{RuntimeError, build_cycle};
pub use turn::{Outcome, QuitPolicy, TurnCycle, TurnInput};
pub use tutor::{Exchange, Reply, TurnError, Tutor};
