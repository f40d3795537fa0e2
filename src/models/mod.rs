//! Domain models for the questionnaire.
//!
//! # Core Concepts
//!
//! - [`Node`]: one entry of the decision tree, parsed once into either a
//!   [`QuestionNode`] or a [`ResultNode`].
//! - [`AnswerEntry`]: one step of the answer history, the session's ground
//!   truth for "how did we get here".
//! - [`SessionState`]: the in-memory session, mirrored to local storage.
//! - [`NavState`]: where the navigator currently is (a question or a result).

mod history;
mod node;
mod session;

pub use history::*;
pub use node::*;
pub use session::*;
