use crate::models::{AnswerEntry, QuestionNode, ResultPayload};
use crate::progress::Progress;

/// Display effects of entering a navigation state.
///
/// Every method defaults to doing nothing, so an adapter only implements the
/// surfaces it actually has. Navigation never checks whether a display
/// exists.
pub trait Renderer {
    fn show_question(&mut self, _question: &QuestionNode, _progress: &Progress, _can_go_back: bool) {
    }

    fn show_result(&mut self, _result: &ResultPayload, _journey: &[AnswerEntry]) {}

    fn show_error(&mut self, _message: &str) {}
}

/// Renders nothing. Used when the session is driven headlessly (HTTP, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {}
