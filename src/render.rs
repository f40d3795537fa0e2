//! Plain-text rendering for the terminal front-end.

use std::io::Write;

use crate::models::{Answer, AnswerEntry, QuestionNode, ResultPayload};
use crate::navigation::Renderer;
use crate::progress::Progress;

const BAR_WIDTH: usize = 20;
const FILLED: char = '█';
const EMPTY: char = '░';

fn answer_symbol(answer: Answer) -> char {
    match answer {
        Answer::Yes => '✓',
        Answer::No => '✗',
    }
}

/// Render a progress bar with its label.
///
/// Example output: `[██████████░░░░░░░░░░] 3/6`
pub fn render_progress(progress: &Progress) -> String {
    let ratio = (progress.percentage / 100.0).clamp(0.0, 1.0);
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    let mut bar = String::with_capacity(BAR_WIDTH + 16);
    bar.push('[');
    bar.extend(std::iter::repeat(FILLED).take(filled));
    bar.extend(std::iter::repeat(EMPTY).take(BAR_WIDTH - filled));
    bar.push_str("] ");
    bar.push_str(&progress.label);
    bar
}

/// Render the answers that led to a result.
///
/// Example output:
/// ```text
/// Your answers
/// ├── ✓ Is the problem happening right now?
/// └── ✗ Is anyone in immediate danger?
/// ```
pub fn render_journey(journey: &[AnswerEntry]) -> String {
    let mut output = String::from("Your answers\n");
    for (i, entry) in journey.iter().enumerate() {
        let branch = if i == journey.len() - 1 {
            "└── "
        } else {
            "├── "
        };
        output.push_str(branch);
        output.push(answer_symbol(entry.answer));
        output.push(' ');
        output.push_str(&entry.question);
        output.push('\n');
    }
    output
}

/// Writes each state to a terminal (or any writer).
///
/// Write failures are logged and otherwise ignored: a missing display must
/// not affect the session.
pub struct TerminalRenderer<W> {
    out: W,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
        {
            tracing::debug!("Terminal output unavailable: {}", e);
        }
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn show_question(&mut self, question: &QuestionNode, progress: &Progress, can_go_back: bool) {
        let hint = if can_go_back {
            "[y]es / [n]o / [b]ack / [r]estart / [q]uit"
        } else {
            "[y]es / [n]o / [r]estart / [q]uit"
        };
        let text = format!(
            "\n{}\n{}\n{}\n",
            render_progress(progress),
            question.text,
            hint
        );
        self.emit(&text);
    }

    fn show_result(&mut self, result: &ResultPayload, journey: &[AnswerEntry]) {
        let mut text = format!("\n== {} ==\n{}\n\n", result.title, result.content);
        if !journey.is_empty() {
            text.push_str(&render_journey(journey));
        }
        text.push_str("[b]ack / [r]estart / [q]uit\n");
        self.emit(&text);
    }

    fn show_error(&mut self, message: &str) {
        self.emit(&format!("\nError: {}\n", message));
    }
}
