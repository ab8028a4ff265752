//! Linear transcript rendering for a session's turns.
//!
//! The dialogue advisor and the summarizer consume the interview as plain
//! text. The format is a sequence of `key: value` lines per turn, closed
//! turns separated by a blank line, with the open turn rendered last and its
//! `answer: ` line left dangling so the caller can append the new answer.

use crate::domain::foundation::TurnId;

use super::Turn;

/// Emotion label rendered for closed turns that were never classified.
pub const DEFAULT_EMOTION: &str = "neutral";

/// Rendered history of a session plus the id of the turn awaiting an answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterviewContext {
    text: String,
    open_turn_id: Option<TurnId>,
}

impl InterviewContext {
    /// The soft-failure value: no text, no open turn.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Renders the turns, which must already be in creation order.
    ///
    /// Every turn except the last is rendered in full. The last turn is
    /// treated as the open one regardless of whether its answer is stored;
    /// the reconciler rejects a commit against an answered turn.
    pub fn from_turns(turns: &[Turn]) -> Self {
        let Some((last, closed)) = turns.split_last() else {
            return Self::empty();
        };

        let mut text = String::new();
        for turn in closed {
            push_closed_turn(&mut text, turn);
        }
        text.push_str("aim: ");
        text.push_str(last.aim().unwrap_or_default());
        text.push_str("\nquestion: ");
        text.push_str(last.question().unwrap_or_default());
        text.push_str("\nanswer: ");

        Self {
            text,
            open_turn_id: Some(*last.id()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn open_turn_id(&self) -> Option<TurnId> {
        self.open_turn_id
    }

    /// True when the session had no turns to render.
    pub fn is_empty(&self) -> bool {
        self.open_turn_id.is_none()
    }

    /// The context with the user's new answer appended to the dangling
    /// `answer: ` line.
    pub fn with_answer(&self, answer: &str) -> String {
        let mut text = String::with_capacity(self.text.len() + answer.len() + 1);
        text.push_str(&self.text);
        text.push_str(answer);
        text.push('\n');
        text
    }
}

fn push_closed_turn(text: &mut String, turn: &Turn) {
    text.push_str("aim: ");
    text.push_str(turn.aim().unwrap_or_default());
    text.push_str("\nquestion: ");
    text.push_str(turn.question().unwrap_or_default());
    text.push_str("\nanswer: ");
    text.push_str(turn.answer().unwrap_or_default());
    text.push_str("\nemotion: ");
    text.push_str(turn.emotion().unwrap_or(DEFAULT_EMOTION));
    text.push_str("\nprogress: ");
    text.push_str(turn.progress_note().unwrap_or_default());
    text.push_str("\n\n");
}

/// Human-readable transcript used when resuming an interview from the
/// console. Open turns show the pending question only.
pub fn render_transcript(turns: &[Turn]) -> String {
    let mut out = String::new();
    for (index, turn) in turns.iter().enumerate() {
        out.push_str(&format!(
            "[{}] {}\nQ: {}\n",
            index + 1,
            turn.aim().unwrap_or_default(),
            turn.question().unwrap_or_default()
        ));
        match turn.answer() {
            Some(answer) => {
                out.push_str(&format!("A: {}\n", answer));
                if let Some(emotion) = turn.emotion() {
                    out.push_str(&format!("   ({})\n", emotion));
                }
            }
            None => out.push_str("A: <awaiting answer>\n"),
        }
        out.push('\n');
    }
    out
}
