//! Cumulative result record of one turn's pipeline.

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Everything the pipeline has learned about the current turn so far.
///
/// Fields are only ever filled in. Each `record_*` call writes a field at
/// most once; later calls for the same field are ignored, and `is_finished`
/// can move from `false` to `true` but never back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnSnapshot {
    emotion: Option<String>,
    dubious_snippets: Option<Vec<String>>,
    process_note: Option<String>,
    aim: Option<String>,
    question: Option<String>,
    is_finished: bool,
    draft: Option<String>,
}

impl TurnSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emotion(&self) -> Option<&str> {
        self.emotion.as_deref()
    }

    pub fn dubious_snippets(&self) -> &[String] {
        self.dubious_snippets.as_deref().unwrap_or_default()
    }

    pub fn process_note(&self) -> Option<&str> {
        self.process_note.as_deref()
    }

    pub fn aim(&self) -> Option<&str> {
        self.aim.as_deref()
    }

    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn record_emotion(&mut self, label: impl Into<String>) {
        self.emotion.get_or_insert_with(|| label.into());
    }

    pub fn record_dubious(&mut self, snippets: Vec<String>) {
        self.dubious_snippets.get_or_insert(snippets);
    }

    pub fn record_process(&mut self, note: impl Into<String>) {
        self.process_note.get_or_insert_with(|| note.into());
    }

    pub fn record_aim(&mut self, aim: impl Into<String>) {
        self.aim.get_or_insert_with(|| aim.into());
    }

    pub fn record_question(&mut self, question: impl Into<String>) {
        self.question.get_or_insert_with(|| question.into());
    }

    pub fn record_finished(&mut self, finished: bool) {
        self.is_finished |= finished;
    }

    pub fn record_draft(&mut self, draft: impl Into<String>) {
        self.draft.get_or_insert_with(|| draft.into());
    }

    /// True when `self` only adds information on top of `earlier`.
    pub fn extends(&self, earlier: &TurnSnapshot) -> bool {
        fn keeps<T: PartialEq>(now: &Option<T>, before: &Option<T>) -> bool {
            before.is_none() || now == before
        }

        keeps(&self.emotion, &earlier.emotion)
            && keeps(&self.dubious_snippets, &earlier.dubious_snippets)
            && keeps(&self.process_note, &earlier.process_note)
            && keeps(&self.aim, &earlier.aim)
            && keeps(&self.question, &earlier.question)
            && keeps(&self.draft, &earlier.draft)
            && (self.is_finished || !earlier.is_finished)
    }
}

impl Serialize for TurnSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TurnSnapshot", 7)?;
        state.serialize_field("emotion", &self.emotion)?;
        state.serialize_field("dubious", self.dubious_snippets())?;
        state.serialize_field("process", &self.process_note)?;
        state.serialize_field("aim", &self.aim)?;
        state.serialize_field("question", &self.question)?;
        state.serialize_field("is_finished", &self.is_finished)?;
        state.serialize_field("draft", &self.draft)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_write_wins() {
        let mut snapshot = TurnSnapshot::new();
        snapshot.record_emotion("positive");
        snapshot.record_emotion("negative");
        snapshot.record_dubious(vec!["a".into()]);
        snapshot.record_dubious(vec![]);

        assert_eq!(snapshot.emotion(), Some("positive"));
        assert_eq!(snapshot.dubious_snippets(), ["a".to_string()]);
    }

    #[test]
    fn finished_flag_never_resets() {
        let mut snapshot = TurnSnapshot::new();
        snapshot.record_finished(true);
        snapshot.record_finished(false);
        assert!(snapshot.is_finished());
    }

    #[test]
    fn extends_detects_growth_only() {
        let mut earlier = TurnSnapshot::new();
        earlier.record_emotion("neutral");

        let mut later = earlier.clone();
        later.record_aim("Childhood");

        assert!(later.extends(&earlier));
        assert!(!earlier.extends(&later));
        assert!(!TurnSnapshot::new().extends(&earlier));
    }

    #[test]
    fn serializes_with_wire_keys() {
        let mut snapshot = TurnSnapshot::new();
        snapshot.record_emotion("neutral");
        snapshot.record_process("50%");

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            value,
            json!({
                "emotion": "neutral",
                "dubious": [],
                "process": "50%",
                "aim": null,
                "question": null,
                "is_finished": false,
                "draft": null,
            })
        );
    }
}
