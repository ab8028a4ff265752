//! Lifecycle of one turn through the capability pipeline.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of the turn pipeline.
///
/// ```text
/// AwaitingAnswer -> EvaluatingEmotion -> CheckingFacts -> AdvisingNextStep
///     -> Summarizing -> Closed
///     -> NextQuestionReady -> Closed
/// ```
///
/// `Failed` is reachable from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    AwaitingAnswer,
    EvaluatingEmotion,
    CheckingFacts,
    AdvisingNextStep,
    Summarizing,
    NextQuestionReady,
    Closed,
    Failed,
}

impl TurnStage {
    /// The external capability invoked while in this stage, if any.
    pub fn capability(&self) -> Option<CapabilityKind> {
        match self {
            TurnStage::EvaluatingEmotion => Some(CapabilityKind::EmotionClassifier),
            TurnStage::CheckingFacts => Some(CapabilityKind::FactChecker),
            TurnStage::AdvisingNextStep => Some(CapabilityKind::DialogueAdvisor),
            TurnStage::Summarizing => Some(CapabilityKind::Summarizer),
            _ => None,
        }
    }
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnStage::AwaitingAnswer => "awaiting_answer",
            TurnStage::EvaluatingEmotion => "evaluating_emotion",
            TurnStage::CheckingFacts => "checking_facts",
            TurnStage::AdvisingNextStep => "advising_next_step",
            TurnStage::Summarizing => "summarizing",
            TurnStage::NextQuestionReady => "next_question_ready",
            TurnStage::Closed => "closed",
            TurnStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl StateMachine for TurnStage {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TurnStage::*;
        match self {
            AwaitingAnswer => vec![EvaluatingEmotion, Failed],
            EvaluatingEmotion => vec![CheckingFacts, Failed],
            CheckingFacts => vec![AdvisingNextStep, Failed],
            AdvisingNextStep => vec![Summarizing, NextQuestionReady, Failed],
            Summarizing => vec![Closed, Failed],
            NextQuestionReady => vec![Closed, Failed],
            Closed => vec![],
            Failed => vec![],
        }
    }
}

/// The four external capabilities a turn depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    EmotionClassifier,
    FactChecker,
    DialogueAdvisor,
    Summarizer,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CapabilityKind::EmotionClassifier => "emotion classification",
            CapabilityKind::FactChecker => "fact check",
            CapabilityKind::DialogueAdvisor => "dialogue advice",
            CapabilityKind::Summarizer => "summarization",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TurnStage; 8] = [
        TurnStage::AwaitingAnswer,
        TurnStage::EvaluatingEmotion,
        TurnStage::CheckingFacts,
        TurnStage::AdvisingNextStep,
        TurnStage::Summarizing,
        TurnStage::NextQuestionReady,
        TurnStage::Closed,
        TurnStage::Failed,
    ];

    #[test]
    fn happy_path_continue_is_valid() {
        let mut stage = TurnStage::AwaitingAnswer;
        for next in [
            TurnStage::EvaluatingEmotion,
            TurnStage::CheckingFacts,
            TurnStage::AdvisingNextStep,
            TurnStage::NextQuestionReady,
            TurnStage::Closed,
        ] {
            stage = stage.transition_to(next).unwrap();
        }
        assert!(stage.is_terminal());
    }

    #[test]
    fn cannot_skip_fact_check() {
        assert!(TurnStage::EvaluatingEmotion
            .transition_to(TurnStage::AdvisingNextStep)
            .is_err());
    }

    #[test]
    fn failed_reachable_from_every_non_terminal_stage() {
        for stage in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(stage.can_transition_to(&TurnStage::Failed), "{stage}");
        }
    }

    #[test]
    fn only_closed_and_failed_are_terminal() {
        let terminal: Vec<_> = ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![TurnStage::Closed, TurnStage::Failed]);
    }

    #[test]
    fn capability_stages_map_to_their_port() {
        assert_eq!(
            TurnStage::CheckingFacts.capability(),
            Some(CapabilityKind::FactChecker)
        );
        assert_eq!(TurnStage::Closed.capability(), None);
    }
}
