//! Slot-filling interpreter: decides which profile field the user just spoke.
//!
//! The interpreter does not understand language. It recognises the
//! assistant's scripted questions by literal substrings, so rewording those
//! questions in the onboarding instruction breaks it.

use crate::model::{PendingDetail, Slot, UserProfile};

/// Lower-case fragment of the scripted name question.
pub const NAME_PROMPT_FRAGMENT: &str = "can i get your full name";
/// Lower-case fragment of the scripted mobile number question.
pub const PHONE_PROMPT_FRAGMENT: &str = "can you please tell me your mobile number";

/// What a completed turn did to the slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The assistant asked for a slot; the next answer belongs to it.
    Asked(Slot),
    /// A pending answer was stored in the profile.
    Committed { slot: Slot, value: String },
    /// Nothing changed.
    Unchanged,
}

/// Tracks the outstanding question, the spoken answer and the text of the
/// current assistant turn.
#[derive(Debug, Default)]
pub struct SlotInterpreter {
    awaiting: Option<Slot>,
    pending: Option<PendingDetail>,
    pending_revision: u64,
    turn_text: String,
}

impl SlotInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fragment of what the assistant is saying this turn.
    pub fn observe_output(&mut self, fragment: &str) {
        self.turn_text.push_str(fragment);
    }

    /// Record a fragment of the user's recognised speech.
    ///
    /// Ignored unless a question is outstanding. Fragments of the same answer
    /// are appended.
    pub fn observe_input(&mut self, fragment: &str) -> Option<&PendingDetail> {
        let slot = self.awaiting?;
        match self.pending.as_mut() {
            Some(pending) if pending.slot == slot => pending.value.push_str(fragment),
            _ => {
                self.pending = Some(PendingDetail {
                    slot,
                    value: fragment.to_string(),
                });
            }
        }
        self.pending_revision += 1;
        self.pending.as_ref()
    }

    /// Process the end of an assistant turn.
    ///
    /// A new question is checked for before anything is committed, so an
    /// answer captured for the previous question is never stored under the
    /// new one.
    pub fn complete_turn(&mut self, profile: &mut UserProfile) -> TurnOutcome {
        let text = std::mem::take(&mut self.turn_text).to_lowercase();

        if text.contains(NAME_PROMPT_FRAGMENT) {
            self.awaiting = Some(Slot::Name);
            return TurnOutcome::Asked(Slot::Name);
        }
        if text.contains(PHONE_PROMPT_FRAGMENT) {
            self.awaiting = Some(Slot::Phone);
            return TurnOutcome::Asked(Slot::Phone);
        }

        let Some(slot) = self.awaiting else {
            return TurnOutcome::Unchanged;
        };
        let value = match self.pending.as_ref() {
            Some(pending) if pending.slot == slot => pending.value.trim().to_string(),
            _ => return TurnOutcome::Unchanged,
        };
        if value.is_empty() {
            return TurnOutcome::Unchanged;
        }

        profile.set(slot, value.clone());
        self.awaiting = None;
        TurnOutcome::Committed { slot, value }
    }

    /// The spoken value currently shown for verification.
    pub fn pending(&self) -> Option<&PendingDetail> {
        self.pending.as_ref()
    }

    /// Bumped every time the pending value changes.
    pub fn pending_revision(&self) -> u64 {
        self.pending_revision
    }

    /// The question currently awaiting an answer.
    pub fn awaiting(&self) -> Option<Slot> {
        self.awaiting
    }

    /// Clear the displayed detail if it has not changed since `revision`.
    pub fn clear_pending_if_unchanged(&mut self, revision: u64) -> bool {
        if self.pending.is_some() && self.pending_revision == revision {
            self.pending = None;
            return true;
        }
        false
    }

    /// Forget everything, for a fresh onboarding attempt.
    pub fn reset(&mut self) {
        *self = Self {
            pending_revision: self.pending_revision,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(interp: &mut SlotInterpreter, profile: &mut UserProfile, said: &str) -> TurnOutcome {
        interp.observe_output(said);
        interp.complete_turn(profile)
    }

    #[test]
    fn answer_after_name_question_fills_name() {
        let mut interp = SlotInterpreter::new();
        let mut profile = UserProfile::default();

        let asked = turn(
            &mut interp,
            &mut profile,
            "Hi! First, can I get your full name, please?",
        );
        assert_eq!(asked, TurnOutcome::Asked(Slot::Name));

        interp.observe_input("Asha Rao");
        let outcome = turn(
            &mut interp,
            &mut profile,
            "Thank you. I have your name as Asha Rao. Is that correct?",
        );
        assert_eq!(
            outcome,
            TurnOutcome::Committed {
                slot: Slot::Name,
                value: "Asha Rao".into()
            }
        );
        assert_eq!(profile.name, "Asha Rao");
        assert!(profile.phone.is_empty());
        assert_eq!(interp.awaiting(), None);
    }

    #[test]
    fn answer_after_phone_question_fills_phone() {
        let mut interp = SlotInterpreter::new();
        let mut profile = UserProfile::default();

        turn(
            &mut interp,
            &mut profile,
            "Great! Now, can you please tell me your mobile number?",
        );
        interp.observe_input("98765");
        interp.observe_input("43210");
        turn(&mut interp, &mut profile, "Okay, I have your number.");

        assert_eq!(profile.phone, "9876543210");
        assert!(profile.name.is_empty());
    }

    #[test]
    fn new_question_wins_over_pending_answer() {
        let mut interp = SlotInterpreter::new();
        let mut profile = UserProfile::default();

        turn(&mut interp, &mut profile, "Can I get your full name, please?");
        interp.observe_input("Asha Rao");

        // The next turn asks for the phone before confirming the name.
        let outcome = turn(
            &mut interp,
            &mut profile,
            "Now, can you please tell me your mobile number?",
        );
        assert_eq!(outcome, TurnOutcome::Asked(Slot::Phone));
        assert!(profile.name.is_empty());
        assert!(profile.phone.is_empty());

        // The stale name answer is not attributed to the phone slot.
        let outcome = turn(&mut interp, &mut profile, "Let me check.");
        assert_eq!(outcome, TurnOutcome::Unchanged);
        assert!(profile.phone.is_empty());
    }

    #[test]
    fn input_without_question_is_ignored() {
        let mut interp = SlotInterpreter::new();
        let mut profile = UserProfile::default();

        assert!(interp.observe_input("hello there").is_none());
        let outcome = turn(&mut interp, &mut profile, "Welcome to Medzeal.");
        assert_eq!(outcome, TurnOutcome::Unchanged);
        assert!(profile.is_empty());
    }

    #[test]
    fn turn_text_resets_between_turns() {
        let mut interp = SlotInterpreter::new();
        let mut profile = UserProfile::default();

        turn(&mut interp, &mut profile, "Can I get your full name?");
        interp.observe_input("Asha");
        // A later turn must not re-match the earlier question.
        let outcome = turn(&mut interp, &mut profile, "Thanks.");
        assert!(matches!(outcome, TurnOutcome::Committed { .. }));
    }

    #[test]
    fn pending_clear_respects_revision() {
        let mut interp = SlotInterpreter::new();
        let mut profile = UserProfile::default();
        turn(&mut interp, &mut profile, "Can I get your full name?");

        let before = interp.pending_revision();
        interp.observe_input("Asha");
        assert!(!interp.clear_pending_if_unchanged(before));
        assert!(interp.pending().is_some());

        assert!(interp.clear_pending_if_unchanged(interp.pending_revision()));
        assert!(interp.pending().is_none());
    }

    #[test]
    fn reset_forgets_question_and_answer() {
        let mut interp = SlotInterpreter::new();
        let mut profile = UserProfile::default();
        turn(&mut interp, &mut profile, "Can I get your full name?");
        interp.observe_input("Asha");

        interp.reset();
        assert!(interp.awaiting().is_none());
        assert!(interp.pending().is_none());
    }
}
