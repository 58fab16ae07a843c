//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> TransitionContext {
    TransitionContext::now()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_attachment() -> impl Strategy<Value = Attachment> {
    (
        proptest::collection::vec(any::<u8>(), 1..32),
        prop_oneof![Just("image/png"), Just("image/jpeg")],
    )
        .prop_map(|(bytes, media_type)| Attachment::new(bytes, media_type))
}

fn arb_draft_text_event() -> impl Strategy<Value = Event> {
    // Empty drafts on purpose: submit must ignore them
    "[a-zA-Z ]{0,20}".prop_map(|text| Event::DraftTextChanged { text })
}

fn arb_draft_attachment_event() -> impl Strategy<Value = Event> {
    proptest::option::of(arb_attachment())
        .prop_map(|attachment| Event::DraftAttachmentChanged { attachment })
}

fn arb_model_reply_event() -> impl Strategy<Value = Event> {
    (1u64..8, "[a-zA-Z ]{0,20}").prop_map(|(id, text)| Event::ModelReply {
        submission_id: SubmissionId(id),
        text,
    })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_draft_text_event(),
        arb_draft_attachment_event(),
        Just(Event::Submit),
        arb_model_reply_event(),
    ]
}

// ============================================================================
// State Validity Checkers
// ============================================================================

/// Each submission has exactly one user turn, at most one model turn, and is
/// awaiting a reply exactly when its model turn is missing.
fn is_consistent(state: &ConversationState) -> bool {
    let mut per_submission: HashMap<SubmissionId, (usize, usize)> = HashMap::new();
    for turn in state.turns() {
        let entry = per_submission.entry(turn.submission_id).or_default();
        match turn.origin {
            Origin::User => entry.0 += 1,
            Origin::Model => entry.1 += 1,
        }
    }

    let missing_reply: BTreeSet<SubmissionId> = per_submission
        .iter()
        .filter(|(_, (_, model))| *model == 0)
        .map(|(id, _)| *id)
        .collect();

    per_submission
        .values()
        .all(|(user, model)| *user == 1 && *model <= 1)
        && &missing_reply == state.awaiting_reply()
}

/// The old turns are exactly the oldest part of the new turns
fn is_append_only(old: &ConversationState, new: &ConversationState) -> bool {
    let skip = new.turn_count().saturating_sub(old.turn_count());
    new.turn_count() >= old.turn_count() && new.turns().skip(skip).eq(old.turns())
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: Turns are append-only and bookkeeping stays consistent
    #[test]
    fn prop_transitions_preserve_consistency(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = ConversationState::new();
        let ctx = test_context();

        for event in events {
            match transition(&state, &ctx, event) {
                Ok(result) => {
                    prop_assert!(is_append_only(&state, &result.new_state));
                    prop_assert!(is_consistent(&result.new_state), "Inconsistent: {:?}", result.new_state);
                    prop_assert!(result.new_state.turn_count() - state.turn_count() <= 1);
                    state = result.new_state;
                }
                Err(TransitionError::UnknownSubmission(id)) => {
                    prop_assert!(!state.is_awaiting(id));
                }
            }
        }
    }

    // Invariant 2: The latest draft text is what gets submitted
    #[test]
    fn prop_latest_draft_wins(drafts in proptest::collection::vec("[a-z]{0,10}", 1..10)) {
        let ctx = test_context();
        let mut state = ConversationState::new();
        for text in &drafts {
            state = transition(&state, &ctx, Event::DraftTextChanged { text: text.clone() })
                .unwrap()
                .new_state;
        }

        let last = drafts.last().unwrap();
        let result = transition(&state, &ctx, Event::Submit).unwrap();

        if last.is_empty() {
            prop_assert!(result.submission().is_none());
            prop_assert_eq!(result.new_state.turn_count(), 0);
        } else {
            prop_assert_eq!(&result.submission().unwrap().text, last);
            let texts: Vec<_> = result.new_state.turns().map(|t| t.text.clone()).collect();
            prop_assert_eq!(texts, vec![last.clone()]);
        }
    }

    // Invariant 3: Accepted submit adds one user turn and clears the draft
    #[test]
    fn prop_submit_clears_draft(text in "[a-zA-Z]{1,20}", attachment in proptest::option::of(arb_attachment())) {
        let ctx = test_context();
        let mut state = ConversationState::new();
        state.draft_text = text.clone();
        state.draft_attachment = attachment.clone();

        let result = transition(&state, &ctx, Event::Submit).unwrap();
        let next = &result.new_state;

        prop_assert_eq!(next.turn_count(), state.turn_count() + 1);
        prop_assert!(next.draft_text.is_empty());
        prop_assert!(next.draft_attachment.is_none());

        let turn = next.latest_turn().unwrap();
        prop_assert_eq!(turn.origin, Origin::User);
        prop_assert_eq!(&turn.text, &text);
        prop_assert_eq!(&turn.attachment, &attachment);
    }

    // Invariant 4: Replying to every submission doubles the turn count and idles
    #[test]
    fn prop_every_submission_gets_one_reply(prompts in proptest::collection::vec("[a-z]{1,10}", 1..8)) {
        let ctx = test_context();
        let mut state = ConversationState::new();
        let mut ids = Vec::new();

        for prompt in &prompts {
            state = transition(&state, &ctx, Event::DraftTextChanged { text: prompt.clone() })
                .unwrap()
                .new_state;
            let result = transition(&state, &ctx, Event::Submit).unwrap();
            ids.push(result.submission().unwrap().id);
            state = result.new_state;
        }

        // Reply in reverse order to mimic out-of-order completion
        for id in ids.iter().rev() {
            state = transition(&state, &ctx, Event::ModelReply { submission_id: *id, text: "ok".into() })
                .unwrap()
                .new_state;
        }

        prop_assert!(state.is_idle());
        prop_assert_eq!(state.turn_count(), prompts.len() * 2);
        prop_assert!(is_consistent(&state));
    }
}
