//! Remedial resolver: given a checkpoint and a learner's answer, decide
//! whether playback proceeds, branches into a remedial clip, or stays
//! blocked.
//!
//! [`resolve`] is a pure function of its inputs; no hidden state.

use serde::Serialize;

use crate::registry::{Checkpoint, CheckpointKind};
use crate::types::DbId;

/// Outcome of resolving a checkpoint answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Continue on the primary video.
    Proceed,
    /// Branch into the given remedial clip.
    Branch { clip_id: DbId },
    /// Required checkpoint failed with no remedial clip; no forward motion.
    BlockRequired,
}

/// Whether `answer` satisfies the checkpoint's pass criteria.
///
/// Matching is trimmed and case-insensitive; a checkpoint with no criteria
/// accepts any answer.
pub fn is_passing(checkpoint: &Checkpoint, answer: &str) -> bool {
    match &checkpoint.pass_answer {
        Some(expected) => expected.trim().eq_ignore_ascii_case(answer.trim()),
        None => true,
    }
}

/// Decide what happens after a learner answers `checkpoint` with `answer`.
///
/// - `prompt` checkpoints always proceed (informational only).
/// - Passing answers proceed.
/// - Failing answers branch when a remedial clip is configured; otherwise
///   they block if the checkpoint is required and soft-fail (proceed) if not.
pub fn resolve(checkpoint: &Checkpoint, answer: &str) -> Decision {
    if checkpoint.kind == CheckpointKind::Prompt {
        return Decision::Proceed;
    }
    if is_passing(checkpoint, answer) {
        return Decision::Proceed;
    }
    match checkpoint.remedial_clip_id {
        Some(clip_id) => Decision::Branch { clip_id },
        None if checkpoint.required => Decision::BlockRequired,
        None => Decision::Proceed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(kind: CheckpointKind, required: bool, clip: Option<DbId>) -> Checkpoint {
        Checkpoint {
            id: 1,
            video_id: 1,
            offset_secs: 30.0,
            kind,
            required,
            remedial_clip_id: clip,
            pass_answer: Some("correct".to_string()),
        }
    }

    #[test]
    fn prompt_always_proceeds() {
        let cp = checkpoint(CheckpointKind::Prompt, true, Some(9));
        assert_eq!(resolve(&cp, "anything at all"), Decision::Proceed);
    }

    #[test]
    fn passing_answer_proceeds() {
        let cp = checkpoint(CheckpointKind::Gate, true, Some(9));
        assert_eq!(resolve(&cp, "correct"), Decision::Proceed);
    }

    #[test]
    fn matching_ignores_case_and_whitespace() {
        let cp = checkpoint(CheckpointKind::Question, true, None);
        assert_eq!(resolve(&cp, "  CORRECT "), Decision::Proceed);
    }

    #[test]
    fn failing_with_clip_branches() {
        let cp = checkpoint(CheckpointKind::Gate, true, Some(9));
        assert_eq!(resolve(&cp, "wrong"), Decision::Branch { clip_id: 9 });
    }

    #[test]
    fn failing_required_without_clip_blocks() {
        let cp = checkpoint(CheckpointKind::Gate, true, None);
        assert_eq!(resolve(&cp, "wrong"), Decision::BlockRequired);
    }

    #[test]
    fn failing_optional_without_clip_soft_fails() {
        let cp = checkpoint(CheckpointKind::Question, false, None);
        assert_eq!(resolve(&cp, "wrong"), Decision::Proceed);
    }

    #[test]
    fn no_criteria_accepts_any_answer() {
        let mut cp = checkpoint(CheckpointKind::Question, true, None);
        cp.pass_answer = None;
        assert_eq!(resolve(&cp, "whatever"), Decision::Proceed);
    }
}
