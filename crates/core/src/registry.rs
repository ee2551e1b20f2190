//! Checkpoint registry: the ordered, validated checkpoint set for one
//! primary video.
//!
//! The registry is read-only at session runtime. It is built once per
//! operation from authored content and answers the two questions the state
//! machine asks: "what is the next checkpoint after this offset?" and
//! "which checkpoints fall inside this range?".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

/// What happens when playback reaches a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointKind {
    /// A question evaluated against the checkpoint's pass criteria.
    Question,
    /// Informational only; never blocks and never branches.
    Prompt,
    /// A question that blocks forward progress until passed.
    Gate,
}

impl CheckpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointKind::Question => "question",
            CheckpointKind::Prompt => "prompt",
            CheckpointKind::Gate => "gate",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "question" => Ok(CheckpointKind::Question),
            "prompt" => Ok(CheckpointKind::Prompt),
            "gate" => Ok(CheckpointKind::Gate),
            other => Err(CoreError::Validation(format!(
                "Unknown checkpoint kind: {other}"
            ))),
        }
    }
}

/// A fixed offset in a primary video where interactive evaluation occurs.
#[derive(Debug, Clone, Serialize)]
pub struct Checkpoint {
    pub id: DbId,
    pub video_id: DbId,
    /// Offset from the start of the primary video, in seconds.
    pub offset_secs: f64,
    pub kind: CheckpointKind,
    pub required: bool,
    /// At most one remedial clip may be branched into on failure.
    pub remedial_clip_id: Option<DbId>,
    /// Expected answer; `None` means any answer passes.
    pub pass_answer: Option<String>,
}

impl Checkpoint {
    /// Whether reaching this checkpoint parks the session until answered.
    ///
    /// Prompts never block, regardless of the `required` flag.
    pub fn blocks(&self) -> bool {
        self.required && self.kind != CheckpointKind::Prompt
    }
}

/// Primary video metadata the state machine needs: identity and duration.
#[derive(Debug, Clone, Serialize)]
pub struct PrimaryVideo {
    pub id: DbId,
    pub duration_secs: f64,
}

/// A short supplementary video shown on checkpoint failure. Clips have no
/// checkpoints of their own; branch depth is capped at 1.
#[derive(Debug, Clone, Serialize)]
pub struct RemedialClip {
    pub id: DbId,
    pub duration_secs: f64,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered checkpoint set for one primary video, plus the remedial clips
/// its checkpoints may branch into.
#[derive(Debug, Clone)]
pub struct CheckpointRegistry {
    video: PrimaryVideo,
    /// Sorted by `offset_secs`, strictly increasing.
    checkpoints: Vec<Checkpoint>,
    clips: HashMap<DbId, RemedialClip>,
}

impl CheckpointRegistry {
    /// Build a registry, enforcing the content invariants:
    ///
    /// - checkpoint offsets are strictly increasing and unique,
    /// - every offset is `> 0` and `< duration` (sessions start at offset 0
    ///   and checkpoint detection is strictly-greater-than, so a checkpoint
    ///   at 0 could never fire),
    /// - every referenced remedial clip exists.
    ///
    /// `checkpoints` may arrive in any order; they are sorted here.
    pub fn new(
        video: PrimaryVideo,
        mut checkpoints: Vec<Checkpoint>,
        clips: Vec<RemedialClip>,
    ) -> Result<Self, CoreError> {
        if video.duration_secs <= 0.0 {
            return Err(CoreError::Validation(format!(
                "Video {} has non-positive duration",
                video.id
            )));
        }

        checkpoints.sort_by(|a, b| a.offset_secs.total_cmp(&b.offset_secs));

        let clips: HashMap<DbId, RemedialClip> = clips.into_iter().map(|c| (c.id, c)).collect();

        let mut last: Option<f64> = None;
        for cp in &checkpoints {
            if cp.offset_secs <= 0.0 || cp.offset_secs >= video.duration_secs {
                return Err(CoreError::Validation(format!(
                    "Checkpoint {} offset {}s must be above 0s and below the video duration {}s",
                    cp.id, cp.offset_secs, video.duration_secs
                )));
            }
            if let Some(prev) = last {
                if cp.offset_secs <= prev {
                    return Err(CoreError::Validation(format!(
                        "Checkpoint offsets must be strictly increasing: {}s after {}s",
                        cp.offset_secs, prev
                    )));
                }
            }
            if let Some(clip_id) = cp.remedial_clip_id {
                if !clips.contains_key(&clip_id) {
                    return Err(CoreError::UnknownClip(clip_id));
                }
            }
            last = Some(cp.offset_secs);
        }

        Ok(Self {
            video,
            checkpoints,
            clips,
        })
    }

    pub fn video(&self) -> &PrimaryVideo {
        &self.video
    }

    pub fn duration_secs(&self) -> f64 {
        self.video.duration_secs
    }

    /// The checkpoint with the smallest offset strictly greater than
    /// `after_secs`, or `None` past the last checkpoint.
    pub fn next_checkpoint(&self, after_secs: f64) -> Option<&Checkpoint> {
        self.checkpoints
            .iter()
            .find(|cp| cp.offset_secs > after_secs)
    }

    /// Checkpoints with offsets in the half-open range `(lo, hi]`, ordered
    /// by offset. Restartable: each call yields a fresh iterator.
    pub fn checkpoints_in_range(
        &self,
        lo_secs: f64,
        hi_secs: f64,
    ) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints
            .iter()
            .filter(move |cp| cp.offset_secs > lo_secs && cp.offset_secs <= hi_secs)
    }

    /// Look up a checkpoint by id.
    pub fn checkpoint(&self, id: DbId) -> Result<&Checkpoint, CoreError> {
        self.checkpoints
            .iter()
            .find(|cp| cp.id == id)
            .ok_or(CoreError::UnknownCheckpoint(id))
    }

    /// Look up a remedial clip by id.
    pub fn clip(&self, id: DbId) -> Result<&RemedialClip, CoreError> {
        self.clips.get(&id).ok_or(CoreError::UnknownClip(id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(id: DbId, offset: f64) -> Checkpoint {
        Checkpoint {
            id,
            video_id: 1,
            offset_secs: offset,
            kind: CheckpointKind::Prompt,
            required: false,
            remedial_clip_id: None,
            pass_answer: None,
        }
    }

    fn video() -> PrimaryVideo {
        PrimaryVideo {
            id: 1,
            duration_secs: 100.0,
        }
    }

    fn registry(checkpoints: Vec<Checkpoint>) -> CheckpointRegistry {
        CheckpointRegistry::new(video(), checkpoints, vec![]).unwrap()
    }

    // -- construction --------------------------------------------------------

    #[test]
    fn accepts_empty_checkpoint_set() {
        assert!(CheckpointRegistry::new(video(), vec![], vec![]).is_ok());
    }

    #[test]
    fn sorts_unordered_input() {
        let reg = registry(vec![cp(2, 30.0), cp(1, 10.0)]);
        assert_eq!(reg.next_checkpoint(0.0).unwrap().id, 1);
    }

    #[test]
    fn rejects_duplicate_offsets() {
        let err = CheckpointRegistry::new(video(), vec![cp(1, 10.0), cp(2, 10.0)], vec![]);
        assert!(matches!(err, Err(CoreError::Validation(_))));
    }

    #[test]
    fn rejects_offset_at_or_past_duration() {
        let err = CheckpointRegistry::new(video(), vec![cp(1, 100.0)], vec![]);
        assert!(matches!(err, Err(CoreError::Validation(_))));
    }

    #[test]
    fn rejects_negative_offset() {
        let err = CheckpointRegistry::new(video(), vec![cp(1, -1.0)], vec![]);
        assert!(matches!(err, Err(CoreError::Validation(_))));
    }

    #[test]
    fn rejects_offset_at_zero() {
        // Detection is strictly-greater-than from a start position of 0, so
        // an offset-0 checkpoint would be authored but never reached.
        let err = CheckpointRegistry::new(video(), vec![cp(1, 0.0)], vec![]);
        assert!(matches!(err, Err(CoreError::Validation(_))));
    }

    #[test]
    fn rejects_dangling_clip_reference() {
        let mut gate = cp(1, 10.0);
        gate.remedial_clip_id = Some(99);
        let err = CheckpointRegistry::new(video(), vec![gate], vec![]);
        assert!(matches!(err, Err(CoreError::UnknownClip(99))));
    }

    #[test]
    fn rejects_non_positive_duration() {
        let v = PrimaryVideo {
            id: 1,
            duration_secs: 0.0,
        };
        assert!(CheckpointRegistry::new(v, vec![], vec![]).is_err());
    }

    // -- next_checkpoint -----------------------------------------------------

    #[test]
    fn next_checkpoint_is_strictly_greater() {
        let reg = registry(vec![cp(1, 10.0), cp(2, 30.0)]);
        // Exactly at an offset skips that checkpoint.
        assert_eq!(reg.next_checkpoint(10.0).unwrap().id, 2);
        assert_eq!(reg.next_checkpoint(9.9).unwrap().id, 1);
    }

    #[test]
    fn next_checkpoint_none_past_last() {
        let reg = registry(vec![cp(1, 10.0)]);
        assert!(reg.next_checkpoint(10.0).is_none());
    }

    // -- checkpoints_in_range ------------------------------------------------

    #[test]
    fn range_is_half_open() {
        let reg = registry(vec![cp(1, 10.0), cp(2, 30.0), cp(3, 50.0)]);
        let ids: Vec<DbId> = reg.checkpoints_in_range(10.0, 50.0).map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn range_iterator_is_restartable() {
        let reg = registry(vec![cp(1, 10.0), cp(2, 30.0)]);
        assert_eq!(reg.checkpoints_in_range(0.0, 100.0).count(), 2);
        assert_eq!(reg.checkpoints_in_range(0.0, 100.0).count(), 2);
    }

    // -- lookups -------------------------------------------------------------

    #[test]
    fn unknown_checkpoint_lookup_fails() {
        let reg = registry(vec![]);
        assert!(matches!(
            reg.checkpoint(7),
            Err(CoreError::UnknownCheckpoint(7))
        ));
    }

    #[test]
    fn clip_lookup() {
        let clip = RemedialClip {
            id: 5,
            duration_secs: 20.0,
        };
        let reg = CheckpointRegistry::new(video(), vec![], vec![clip]).unwrap();
        assert!(reg.clip(5).is_ok());
        assert!(matches!(reg.clip(6), Err(CoreError::UnknownClip(6))));
    }
}
