//! Frame recording for headless runs.
//!
//! `FrameRecorder` is a `PosePublisher` that stores one sample per published
//! pose, tagged with the tour snapshot set just before the frame. Used by the
//! `simulate` command to dump a run as JSON.

use serde::Serialize;

use crate::camera::{CameraPose, PosePublisher};
use crate::tour_state::{Phase, TourSnapshot, TourState};

/// One recorded frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSample {
    pub time: f32,
    pub phase: &'static str,
    pub chapter_index: usize,
    pub active_chapter: Option<usize>,
    pub quote_index: usize,
    pub paused: bool,
    pub position: [f32; 3],
    pub look: [f32; 3],
}

/// A phase change observed while recording.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseMark {
    pub time: f32,
    pub phase: &'static str,
    pub chapter_index: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub frames: Vec<FrameSample>,
    pub phases: Vec<PhaseMark>,
    pub dropped: usize,
}

#[derive(Debug)]
pub struct FrameRecorder {
    frames: Vec<FrameSample>,
    phases: Vec<PhaseMark>,
    current_time: f32,
    current: TourSnapshot,
    last_phase: Option<Phase>,
    /// Memory bound on stored frames.
    max_frames: usize,
    dropped: usize,
}

impl Default for FrameRecorder {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl FrameRecorder {
    pub fn new(max_frames: usize) -> Self {
        Self {
            frames: Vec::new(),
            phases: Vec::new(),
            current_time: 0.0,
            current: TourState::default().snapshot(),
            last_phase: None,
            max_frames,
            dropped: 0,
        }
    }

    /// Tag subsequent samples with `time` and `snapshot`.
    pub fn set_frame(&mut self, time: f32, snapshot: TourSnapshot) {
        self.current_time = time;
        self.current = snapshot;
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[FrameSample] {
        &self.frames
    }

    pub fn phases(&self) -> &[PhaseMark] {
        &self.phases
    }

    /// Take everything recorded, leaving the recorder empty.
    pub fn take(&mut self) -> Recording {
        Recording {
            frames: std::mem::take(&mut self.frames),
            phases: std::mem::take(&mut self.phases),
            dropped: std::mem::take(&mut self.dropped),
        }
    }
}

impl PosePublisher for FrameRecorder {
    fn publish(&mut self, pose: &CameraPose) {
        let snapshot = self.current;
        if self.last_phase != Some(snapshot.phase) {
            self.last_phase = Some(snapshot.phase);
            self.phases.push(PhaseMark {
                time: self.current_time,
                phase: snapshot.phase.label(),
                chapter_index: snapshot.chapter_index,
            });
        }

        if !pose.position.is_finite() {
            log::warn!("Dropping non-finite pose at t={:.3}", self.current_time);
            self.dropped += 1;
            return;
        }
        if self.frames.len() >= self.max_frames {
            self.dropped += 1;
            return;
        }

        self.frames.push(FrameSample {
            time: self.current_time,
            phase: snapshot.phase.label(),
            chapter_index: snapshot.chapter_index,
            active_chapter: snapshot.active_chapter,
            quote_index: snapshot.quote_index,
            paused: snapshot.paused,
            position: pose.position.to_array(),
            look: pose.look_point().to_array(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour_state::SubPhase;
    use glam::Vec3;

    #[test]
    fn test_records_frames_and_phase_marks() {
        let mut recorder = FrameRecorder::new(10);
        let mut state = TourState::default();
        let pose = CameraPose::look_at(Vec3::new(0.0, 1.0, 2.0), Vec3::ZERO);

        recorder.set_frame(0.0, state.snapshot());
        recorder.publish(&pose);
        recorder.set_frame(0.5, state.snapshot());
        recorder.publish(&pose);
        state.phase = Phase::Touring(SubPhase::Approach);
        recorder.set_frame(1.0, state.snapshot());
        recorder.publish(&pose);

        assert_eq!(recorder.frame_count(), 3);
        let phases: Vec<_> = recorder.phases().iter().map(|p| p.phase).collect();
        assert_eq!(phases, vec!["intro", "approach"]);
        assert_eq!(recorder.frames()[2].position, [0.0, 1.0, 2.0]);
        assert_eq!(recorder.frames()[2].look, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_memory_bound() {
        let mut recorder = FrameRecorder::new(2);
        let pose = CameraPose::default();
        for _ in 0..5 {
            recorder.publish(&pose);
        }
        let recording = recorder.take();
        assert_eq!(recording.frames.len(), 2);
        assert_eq!(recording.dropped, 3);
        assert_eq!(recorder.frame_count(), 0);
    }

    #[test]
    fn test_serialises_to_json() {
        let mut recorder = FrameRecorder::new(4);
        recorder.publish(&CameraPose::default());
        let json = serde_json::to_value(recorder.take()).unwrap();
        assert_eq!(json["frames"][0]["phase"], "intro");
        assert_eq!(json["frames"][0]["activeChapter"], serde_json::Value::Null);
    }
}
