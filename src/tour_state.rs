//! Observable tour state.
//!
//! `TourState` is owned and mutated only by the director. Everyone else reads
//! it, or a `TourSnapshot` of it, after the frame has settled.

use glam::Vec3;
use serde::Serialize;

/// Segment of a chapter visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubPhase {
    Approach,
    Dwell,
    Depart,
}

/// Top-level phase. The sub-phase only exists while touring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "phase", content = "subPhase", rename_all = "camelCase")]
pub enum Phase {
    Intro,
    Touring(SubPhase),
    FreeExplore,
    Outro,
}

impl Phase {
    pub fn is_touring(&self) -> bool {
        matches!(self, Phase::Touring(_))
    }

    pub fn sub_phase(&self) -> Option<SubPhase> {
        match self {
            Phase::Touring(sub) => Some(*sub),
            _ => None,
        }
    }

    /// Short label for logs and recorded frames.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Intro => "intro",
            Phase::Touring(SubPhase::Approach) => "approach",
            Phase::Touring(SubPhase::Dwell) => "dwell",
            Phase::Touring(SubPhase::Depart) => "depart",
            Phase::FreeExplore => "freeExplore",
            Phase::Outro => "outro",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TourState {
    pub phase: Phase,
    /// Chapter being toured, or the one a resume continues after.
    pub chapter_index: usize,
    /// Seconds since the current (phase, sub-phase) was entered.
    pub phase_elapsed: f32,
    /// Chapter in focus for rendering and overlay.
    pub active_chapter: Option<usize>,
    pub quote_index: usize,
    /// Anchor of an in-flight fly-to.
    pub camera_target: Option<Vec3>,
    /// The scripted tour was interrupted and is waiting to resume.
    pub paused: bool,
}

impl Default for TourState {
    fn default() -> Self {
        Self {
            phase: Phase::Intro,
            chapter_index: 0,
            phase_elapsed: 0.0,
            active_chapter: None,
            quote_index: 0,
            camera_target: None,
            paused: false,
        }
    }
}

impl TourState {
    pub fn is_transitioning(&self) -> bool {
        self.camera_target.is_some()
    }

    /// Enter `phase` with a fresh timer.
    pub(crate) fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_elapsed = 0.0;
    }

    /// Focus `chapter`; the quote cursor restarts when focus changes.
    pub(crate) fn set_active_chapter(&mut self, chapter: Option<usize>) {
        if self.active_chapter != chapter {
            self.active_chapter = chapter;
            self.quote_index = 0;
        }
    }

    pub fn snapshot(&self) -> TourSnapshot {
        TourSnapshot {
            phase: self.phase,
            chapter_index: self.chapter_index,
            active_chapter: self.active_chapter,
            quote_index: self.quote_index,
            paused: self.paused,
            transitioning: self.is_transitioning(),
        }
    }
}

/// The part of the state observers care about. Excludes the per-frame timer
/// so unchanged snapshots can be skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TourSnapshot {
    #[serde(flatten)]
    pub phase: Phase,
    pub chapter_index: usize,
    pub active_chapter: Option<usize>,
    pub quote_index: usize,
    pub paused: bool,
    pub transitioning: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_phase_only_while_touring() {
        assert_eq!(Phase::Intro.sub_phase(), None);
        assert_eq!(Phase::FreeExplore.sub_phase(), None);
        assert_eq!(Phase::Touring(SubPhase::Dwell).sub_phase(), Some(SubPhase::Dwell));
    }

    #[test]
    fn test_focus_change_resets_quote() {
        let mut state = TourState {
            active_chapter: Some(1),
            quote_index: 3,
            ..TourState::default()
        };
        state.set_active_chapter(Some(1));
        assert_eq!(state.quote_index, 3);
        state.set_active_chapter(Some(2));
        assert_eq!(state.quote_index, 0);
    }

    #[test]
    fn test_snapshot_json() {
        let state = TourState {
            phase: Phase::Touring(SubPhase::Approach),
            ..TourState::default()
        };
        let json = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(json["phase"], "touring");
        assert_eq!(json["subPhase"], "approach");
        assert_eq!(json["transitioning"], false);
    }
}
