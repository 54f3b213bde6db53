//! The cinematic director.
//!
//! A time-driven state machine that owns the tour state and produces one
//! camera pose per frame:
//!
//! ```text
//! Intro ──► Touring(Approach ► Dwell ► Depart)×N ──► Outro ──► FreeExplore
//!              │ move input / pause            ▲ resume
//!              └──────────► FreeExplore ───────┘
//! ```
//!
//! Each frame the input is sampled once, the phase timer advances by the
//! clamped `dt`, the pose is computed, and only then are observers notified.
//! Nothing on this path returns an error: bad requests are ignored so
//! rendering never stops.

use glam::{Vec2, Vec3};
use serde::Deserialize;

use crate::camera::{CameraPose, PosePublisher};
use crate::chapter::{Chapter, ChapterRegistry};
use crate::config::{
    ConfigError, TourConfig, INTRO_END, INTRO_START, OUTRO_POINT, PHASE_EPSILON, TOUR_PULLBACK,
};
use crate::easing::{approach_look_weight, converge, eased_progress};
use crate::free_fly::{steer_toward, FreeFlyController, Steer};
use crate::input::{FrameInput, InputAggregator};
use crate::observer::{StatePublisher, SubscriptionId, TourObserver};
use crate::tour_state::{Phase, SubPhase, TourSnapshot, TourState};

/// Fly-to look-at convergence rate, per second.
const FLY_TO_LOOK_RATE: f32 = 3.0;

/// User-initiated requests routed into the director.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "chapter", rename_all = "camelCase")]
pub enum Action {
    PauseTour,
    ResumeTour,
    ResumeTourFromChapter(usize),
    FlyToChapter(usize),
}

pub struct TourDirector {
    registry: ChapterRegistry,
    config: TourConfig,
    state: TourState,
    fly: FreeFlyController,
    pose: CameraPose,
    /// Look point the current approach starts from.
    approach_look_from: Vec3,
    /// Camera position at outro entry.
    outro_from: Vec3,
    /// Converging look point of an in-flight fly-to.
    fly_to_look: Vec3,
    free_quote_timer: f32,
    last_frame_phase: Phase,
    publisher: StatePublisher,
}

impl TourDirector {
    /// Build a director, refusing invalid timing configuration.
    pub fn new(registry: ChapterRegistry, config: TourConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(registry, config))
    }

    fn build(registry: ChapterRegistry, config: TourConfig) -> Self {
        Self {
            registry,
            config,
            state: TourState::default(),
            fly: FreeFlyController::default(),
            pose: CameraPose::look_at(INTRO_START, Vec3::ZERO),
            approach_look_from: Vec3::ZERO,
            outro_from: TOUR_PULLBACK,
            fly_to_look: Vec3::ZERO,
            free_quote_timer: 0.0,
            last_frame_phase: Phase::Intro,
            publisher: StatePublisher::new(),
        }
    }

    pub fn state(&self) -> &TourState {
        &self.state
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    pub fn free_fly(&self) -> &FreeFlyController {
        &self.fly
    }

    pub fn registry(&self) -> &ChapterRegistry {
        &self.registry
    }

    pub fn config(&self) -> &TourConfig {
        &self.config
    }

    pub fn snapshot(&self) -> TourSnapshot {
        self.state.snapshot()
    }

    /// Chapter currently in focus, if any.
    pub fn active_chapter(&self) -> Option<&Chapter> {
        self.state.active_chapter.and_then(|id| self.registry.get(id))
    }

    pub fn subscribe(&mut self, observer: Box<dyn TourObserver>) -> SubscriptionId {
        self.publisher.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.publisher.unsubscribe(id)
    }

    // ------------------------------------------------------------------
    // Frame entry points
    // ------------------------------------------------------------------

    /// Advance one frame with an already-sampled input and notify observers.
    pub fn step(&mut self, dt: f32, input: &FrameInput) -> CameraPose {
        self.advance(dt, input);
        self.notify();
        self.pose
    }

    /// Full frame: sample input once, advance, publish the pose, then notify
    /// observers from the settled state.
    pub fn frame(
        &mut self,
        dt: f32,
        input: &mut InputAggregator,
        publisher: &mut dyn PosePublisher,
    ) -> CameraPose {
        let exploring = self.state.phase == Phase::FreeExplore;
        if self.last_frame_phase == Phase::FreeExplore && !exploring {
            input.reset();
        }
        input.set_capture(exploring);
        let sampled = input.sample();
        self.advance(dt, &sampled);
        self.last_frame_phase = self.state.phase;
        // Presses arriving before the next frame only interrupt while scripted.
        input.set_capture(self.state.phase == Phase::FreeExplore);
        publisher.publish(&self.pose);
        self.notify();
        self.pose
    }

    fn notify(&mut self) {
        self.publisher.publish(self.state.snapshot(), &self.registry);
    }

    fn advance(&mut self, dt: f32, input: &FrameInput) {
        let dt = self.config.clamp_dt(dt);

        let mut look_delta = input.look_delta;
        if input.interrupt && self.state.phase.is_touring() {
            self.pause_in_place();
            // Drags collected while the script drove the camera are stale.
            look_delta = Vec2::ZERO;
        }

        self.state.phase_elapsed += dt;

        match self.state.phase {
            Phase::Intro => self.update_intro(),
            Phase::Touring(SubPhase::Approach) => self.update_approach(),
            Phase::Touring(SubPhase::Dwell) => self.update_dwell(dt),
            Phase::Touring(SubPhase::Depart) => self.update_depart(),
            Phase::FreeExplore => self.update_free_explore(dt, input.move_intent, look_delta),
            Phase::Outro => self.update_outro(),
        }
    }

    fn reached(&self, duration: f32) -> bool {
        self.state.phase_elapsed >= duration - PHASE_EPSILON
    }

    // ------------------------------------------------------------------
    // Per-phase updates
    // ------------------------------------------------------------------

    fn update_intro(&mut self) {
        let e = eased_progress(self.state.phase_elapsed, self.config.intro_duration);
        self.pose = CameraPose::look_at(INTRO_START.lerp(INTRO_END, e), Vec3::ZERO);
        if self.reached(self.config.intro_duration) {
            self.begin_approach(0);
        }
    }

    fn update_approach(&mut self) {
        let Some(chapter) = self.registry.get(self.state.chapter_index) else {
            return;
        };
        let e = eased_progress(self.state.phase_elapsed, self.config.approach_duration);
        let position = chapter.approach_point.lerp(chapter.orbit_sample(0.0), e);
        let look = self
            .approach_look_from
            .lerp(chapter.anchor, approach_look_weight(e));
        self.pose = CameraPose::look_at(position, look);

        if self.reached(self.config.approach_duration) {
            self.advance_tour();
        }
    }

    fn update_dwell(&mut self, dt: f32) {
        let Some(chapter) = self.registry.get(self.state.chapter_index) else {
            return;
        };
        let t = self.state.phase_elapsed;
        self.pose = CameraPose::look_at(chapter.orbit_sample(t), chapter.anchor);

        let crossed = boundaries_crossed(t - dt, t, self.config.quote_interval);
        for _ in 0..crossed {
            self.next_quote();
        }

        if self.reached(self.config.dwell_duration) {
            self.advance_tour();
        }
    }

    fn update_depart(&mut self) {
        let index = self.state.chapter_index;
        let Some(chapter) = self.registry.get(index) else {
            return;
        };
        let (to, look_to) = match self.registry.get(index + 1) {
            Some(next) => (next.approach_point, next.anchor),
            None => (TOUR_PULLBACK, Vec3::ZERO),
        };
        let e = eased_progress(self.state.phase_elapsed, self.config.depart_duration);
        let from = chapter.orbit_sample(self.config.dwell_duration);
        self.pose = CameraPose::look_at(from.lerp(to, e), chapter.anchor.lerp(look_to, e));

        if self.reached(self.config.depart_duration) {
            self.advance_tour();
        }
    }

    fn update_outro(&mut self) {
        let e = eased_progress(self.state.phase_elapsed, self.config.outro_duration);
        self.pose = CameraPose::look_at(self.outro_from.lerp(OUTRO_POINT, e), Vec3::ZERO);

        if self.reached(self.config.outro_duration) {
            self.fly.sync_from_pose(&self.pose);
            self.fly.stop();
            self.state.paused = false;
            self.enter(Phase::FreeExplore);
        }
    }

    fn update_free_explore(&mut self, dt: f32, intent: Vec3, look_delta: Vec2) {
        if dt > 0.0 {
            match self.state.camera_target {
                Some(target) => self.update_fly_to(target, dt),
                None => {
                    self.fly.apply_look(
                        look_delta,
                        self.config.look_sensitivity,
                        self.config.pitch_limit,
                    );
                    let position = self.fly.integrate(
                        self.pose.position,
                        intent,
                        dt,
                        self.config.fly_speed,
                        self.config.fly_damping,
                    );
                    self.pose = self.fly.pose(position);
                    let nearest = self
                        .registry
                        .nearest_within(position, self.config.activation_distance);
                    self.focus(nearest);
                }
            }
        }

        if self.state.active_chapter.is_some() {
            self.free_quote_timer += dt;
            if self.free_quote_timer > self.config.free_explore_quote_interval {
                self.free_quote_timer = 0.0;
                self.next_quote();
            }
        } else {
            self.free_quote_timer = 0.0;
        }
    }

    fn update_fly_to(&mut self, target: Vec3, dt: f32) {
        let destination = target + self.config.fly_to_offset;
        match steer_toward(
            self.pose.position,
            destination,
            dt,
            self.config.arrival_epsilon,
        ) {
            Steer::Arrived => {
                self.state.camera_target = None;
                self.fly.sync_from_pose(&self.pose);
                log::debug!("Fly-to arrived at {:?}", destination);
            }
            Steer::Moving(position) => {
                self.fly_to_look = converge(self.fly_to_look, target, dt * FLY_TO_LOOK_RATE);
                self.pose = CameraPose::look_at(position, self.fly_to_look);
                self.fly.sync_from_pose(&self.pose);
            }
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn enter(&mut self, phase: Phase) {
        if self.state.phase != phase {
            log::info!(
                "Tour phase {} -> {} (chapter {})",
                self.state.phase.label(),
                phase.label(),
                self.state.chapter_index
            );
        }
        self.state.enter(phase);
    }

    fn focus(&mut self, chapter: Option<usize>) {
        if self.state.active_chapter != chapter {
            self.free_quote_timer = 0.0;
        }
        self.state.set_active_chapter(chapter);
    }

    fn next_quote(&mut self) {
        let count = self.active_chapter().map_or(0, Chapter::quote_count);
        if count > 0 {
            self.state.quote_index = (self.state.quote_index + 1) % count;
        }
    }

    /// Start (or restart) the approach to `index`. Callers check bounds.
    fn begin_approach(&mut self, index: usize) {
        self.approach_look_from = self.pose.look_point();
        self.state.chapter_index = index;
        self.state.paused = false;
        self.state.camera_target = None;
        self.enter(Phase::Touring(SubPhase::Approach));
        self.focus(Some(index));
        self.state.quote_index = 0;
    }

    fn begin_outro(&mut self) {
        self.outro_from = self.pose.position;
        self.enter(Phase::Outro);
        self.focus(None);
    }

    /// Move to the next touring segment. Ignored outside the tour.
    pub fn advance_tour(&mut self) {
        match self.state.phase {
            Phase::Touring(SubPhase::Approach) => {
                self.enter(Phase::Touring(SubPhase::Dwell));
                self.state.quote_index = 0;
            }
            Phase::Touring(SubPhase::Dwell) => self.enter(Phase::Touring(SubPhase::Depart)),
            Phase::Touring(SubPhase::Depart) => {
                let next = self.state.chapter_index + 1;
                if next < self.registry.count() {
                    self.begin_approach(next);
                } else {
                    self.begin_outro();
                }
            }
            phase => log::debug!("advance_tour ignored during {}", phase.label()),
        }
    }

    fn pause_in_place(&mut self) {
        self.fly.sync_from_pose(&self.pose);
        self.fly.stop();
        self.state.paused = true;
        self.enter(Phase::FreeExplore);
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::PauseTour => self.pause_tour(),
            Action::ResumeTour => self.resume_tour(),
            Action::ResumeTourFromChapter(id) => self.resume_tour_from_chapter(id),
            Action::FlyToChapter(id) => self.fly_to_chapter(id),
        }
    }

    /// Interrupt the scripted tour and hand the camera to the user.
    ///
    /// Only the touring phase is interruptible.
    pub fn pause_tour(&mut self) {
        if !self.state.phase.is_touring() {
            log::debug!("pause ignored during {}", self.state.phase.label());
            return;
        }
        self.pause_in_place();
        self.notify();
    }

    /// Continue the tour with the chapter after the interrupted one.
    pub fn resume_tour(&mut self) {
        if self.state.phase != Phase::FreeExplore {
            log::debug!("resume ignored during {}", self.state.phase.label());
            return;
        }
        let last = self.registry.count() - 1;
        self.begin_approach((self.state.chapter_index + 1).min(last));
        self.notify();
    }

    /// Continue the tour from a specific chapter.
    pub fn resume_tour_from_chapter(&mut self, id: usize) {
        if self.state.phase != Phase::FreeExplore || self.registry.get(id).is_none() {
            log::debug!("resume from chapter {} ignored", id);
            return;
        }
        self.begin_approach(id);
        self.notify();
    }

    /// Fly the camera to a chapter. Unknown ids are ignored; a flight in
    /// progress is replaced.
    pub fn fly_to_chapter(&mut self, id: usize) {
        let Some(anchor) = self.registry.get(id).map(|c| c.anchor) else {
            log::debug!("fly-to unknown chapter {}", id);
            return;
        };
        match self.state.phase {
            Phase::Intro | Phase::Outro => {
                log::debug!("fly-to ignored during {}", self.state.phase.label());
                return;
            }
            Phase::Touring(_) => self.pause_in_place(),
            Phase::FreeExplore => {}
        }

        let reach = self.pose.position.distance(anchor).max(1.0);
        self.fly_to_look = self.pose.position + self.pose.forward() * reach;
        self.fly.stop();
        self.state.camera_target = Some(anchor);
        self.state.chapter_index = id;
        self.focus(Some(id));
        self.notify();
    }

    /// Put the free-flight camera somewhere. Only honoured while exploring
    /// without a fly-to in progress.
    pub fn place_camera(&mut self, pose: CameraPose) {
        if self.state.phase != Phase::FreeExplore || self.state.is_transitioning() {
            return;
        }
        self.fly.sync_from_pose(&pose);
        self.fly.stop();
        self.pose = self.fly.pose(pose.position);
    }
}

impl Default for TourDirector {
    fn default() -> Self {
        Self::build(ChapterRegistry::default(), TourConfig::default())
    }
}

/// Number of `interval` boundaries passed going from `prev` to `now`.
fn boundaries_crossed(prev: f32, now: f32, interval: f32) -> u32 {
    if now <= prev || interval <= 0.0 {
        return 0;
    }
    let before = ((prev.max(0.0) + PHASE_EPSILON) / interval).floor();
    let after = ((now + PHASE_EPSILON) / interval).floor();
    (after - before).max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    fn run_until(director: &mut TourDirector, phase: Phase) -> usize {
        let mut steps = 0;
        while director.state().phase != phase {
            director.step(DT, &idle());
            steps += 1;
            assert!(steps < 100_000, "never reached {:?}", phase);
        }
        steps
    }

    #[test]
    fn test_starts_in_intro() {
        let director = TourDirector::default();
        assert_eq!(director.state().phase, Phase::Intro);
        assert_eq!(director.state().active_chapter, None);
    }

    #[test]
    fn test_boundaries_crossed() {
        assert_eq!(boundaries_crossed(3.99, 4.01, 4.0), 1);
        assert_eq!(boundaries_crossed(0.0, 0.5, 4.0), 0);
        assert_eq!(boundaries_crossed(3.9, 8.1, 4.0), 2);
        assert_eq!(boundaries_crossed(1.0, 1.0, 4.0), 0);
    }

    #[test]
    fn test_intro_moves_toward_pre_tour_point() {
        let mut director = TourDirector::default();
        director.step(DT, &idle());
        let start = director.pose().position;
        for _ in 0..180 {
            director.step(DT, &idle());
        }
        let mid = director.pose().position;
        assert!(mid.distance(INTRO_END) < start.distance(INTRO_END));
        assert_eq!(director.pose().look_point(), Vec3::ZERO);
    }

    #[test]
    fn test_approach_ends_on_orbit() {
        let mut director = TourDirector::default();
        run_until(&mut director, Phase::Touring(SubPhase::Dwell));
        let orbit_start = director.registry().get(0).unwrap().orbit_sample(0.0);
        // The step that finished the approach rendered progress 1.
        assert!(director.pose().position.distance(orbit_start) < 0.1);
    }

    #[test]
    fn test_dwell_looks_at_anchor() {
        let mut director = TourDirector::default();
        run_until(&mut director, Phase::Touring(SubPhase::Dwell));
        director.step(DT, &idle());
        assert_eq!(director.pose().look_point(), Vec3::ZERO);
    }

    #[test]
    fn test_pause_outside_tour_is_noop() {
        let mut director = TourDirector::default();
        director.pause_tour();
        assert_eq!(director.state().phase, Phase::Intro);
        assert!(!director.state().paused);
    }

    #[test]
    fn test_advance_tour_outside_touring_is_noop() {
        let mut director = TourDirector::default();
        let before = director.state().clone();
        director.advance_tour();
        assert_eq!(director.state(), &before);
    }

    #[test]
    fn test_interrupt_ignored_during_intro() {
        let mut director = TourDirector::default();
        let input = FrameInput {
            interrupt: true,
            ..FrameInput::default()
        };
        director.step(DT, &input);
        assert_eq!(director.state().phase, Phase::Intro);
    }

    #[test]
    fn test_resume_advances_to_next_chapter() {
        let mut director = TourDirector::default();
        run_until(&mut director, Phase::Touring(SubPhase::Dwell));
        director.pause_tour();
        assert_eq!(director.state().phase, Phase::FreeExplore);
        assert!(director.state().paused);

        director.resume_tour();
        let state = director.state();
        assert_eq!(state.phase, Phase::Touring(SubPhase::Approach));
        assert_eq!(state.chapter_index, 1);
        assert_eq!(state.active_chapter, Some(1));
        assert_eq!(state.quote_index, 0);
        assert_eq!(state.phase_elapsed, 0.0);
        assert!(!state.paused);
    }

    #[test]
    fn test_resume_from_chapter_rejects_unknown_id() {
        let mut director = TourDirector::default();
        run_until(&mut director, Phase::Touring(SubPhase::Dwell));
        for _ in 0..300 {
            director.step(DT, &idle());
        }
        director.pause_tour();
        for _ in 0..30 {
            director.step(DT, &idle());
        }
        assert!(director.state().quote_index > 0);
        assert!(director.state().phase_elapsed > 0.0);

        director.resume_tour_from_chapter(42);
        assert_eq!(director.state().phase, Phase::FreeExplore);
        assert!(director.state().paused);

        director.resume_tour_from_chapter(3);
        let state = director.state();
        assert_eq!(state.phase, Phase::Touring(SubPhase::Approach));
        assert_eq!(state.chapter_index, 3);
        assert_eq!(state.active_chapter, Some(3));
        assert_eq!(state.phase_elapsed, 0.0);
        assert_eq!(state.quote_index, 0);
        assert!(!state.paused);
    }

    #[test]
    fn test_fly_to_from_touring_pauses_first() {
        let mut director = TourDirector::default();
        run_until(&mut director, Phase::Touring(SubPhase::Dwell));
        director.fly_to_chapter(2);
        let state = director.state();
        assert_eq!(state.phase, Phase::FreeExplore);
        assert!(state.paused);
        assert_eq!(state.camera_target, Some(Vec3::new(0.0, 0.0, -40.0)));
        assert_eq!(state.active_chapter, Some(2));
        assert_eq!(state.chapter_index, 2);
    }

    #[test]
    fn test_fly_to_ignored_in_intro() {
        let mut director = TourDirector::default();
        director.fly_to_chapter(1);
        assert_eq!(director.state().camera_target, None);
    }

    #[test]
    fn test_second_fly_to_replaces_target() {
        let mut director = TourDirector::default();
        run_until(&mut director, Phase::Touring(SubPhase::Approach));
        director.pause_tour();
        director.fly_to_chapter(1);
        director.step(DT, &idle());
        director.fly_to_chapter(4);
        assert_eq!(director.state().camera_target, Some(Vec3::new(-40.0, 0.0, 0.0)));
        assert_eq!(director.state().active_chapter, Some(4));
    }

    #[test]
    fn test_zero_dt_does_not_advance() {
        let mut director = TourDirector::default();
        for _ in 0..10 {
            director.step(DT, &idle());
        }
        let state = director.state().clone();
        let pose = *director.pose();
        director.step(0.0, &idle());
        director.step(-1.0, &idle());
        assert_eq!(director.state(), &state);
        assert_eq!(director.pose(), &pose);
    }

    #[test]
    fn test_large_dt_is_clamped() {
        let mut director = TourDirector::default();
        director.step(1000.0, &idle());
        assert_eq!(director.state().phase, Phase::Intro);
        assert!((director.state().phase_elapsed - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TourConfig {
            approach_duration: -1.0,
            ..TourConfig::default()
        };
        assert!(TourDirector::new(ChapterRegistry::default(), config).is_err());
    }

    #[test]
    fn test_free_explore_drag_turns_camera() {
        let mut director = TourDirector::default();
        run_until(&mut director, Phase::Touring(SubPhase::Approach));
        director.pause_tour();
        let yaw = director.free_fly().yaw;
        let input = FrameInput {
            look_delta: Vec2::new(100.0, 0.0),
            ..FrameInput::default()
        };
        director.step(DT, &input);
        assert!((director.free_fly().yaw - (yaw - 0.3)).abs() < 1e-5);
    }

    #[test]
    fn test_free_explore_proximity_activation() {
        let mut director = TourDirector::default();
        run_until(&mut director, Phase::Touring(SubPhase::Approach));
        director.pause_tour();
        director.place_camera(CameraPose::look_at(
            Vec3::new(40.0, 0.0, 10.0),
            Vec3::new(40.0, 0.0, 0.0),
        ));
        director.step(DT, &idle());
        assert_eq!(director.state().active_chapter, Some(1));

        director.place_camera(CameraPose::look_at(Vec3::new(0.0, 200.0, 0.0), Vec3::ZERO));
        director.step(DT, &idle());
        assert_eq!(director.state().active_chapter, None);
    }

    #[test]
    fn test_free_explore_quote_cycle() {
        let mut director = TourDirector::default();
        run_until(&mut director, Phase::Touring(SubPhase::Approach));
        director.pause_tour();
        director.place_camera(CameraPose::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO));
        director.step(DT, &idle());
        assert_eq!(director.state().active_chapter, Some(0));
        let q = director.state().quote_index;
        for _ in 0..(5 * 60 + 5) {
            director.step(DT, &idle());
        }
        assert_eq!(director.state().quote_index, (q + 1) % 4);
    }

    #[test]
    fn test_action_json() {
        let a: Action =
            serde_json::from_str(r#"{ "type": "flyToChapter", "chapter": 3 }"#).unwrap();
        assert_eq!(a, Action::FlyToChapter(3));
        let a: Action = serde_json::from_str(r#"{ "type": "resumeTour" }"#).unwrap();
        assert_eq!(a, Action::ResumeTour);
    }
}
