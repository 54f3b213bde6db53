//! Tour timing and control constants.
//!
//! The constants are the shipped defaults. `TourConfig` bundles them so a
//! director can be built (and validated) once before the render loop starts.

use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// Defaults
// ============================================================================

/// Seconds spent on the opening descent before the first chapter.
pub const INTRO_DURATION: f32 = 6.0;
/// Seconds to glide from a chapter's approach point onto its orbit.
pub const APPROACH_DURATION: f32 = 3.0;
/// Seconds spent orbiting a chapter.
pub const DWELL_DURATION: f32 = 10.0;
/// Seconds to leave a chapter for the next approach point.
pub const DEPART_DURATION: f32 = 2.5;
/// Seconds of the closing pull-back.
pub const OUTRO_DURATION: f32 = 8.0;

/// Radius within which a chapter becomes active during free exploration.
pub const ACTIVATION_DISTANCE: f32 = 25.0;

/// Free-fly acceleration (units/s² applied per frame as `speed * dt`).
pub const FLY_SPEED: f32 = 20.0;
/// Per-frame velocity damping factor.
pub const FLY_DAMPING: f32 = 0.92;
/// Joystick deadzone on normalised axes.
pub const INPUT_DEADZONE: f32 = 0.12;
/// Radians of yaw/pitch per pixel of drag.
pub const LOOK_SENSITIVITY: f32 = 0.003;
/// Free-fly pitch clamp (±60°).
pub const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_3;

/// Upper bound on a single frame step.
pub const MAX_FRAME_DT: f32 = 0.1;

/// Dwell seconds between quote advances.
pub const QUOTE_INTERVAL: f32 = 4.0;
/// Free-explore seconds between quote advances while a chapter stays active.
pub const FREE_EXPLORE_QUOTE_INTERVAL: f32 = 5.0;

/// Where a fly-to settles relative to the chapter anchor.
pub const FLY_TO_OFFSET: Vec3 = Vec3::new(0.0, 3.0, 12.0);
/// Fly-to completes once the camera is this close to its destination.
pub const ARRIVAL_EPSILON: f32 = 1.0;

/// Tolerance on phase thresholds, absorbs float drift in summed frame steps.
pub const PHASE_EPSILON: f32 = 1e-3;

/// Camera waypoints outside any chapter.
pub const INTRO_START: Vec3 = Vec3::new(0.0, 60.0, 120.0);
pub const INTRO_END: Vec3 = Vec3::new(0.0, 12.0, 45.0);
pub const TOUR_PULLBACK: Vec3 = Vec3::new(0.0, 20.0, 70.0);
pub const OUTRO_POINT: Vec3 = Vec3::new(0.0, 45.0, 130.0);

// ============================================================================
// TourConfig
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a positive number of seconds, got {value}")]
    NonPositiveDuration { name: &'static str, value: f32 },

    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    #[error("fly damping must lie in (0, 1), got {0}")]
    Damping(f32),

    #[error("input deadzone must lie in [0, 1), got {0}")]
    Deadzone(f32),
}

/// Runtime copy of the tour constants.
///
/// Deserialises from camelCase JSON with every field optional, so an override
/// file only needs the values it changes.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TourConfig {
    pub intro_duration: f32,
    pub approach_duration: f32,
    pub dwell_duration: f32,
    pub depart_duration: f32,
    pub outro_duration: f32,
    pub activation_distance: f32,
    pub fly_speed: f32,
    pub fly_damping: f32,
    pub input_deadzone: f32,
    pub look_sensitivity: f32,
    pub pitch_limit: f32,
    pub max_frame_dt: f32,
    pub quote_interval: f32,
    pub free_explore_quote_interval: f32,
    pub fly_to_offset: Vec3,
    pub arrival_epsilon: f32,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            intro_duration: INTRO_DURATION,
            approach_duration: APPROACH_DURATION,
            dwell_duration: DWELL_DURATION,
            depart_duration: DEPART_DURATION,
            outro_duration: OUTRO_DURATION,
            activation_distance: ACTIVATION_DISTANCE,
            fly_speed: FLY_SPEED,
            fly_damping: FLY_DAMPING,
            input_deadzone: INPUT_DEADZONE,
            look_sensitivity: LOOK_SENSITIVITY,
            pitch_limit: PITCH_LIMIT,
            max_frame_dt: MAX_FRAME_DT,
            quote_interval: QUOTE_INTERVAL,
            free_explore_quote_interval: FREE_EXPLORE_QUOTE_INTERVAL,
            fly_to_offset: FLY_TO_OFFSET,
            arrival_epsilon: ARRIVAL_EPSILON,
        }
    }
}

impl TourConfig {
    /// Reject configurations that would stall or divide by zero at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("intro duration", self.intro_duration),
            ("approach duration", self.approach_duration),
            ("dwell duration", self.dwell_duration),
            ("depart duration", self.depart_duration),
            ("outro duration", self.outro_duration),
            ("quote interval", self.quote_interval),
            ("free-explore quote interval", self.free_explore_quote_interval),
        ];
        for (name, value) in durations {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveDuration { name, value });
            }
        }

        let positives = [
            ("activation distance", self.activation_distance),
            ("fly speed", self.fly_speed),
            ("look sensitivity", self.look_sensitivity),
            ("pitch limit", self.pitch_limit),
            ("max frame dt", self.max_frame_dt),
            ("arrival epsilon", self.arrival_epsilon),
        ];
        for (name, value) in positives {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        if !(self.fly_damping > 0.0 && self.fly_damping < 1.0) {
            return Err(ConfigError::Damping(self.fly_damping));
        }
        if !(self.input_deadzone >= 0.0 && self.input_deadzone < 1.0) {
            return Err(ConfigError::Deadzone(self.input_deadzone));
        }
        Ok(())
    }

    /// Clamp a raw frame delta into `[0, max_frame_dt]`. NaN maps to zero.
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if dt.is_nan() || dt <= 0.0 {
            0.0
        } else {
            dt.min(self.max_frame_dt)
        }
    }
}
