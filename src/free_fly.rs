//! Free-flight controller.
//!
//! Holds the state that must survive phase changes: velocity and the yaw/pitch
//! the user steers with. The director resyncs the angles whenever control is
//! handed over from a scripted or look-at camera so the view never jumps.

use glam::{Vec2, Vec3};

use crate::camera::{forward_from_yaw_pitch, right_from_yaw, CameraPose};

/// Minimum fly-to speed in units per second, so the last stretch terminates.
const MIN_FLY_TO_SPEED: f32 = 2.0;
/// Fly-to speed per unit of remaining distance.
const FLY_TO_GAIN: f32 = 3.0;

#[derive(Clone, Debug, PartialEq)]
pub struct FreeFlyController {
    pub velocity: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for FreeFlyController {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            yaw: 0.0,
            pitch: -0.1,
        }
    }
}

impl FreeFlyController {
    /// Adopt the view direction of `pose`.
    pub fn sync_from_pose(&mut self, pose: &CameraPose) {
        let (yaw, pitch) = pose.yaw_pitch();
        self.yaw = yaw;
        self.pitch = pitch;
    }

    /// Turn by a pixel drag. Dragging right turns right, dragging down looks down.
    pub fn apply_look(&mut self, delta: Vec2, sensitivity: f32, pitch_limit: f32) {
        if delta == Vec2::ZERO {
            return;
        }
        self.yaw -= delta.x * sensitivity;
        self.pitch = (self.pitch - delta.y * sensitivity).clamp(-pitch_limit, pitch_limit);
    }

    pub fn forward(&self) -> Vec3 {
        forward_from_yaw_pitch(self.yaw, self.pitch)
    }

    /// One step of the damped fly model; returns the new position.
    ///
    /// `intent` is (strafe, vertical, forward). Damping is applied per frame.
    pub fn integrate(
        &mut self,
        position: Vec3,
        intent: Vec3,
        dt: f32,
        speed: f32,
        damping: f32,
    ) -> Vec3 {
        let accel =
            self.forward() * intent.z + right_from_yaw(self.yaw) * intent.x + Vec3::Y * intent.y;
        if accel.length_squared() > 0.0 {
            self.velocity += accel.normalize() * speed * dt;
        }
        self.velocity *= damping;
        position + self.velocity
    }

    pub fn pose(&self, position: Vec3) -> CameraPose {
        CameraPose::euler(position, self.yaw, self.pitch)
    }

    pub fn stop(&mut self) {
        self.velocity = Vec3::ZERO;
    }
}

/// Result of one fly-to steering step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Steer {
    Moving(Vec3),
    Arrived,
}

/// Move `position` toward `destination` at a speed proportional to the
/// remaining distance, never slower than the floor and never overshooting.
pub fn steer_toward(position: Vec3, destination: Vec3, dt: f32, arrival_epsilon: f32) -> Steer {
    let to_dest = destination - position;
    let dist = to_dest.length();
    if dist < arrival_epsilon {
        return Steer::Arrived;
    }
    let step = (MIN_FLY_TO_SPEED.max(dist * FLY_TO_GAIN) * dt).min(dist);
    Steer::Moving(position + to_dest / dist * step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_intent_moves_along_view() {
        let mut fly = FreeFlyController {
            pitch: 0.0,
            ..FreeFlyController::default()
        };
        let p = fly.integrate(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), 0.1, 20.0, 0.92);
        assert!(p.z < 0.0);
        assert!(p.x.abs() < 1e-6 && p.y.abs() < 1e-6);
    }

    #[test]
    fn test_velocity_decays_without_input() {
        let mut fly = FreeFlyController {
            velocity: Vec3::new(1.0, 0.0, 0.0),
            ..FreeFlyController::default()
        };
        let mut p = Vec3::ZERO;
        for _ in 0..200 {
            p = fly.integrate(p, Vec3::ZERO, 1.0 / 60.0, 20.0, 0.92);
        }
        assert!(fly.velocity.length() < 1e-6);
        // Geometric series 0.92 / (1 - 0.92) = 11.5.
        assert!((p.x - 11.5).abs() < 1e-3);
    }

    #[test]
    fn test_diagonal_input_is_normalised() {
        let mut a = FreeFlyController {
            pitch: 0.0,
            ..FreeFlyController::default()
        };
        let mut b = a.clone();
        a.integrate(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0), 0.1, 20.0, 0.92);
        b.integrate(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), 0.1, 20.0, 0.92);
        assert!((a.velocity.length() - b.velocity.length()).abs() < 1e-5);
    }

    #[test]
    fn test_pitch_clamped() {
        let mut fly = FreeFlyController::default();
        fly.apply_look(Vec2::new(0.0, -10_000.0), 0.003, std::f32::consts::FRAC_PI_3);
        assert!((fly.pitch - std::f32::consts::FRAC_PI_3).abs() < 1e-6);
    }

    #[test]
    fn test_sync_reproduces_pose_direction() {
        let pose = CameraPose::look_at(Vec3::new(14.0, 4.0, 3.0), Vec3::ZERO);
        let mut fly = FreeFlyController::default();
        fly.sync_from_pose(&pose);
        assert!((fly.forward() - pose.forward()).length() < 1e-5);
    }

    #[test]
    fn test_steer_terminates() {
        let dest = Vec3::new(0.0, 3.0, 12.0);
        let mut p = Vec3::new(0.0, 3.0, 62.0);
        let mut steps = 0;
        loop {
            match steer_toward(p, dest, 1.0 / 60.0, 1.0) {
                Steer::Arrived => break,
                Steer::Moving(next) => p = next,
            }
            steps += 1;
            assert!(steps < 10_000);
        }
        assert!(p.distance(dest) < 1.0);
    }
}
