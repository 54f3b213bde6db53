//! Camera pose and the pose publisher.
//!
//! The director produces a `CameraPose` every frame. A pose aims the camera
//! either at a point (scripted segments and fly-to) or by yaw/pitch angles
//! (free flight). Publishers turn the pose into whatever the renderer wants;
//! `CameraUniforms` is the GPU-ready form.
//!
//! Angle convention: yaw/pitch rotate the default view direction `-Z` in YXZ
//! order, so yaw 0 / pitch 0 looks down `-Z` and positive pitch looks up.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

// ============================================================================
// Pose
// ============================================================================

/// How the camera is oriented.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Aim {
    /// Look at a world-space point.
    LookAt(Vec3),
    /// Yaw/pitch in radians, no roll.
    Euler { yaw: f32, pitch: f32 },
}

/// Camera position plus orientation for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub aim: Aim,
}

impl CameraPose {
    pub fn look_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            aim: Aim::LookAt(target),
        }
    }

    pub fn euler(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            aim: Aim::Euler { yaw, pitch },
        }
    }

    /// Unit view direction. A look-at target on top of the camera falls back
    /// to `-Z`.
    pub fn forward(&self) -> Vec3 {
        match self.aim {
            Aim::LookAt(target) => (target - self.position)
                .try_normalize()
                .unwrap_or(Vec3::NEG_Z),
            Aim::Euler { yaw, pitch } => forward_from_yaw_pitch(yaw, pitch),
        }
    }

    /// A point the camera is looking at.
    ///
    /// Euler poses report the point one unit ahead.
    pub fn look_point(&self) -> Vec3 {
        match self.aim {
            Aim::LookAt(target) => target,
            Aim::Euler { .. } => self.position + self.forward(),
        }
    }

    /// Yaw/pitch reproducing this pose's view direction.
    pub fn yaw_pitch(&self) -> (f32, f32) {
        match self.aim {
            Aim::Euler { yaw, pitch } => (yaw, pitch),
            Aim::LookAt(_) => yaw_pitch_from_forward(self.forward()),
        }
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 5.0, 30.0), Vec3::ZERO)
    }
}

/// View direction for the given yaw/pitch.
pub fn forward_from_yaw_pitch(yaw: f32, pitch: f32) -> Vec3 {
    Vec3::new(
        -yaw.sin() * pitch.cos(),
        pitch.sin(),
        -yaw.cos() * pitch.cos(),
    )
}

/// Horizontal right vector for a yaw (ignores pitch).
pub fn right_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.cos(), 0.0, -yaw.sin())
}

/// Inverse of `forward_from_yaw_pitch` for a unit direction.
pub fn yaw_pitch_from_forward(forward: Vec3) -> (f32, f32) {
    let pitch = forward.y.clamp(-1.0, 1.0).asin();
    let yaw = (-forward.x).atan2(-forward.z);
    (yaw, pitch)
}

// ============================================================================
// Publishing
// ============================================================================

/// Receives the settled pose once per frame.
pub trait PosePublisher {
    fn publish(&mut self, pose: &CameraPose);
}

/// Evaluated camera parameters ready for the GPU.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct CameraUniforms {
    /// Camera position in world space (vec4, w unused).
    pub position: [f32; 4],

    /// (pitch, yaw, roll) in radians (vec4, w unused).
    pub rotation: [f32; 4],

    /// Look-at target (vec4, w unused). Euler poses store the point one unit
    /// ahead so the view matrix is always a look-at.
    pub target: [f32; 4],

    /// Up vector (vec4, w unused).
    pub up: [f32; 4],

    /// Field of view in degrees.
    pub fov: f32,

    pub near: f32,

    pub far: f32,

    /// Camera mode: 0 = Euler, 1 = LookAt.
    pub mode: u32,
}

impl CameraUniforms {
    /// Defaults matching the experience's perspective camera.
    pub fn new() -> Self {
        let mut uniforms = Self {
            up: [0.0, 1.0, 0.0, 0.0],
            fov: 60.0,
            near: 0.1,
            far: 500.0,
            ..Self::default()
        };
        uniforms.apply(&CameraPose::default());
        uniforms
    }

    fn apply(&mut self, pose: &CameraPose) {
        let p = pose.position;
        let t = pose.look_point();
        let (yaw, pitch) = pose.yaw_pitch();
        self.position = [p.x, p.y, p.z, 1.0];
        self.target = [t.x, t.y, t.z, 1.0];
        self.rotation = [pitch, yaw, 0.0, 0.0];
        self.mode = match pose.aim {
            Aim::Euler { .. } => 0,
            Aim::LookAt(_) => 1,
        };
    }

    pub fn position_vec3(&self) -> Vec3 {
        Vec3::new(self.position[0], self.position[1], self.position[2])
    }

    pub fn target_vec3(&self) -> Vec3 {
        Vec3::new(self.target[0], self.target[1], self.target[2])
    }

    pub fn up_vec3(&self) -> Vec3 {
        Vec3::new(self.up[0], self.up[1], self.up[2])
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position_vec3(), self.target_vec3(), self.up_vec3())
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

impl PosePublisher for CameraUniforms {
    fn publish(&mut self, pose: &CameraPose) {
        self.apply(pose);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_zero_angles_look_down_negative_z() {
        assert!(approx(forward_from_yaw_pitch(0.0, 0.0), Vec3::NEG_Z));
        assert!(approx(right_from_yaw(0.0), Vec3::X));
    }

    #[test]
    fn test_yaw_pitch_roundtrip() {
        for &(yaw, pitch) in &[(0.3, -0.2), (-2.5, 0.9), (3.0, 0.0), (1.2, -1.0)] {
            let f = forward_from_yaw_pitch(yaw, pitch);
            let (y2, p2) = yaw_pitch_from_forward(f);
            assert!(approx(forward_from_yaw_pitch(y2, p2), f));
        }
    }

    #[test]
    fn test_look_at_pose_yaw_pitch_matches_direction() {
        let pose = CameraPose::look_at(Vec3::new(3.0, 4.0, 10.0), Vec3::new(-2.0, 0.0, 1.0));
        let (yaw, pitch) = pose.yaw_pitch();
        assert!(approx(forward_from_yaw_pitch(yaw, pitch), pose.forward()));
    }

    #[test]
    fn test_degenerate_look_at_falls_back() {
        let pose = CameraPose::look_at(Vec3::ONE, Vec3::ONE);
        assert_eq!(pose.forward(), Vec3::NEG_Z);
    }

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 80);
    }

    #[test]
    fn test_publish_euler_pose() {
        let mut uniforms = CameraUniforms::new();
        uniforms.publish(&CameraPose::euler(Vec3::new(1.0, 2.0, 3.0), 0.0, 0.0));
        assert_eq!(uniforms.mode, 0);
        assert!(approx(uniforms.target_vec3(), Vec3::new(1.0, 2.0, 2.0)));
    }

    #[test]
    fn test_view_matrix_puts_target_in_front() {
        let mut uniforms = CameraUniforms::new();
        uniforms.publish(&CameraPose::look_at(Vec3::new(5.0, 5.0, 5.0), Vec3::ZERO));
        let origin_in_view = uniforms.view_matrix().transform_point3(Vec3::ZERO);
        assert!(origin_in_view.z < 0.0);
    }
}
