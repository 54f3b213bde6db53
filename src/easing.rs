//! Easing and blending helpers shared by the scripted camera segments.

use glam::Vec3;

/// Canonical cubic ease-in-out on `t ∈ [0, 1]`.
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Progress of `elapsed` through a segment of `duration`, clamped to `[0, 1]`.
///
/// A non-positive duration reads as already complete.
pub fn progress(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    (elapsed / duration).clamp(0.0, 1.0)
}

/// Eased progress, the blend weight every scripted segment uses.
pub fn eased_progress(elapsed: f32, duration: f32) -> f32 {
    ease_in_out_cubic(progress(elapsed, duration))
}

/// Look-at blend weight during an approach: the target swings onto the
/// chapter faster than the camera moves.
pub fn approach_look_weight(eased: f32) -> f32 {
    0.2 + 0.8 * eased
}

/// Move `from` toward `to` with a frame-rate scaled exponential approach.
pub fn converge(from: Vec3, to: Vec3, rate: f32) -> Vec3 {
    from.lerp(to, rate.clamp(0.0, 1.0))
}
