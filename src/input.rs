//! Input aggregation.
//!
//! Raw key/pointer/touch events are folded into two logical vectors: a move
//! intent (strafe, vertical, forward in `[-1, 1]`) and a look delta in pixels
//! accumulated until the next frame reads it. Listeners may fire at any time;
//! the director reads once per frame through `sample()`.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use parking_lot::Mutex;
use serde::Deserialize;

use crate::config::INPUT_DEADZONE;

/// Radius of the on-screen move joystick, in pixels.
pub const JOYSTICK_RADIUS: f32 = 56.0;

// ============================================================================
// Events
// ============================================================================

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TouchKind {
    Start,
    Move,
    End,
    Cancel,
}

/// A raw device event, in device pixels.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    Key {
        code: String,
        down: bool,
    },
    Pointer {
        kind: PointerKind,
        x: f32,
        y: f32,
        #[serde(default)]
        button: u8,
    },
    Touch {
        kind: TouchKind,
        id: u64,
        x: f32,
        y: f32,
    },
}

/// Movement keys the free-fly controller understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKey {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl MoveKey {
    /// Map a key code (`"w"`, `"ArrowUp"`, `" "`, ...) case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "w" | "keyw" | "arrowup" => Some(Self::Forward),
            "s" | "keys" | "arrowdown" => Some(Self::Back),
            "a" | "keya" | "arrowleft" => Some(Self::Left),
            "d" | "keyd" | "arrowright" => Some(Self::Right),
            "e" | "keye" | " " | "space" => Some(Self::Up),
            "q" | "keyq" | "shift" | "shiftleft" | "shiftright" => Some(Self::Down),
            _ => None,
        }
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// What the director sees of the input in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// (strafe, vertical, forward), each in `[-1, 1]`.
    pub move_intent: Vec3,
    /// Pixels dragged since the previous sample.
    pub look_delta: Vec2,
    /// A move key, pointer press or touch began since the previous sample.
    pub interrupt: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct KeyState {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl KeyState {
    fn set(&mut self, key: MoveKey, down: bool) {
        match key {
            MoveKey::Forward => self.forward = down,
            MoveKey::Back => self.back = down,
            MoveKey::Left => self.left = down,
            MoveKey::Right => self.right = down,
            MoveKey::Up => self.up = down,
            MoveKey::Down => self.down = down,
        }
    }

    fn axis(pos: bool, neg: bool) -> f32 {
        (pos as i32 - neg as i32) as f32
    }
}

#[derive(Clone, Copy, Debug)]
struct TrackedTouch {
    id: u64,
    anchor: Vec2,
}

#[derive(Debug)]
pub struct InputAggregator {
    keys: KeyState,
    joystick: Vec2,
    look: Vec2,
    interrupt: bool,
    deadzone: f32,
    viewport_width: f32,
    drag_from: Option<Vec2>,
    move_touch: Option<TrackedTouch>,
    look_touch: Option<TrackedTouch>,
    /// Track drags and touches. Off while the camera is scripted.
    capture: bool,
}

impl Default for InputAggregator {
    fn default() -> Self {
        Self::new(INPUT_DEADZONE)
    }
}

impl InputAggregator {
    pub fn new(deadzone: f32) -> Self {
        Self {
            keys: KeyState::default(),
            joystick: Vec2::ZERO,
            look: Vec2::ZERO,
            interrupt: false,
            deadzone,
            viewport_width: 1280.0,
            drag_from: None,
            move_touch: None,
            look_touch: None,
            capture: true,
        }
    }

    /// Width used to split touches between the move and look halves.
    pub fn set_viewport_width(&mut self, width: f32) {
        if width > 0.0 {
            self.viewport_width = width;
        }
    }

    /// Enable or disable drag and touch tracking. While disabled a press only
    /// raises the interrupt flag; disabling drops anything already tracked.
    pub fn set_capture(&mut self, capture: bool) {
        if !capture {
            self.drag_from = None;
            self.move_touch = None;
            self.look_touch = None;
            self.joystick = Vec2::ZERO;
            self.look = Vec2::ZERO;
        }
        self.capture = capture;
    }

    pub fn is_capturing(&self) -> bool {
        self.capture
    }

    /// Fold one raw event into the aggregate.
    pub fn handle(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::Key { ref code, down } => self.record_key(code, down),
            InputEvent::Pointer { kind, x, y, button } => {
                let at = Vec2::new(x, y);
                match kind {
                    PointerKind::Down => {
                        if button == 0 || button == 2 {
                            self.interrupt = true;
                            if self.capture {
                                self.drag_from = Some(at);
                            }
                        }
                    }
                    PointerKind::Move => {
                        if let Some(from) = self.drag_from {
                            let d = at - from;
                            self.record_pointer_drag(d.x, d.y);
                            self.drag_from = Some(at);
                        }
                    }
                    PointerKind::Up => self.drag_from = None,
                }
            }
            InputEvent::Touch { kind, id, x, y } => self.handle_touch(kind, id, Vec2::new(x, y)),
        }
    }

    fn handle_touch(&mut self, kind: TouchKind, id: u64, at: Vec2) {
        match kind {
            TouchKind::Start => {
                self.interrupt = true;
                if !self.capture {
                    return;
                }
                let left_half = at.x < self.viewport_width / 2.0;
                if left_half && self.move_touch.is_none() {
                    self.move_touch = Some(TrackedTouch { id, anchor: at });
                    self.joystick = Vec2::ZERO;
                } else if !left_half && self.look_touch.is_none() {
                    self.look_touch = Some(TrackedTouch { id, anchor: at });
                }
            }
            TouchKind::Move => {
                if let Some(touch) = self.move_touch.filter(|t| t.id == id) {
                    let d = at - touch.anchor;
                    self.record_touch_joystick(d.x, d.y, JOYSTICK_RADIUS);
                }
                if let Some(touch) = self.look_touch.filter(|t| t.id == id) {
                    let d = at - touch.anchor;
                    self.record_pointer_drag(d.x, d.y);
                    self.look_touch = Some(TrackedTouch { id, anchor: at });
                }
            }
            TouchKind::End | TouchKind::Cancel => {
                if self.move_touch.is_some_and(|t| t.id == id) {
                    self.move_touch = None;
                    self.joystick = Vec2::ZERO;
                }
                if self.look_touch.is_some_and(|t| t.id == id) {
                    self.look_touch = None;
                    self.look = Vec2::ZERO;
                }
            }
        }
    }

    /// Key transition. Last write wins per key.
    pub fn record_key(&mut self, code: &str, down: bool) {
        if let Some(key) = MoveKey::from_code(code) {
            self.keys.set(key, down);
            if down {
                self.interrupt = true;
            }
        }
    }

    /// Accumulate a look drag in pixels.
    pub fn record_pointer_drag(&mut self, dx: f32, dy: f32) {
        if dx.is_finite() && dy.is_finite() {
            self.look += Vec2::new(dx, dy);
        }
    }

    /// Joystick thumb offset from its centre; clamped to `radius`.
    pub fn record_touch_joystick(&mut self, dx: f32, dy: f32, radius: f32) {
        if radius <= 0.0 || !dx.is_finite() || !dy.is_finite() {
            return;
        }
        let offset = Vec2::new(dx, dy).clamp_length_max(radius) / radius;
        self.joystick = Vec2::new(self.apply_deadzone(offset.x), self.apply_deadzone(offset.y));
    }

    fn apply_deadzone(&self, v: f32) -> f32 {
        if v.abs() > self.deadzone {
            v.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }

    /// Current move intent. Non-destructive.
    pub fn current_move_intent(&self) -> Vec3 {
        let k = &self.keys;
        // Screen-space joystick: dragging up (negative y) flies forward.
        let x = KeyState::axis(k.right, k.left) + self.joystick.x;
        let y = KeyState::axis(k.up, k.down);
        let z = KeyState::axis(k.forward, k.back) - self.joystick.y;
        Vec3::new(
            self.apply_deadzone(x),
            self.apply_deadzone(y),
            self.apply_deadzone(z),
        )
    }

    /// Return and clear the accumulated look delta.
    pub fn sample_and_reset_look(&mut self) -> Vec2 {
        std::mem::take(&mut self.look)
    }

    /// Return and clear the interrupt flag.
    pub fn take_interrupt(&mut self) -> bool {
        std::mem::take(&mut self.interrupt)
    }

    /// The once-per-frame read.
    pub fn sample(&mut self) -> FrameInput {
        FrameInput {
            move_intent: self.current_move_intent(),
            look_delta: self.sample_and_reset_look(),
            interrupt: self.take_interrupt(),
        }
    }

    /// Drop every held key, touch and pending delta.
    pub fn reset(&mut self) {
        *self = Self {
            deadzone: self.deadzone,
            viewport_width: self.viewport_width,
            capture: self.capture,
            ..Self::new(self.deadzone)
        };
    }
}

/// Cloneable handle for listeners running outside the frame callback.
#[derive(Clone, Debug, Default)]
pub struct SharedInput {
    inner: Arc<Mutex<InputAggregator>>,
}

impl SharedInput {
    pub fn new(aggregator: InputAggregator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(aggregator)),
        }
    }

    pub fn handle(&self, event: &InputEvent) {
        self.inner.lock().handle(event);
    }

    pub fn sample(&self) -> FrameInput {
        self.inner.lock().sample()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    /// Run `f` with the aggregator locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut InputAggregator) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: &str, down: bool) -> InputEvent {
        InputEvent::Key {
            code: code.to_string(),
            down,
        }
    }

    fn pointer(kind: PointerKind, x: f32, y: f32) -> InputEvent {
        InputEvent::Pointer {
            kind,
            x,
            y,
            button: 0,
        }
    }

    fn touch(kind: TouchKind, id: u64, x: f32, y: f32) -> InputEvent {
        InputEvent::Touch { kind, id, x, y }
    }

    #[test]
    fn test_keys_drive_axes() {
        let mut input = InputAggregator::default();
        input.handle(&key("W", true));
        input.handle(&key("d", true));
        input.handle(&key(" ", true));
        assert_eq!(input.current_move_intent(), Vec3::new(1.0, 1.0, 1.0));
        input.handle(&key("w", false));
        input.handle(&key("ArrowDown", true));
        assert_eq!(input.current_move_intent(), Vec3::new(1.0, 1.0, -1.0));
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let mut input = InputAggregator::default();
        input.record_key("a", true);
        input.record_key("d", true);
        assert_eq!(input.current_move_intent().x, 0.0);
    }

    #[test]
    fn test_move_key_sets_interrupt_once() {
        let mut input = InputAggregator::default();
        input.record_key("w", true);
        assert!(input.sample().interrupt);
        assert!(!input.sample().interrupt);
        // Move intent survives the sample.
        assert_eq!(input.sample().move_intent.z, 1.0);
    }

    #[test]
    fn test_unmapped_key_ignored() {
        let mut input = InputAggregator::default();
        input.record_key("Escape", true);
        assert!(!input.take_interrupt());
        assert_eq!(input.current_move_intent(), Vec3::ZERO);
    }

    #[test]
    fn test_look_accumulates_until_read() {
        let mut input = InputAggregator::default();
        input.record_pointer_drag(3.0, -1.0);
        input.record_pointer_drag(2.0, 4.0);
        assert_eq!(input.sample_and_reset_look(), Vec2::new(5.0, 3.0));
        assert_eq!(input.sample_and_reset_look(), Vec2::ZERO);
    }

    #[test]
    fn test_pointer_drag_only_while_pressed() {
        let mut input = InputAggregator::default();
        input.handle(&pointer(PointerKind::Move, 10.0, 10.0));
        assert_eq!(input.sample().look_delta, Vec2::ZERO);

        input.handle(&pointer(PointerKind::Down, 10.0, 10.0));
        input.handle(&pointer(PointerKind::Move, 14.0, 7.0));
        input.handle(&pointer(PointerKind::Move, 15.0, 7.0));
        let frame = input.sample();
        assert!(frame.interrupt);
        assert_eq!(frame.look_delta, Vec2::new(5.0, -3.0));

        input.handle(&pointer(PointerKind::Up, 15.0, 7.0));
        input.handle(&pointer(PointerKind::Move, 30.0, 7.0));
        assert_eq!(input.sample().look_delta, Vec2::ZERO);
    }

    #[test]
    fn test_joystick_deadzone_and_clamp() {
        let mut input = InputAggregator::default();
        input.record_touch_joystick(5.0, 0.0, JOYSTICK_RADIUS);
        assert_eq!(input.current_move_intent(), Vec3::ZERO);

        input.record_touch_joystick(200.0, 0.0, JOYSTICK_RADIUS);
        assert!((input.current_move_intent().x - 1.0).abs() < 1e-6);

        input.record_touch_joystick(0.0, -28.0, JOYSTICK_RADIUS);
        assert!((input.current_move_intent().z - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_touch_halves() {
        let mut input = InputAggregator::default();
        input.set_viewport_width(1000.0);
        input.handle(&touch(TouchKind::Start, 1, 100.0, 500.0));
        input.handle(&touch(TouchKind::Start, 2, 900.0, 500.0));
        input.handle(&touch(TouchKind::Move, 1, 100.0, 444.0));
        input.handle(&touch(TouchKind::Move, 2, 910.0, 495.0));

        let frame = input.sample();
        assert!(frame.interrupt);
        assert!((frame.move_intent.z - 1.0).abs() < 1e-6);
        assert_eq!(frame.look_delta, Vec2::new(10.0, -5.0));

        input.handle(&touch(TouchKind::End, 1, 100.0, 444.0));
        assert_eq!(input.current_move_intent(), Vec3::ZERO);
    }

    #[test]
    fn test_presses_without_capture_only_interrupt() {
        let mut input = InputAggregator::default();
        input.set_viewport_width(1000.0);
        input.set_capture(false);

        input.handle(&touch(TouchKind::Start, 1, 100.0, 500.0));
        input.handle(&touch(TouchKind::Move, 1, 100.0, 444.0));
        input.handle(&pointer(PointerKind::Down, 600.0, 300.0));
        input.handle(&pointer(PointerKind::Move, 650.0, 300.0));
        let frame = input.sample();
        assert!(frame.interrupt);
        assert_eq!(frame.move_intent, Vec3::ZERO);
        assert_eq!(frame.look_delta, Vec2::ZERO);

        // The finger that interrupted is not adopted once capture resumes.
        input.set_capture(true);
        input.handle(&touch(TouchKind::Move, 1, 100.0, 400.0));
        assert_eq!(input.current_move_intent(), Vec3::ZERO);
    }

    #[test]
    fn test_disabling_capture_drops_tracked_touches() {
        let mut input = InputAggregator::default();
        input.set_viewport_width(1000.0);
        input.handle(&touch(TouchKind::Start, 1, 100.0, 500.0));
        input.handle(&touch(TouchKind::Move, 1, 100.0, 444.0));
        assert!(input.current_move_intent().z > 0.0);

        input.set_capture(false);
        assert!(!input.is_capturing());
        assert_eq!(input.current_move_intent(), Vec3::ZERO);
        input.handle(&touch(TouchKind::Move, 1, 100.0, 444.0));
        assert_eq!(input.current_move_intent(), Vec3::ZERO);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut input = InputAggregator::new(0.2);
        input.record_key("w", true);
        input.record_pointer_drag(1.0, 1.0);
        input.reset();
        assert_eq!(input.sample(), FrameInput::default());
        input.record_touch_joystick(10.0, 0.0, JOYSTICK_RADIUS);
        assert_eq!(input.current_move_intent(), Vec3::ZERO);
    }

    #[test]
    fn test_shared_input_from_threads() {
        let shared = SharedInput::default();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let input = shared.clone();
                std::thread::spawn(move || {
                    input.handle(&pointer(PointerKind::Down, 0.0, 0.0));
                    for _ in 0..100 {
                        input.with(|i| i.record_pointer_drag(1.0, 0.0));
                    }
                    input.handle(&pointer(PointerKind::Up, 0.0, 0.0));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let frame = shared.sample();
        assert!(frame.interrupt);
        assert_eq!(frame.look_delta, Vec2::new(400.0, 0.0));

        shared.handle(&key("w", true));
        shared.reset();
        assert_eq!(shared.sample(), FrameInput::default());
    }

    #[test]
    fn test_event_json_shape() {
        let ev: InputEvent =
            serde_json::from_str(r#"{ "type": "key", "code": "w", "down": true }"#).unwrap();
        assert_eq!(ev, key("w", true));
        let json = r#"{ "type": "touch", "kind": "start", "id": 7, "x": 1.0, "y": 2.0 }"#;
        let ev: InputEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            ev,
            InputEvent::Touch {
                kind: TouchKind::Start,
                id: 7,
                ..
            }
        ));
    }
}
