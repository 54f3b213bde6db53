use wasm_bindgen::prelude::*;

use crate::camera::CameraUniforms;
use crate::chapter::ChapterRegistry;
use crate::config::TourConfig;
use crate::director::TourDirector;
use crate::input::{InputAggregator, InputEvent, PointerKind, TouchKind};
use crate::overlay::SharedOverlay;

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Tour director driven from a JS animation frame callback.
#[wasm_bindgen]
pub struct WasmTour {
    director: TourDirector,
    input: InputAggregator,
    uniforms: CameraUniforms,
    overlay: SharedOverlay,
}

#[wasm_bindgen]
impl WasmTour {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        let mut director = TourDirector::default();
        let overlay = SharedOverlay::new();
        director.subscribe(Box::new(overlay.clone()));
        let input = InputAggregator::new(director.config().input_deadzone);
        Self {
            director,
            input,
            uniforms: CameraUniforms::new(),
            overlay,
        }
    }

    /// Build from JSON chapter registry and config. Empty strings use defaults.
    pub fn with_json(chapters_json: &str, config_json: &str) -> Result<WasmTour, JsValue> {
        let registry = if chapters_json.is_empty() {
            ChapterRegistry::default()
        } else {
            ChapterRegistry::from_json(chapters_json)
                .map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        let config: TourConfig = if config_json.is_empty() {
            TourConfig::default()
        } else {
            serde_json::from_str(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        let input = InputAggregator::new(config.input_deadzone);
        let mut director =
            TourDirector::new(registry, config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let overlay = SharedOverlay::new();
        director.subscribe(Box::new(overlay.clone()));
        log::info!("Tour created with {} chapters", director.registry().count());
        Ok(Self {
            director,
            input,
            uniforms: CameraUniforms::new(),
            overlay,
        })
    }

    pub fn handle_key(&mut self, code: &str, down: bool) {
        self.input.record_key(code, down);
    }

    /// `kind`: 0 down, 1 move, 2 up.
    pub fn handle_pointer(&mut self, kind: u8, x: f32, y: f32, button: u8) {
        let kind = match kind {
            0 => PointerKind::Down,
            1 => PointerKind::Move,
            _ => PointerKind::Up,
        };
        self.input.handle(&InputEvent::Pointer { kind, x, y, button });
    }

    /// `kind`: 0 start, 1 move, 2 end, 3 cancel.
    pub fn handle_touch(&mut self, kind: u8, id: u32, x: f32, y: f32) {
        let kind = match kind {
            0 => TouchKind::Start,
            1 => TouchKind::Move,
            2 => TouchKind::End,
            _ => TouchKind::Cancel,
        };
        self.input.handle(&InputEvent::Touch {
            kind,
            id: id as u64,
            x,
            y,
        });
    }

    pub fn set_viewport(&mut self, width: f32, _height: f32) {
        self.input.set_viewport_width(width);
    }

    /// Advance one frame. Returns camera position followed by look point.
    pub fn frame(&mut self, dt: f32) -> Vec<f32> {
        let pose = self
            .director
            .frame(dt, &mut self.input, &mut self.uniforms);
        self.overlay.update(self.director.config().clamp_dt(dt));
        let look = pose.look_point();
        vec![
            pose.position.x,
            pose.position.y,
            pose.position.z,
            look.x,
            look.y,
            look.z,
        ]
    }

    /// Raw `CameraUniforms` bytes for a GPU uniform buffer.
    pub fn camera_uniforms(&self) -> Vec<u8> {
        bytemuck::bytes_of(&self.uniforms).to_vec()
    }

    pub fn fly_to_chapter(&mut self, id: usize) {
        self.director.fly_to_chapter(id);
    }

    pub fn resume_tour(&mut self) {
        self.director.resume_tour();
    }

    pub fn resume_tour_from_chapter(&mut self, id: usize) {
        self.director.resume_tour_from_chapter(id);
    }

    pub fn pause_tour(&mut self) {
        self.director.pause_tour();
    }

    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.director.snapshot()).unwrap_or_default()
    }

    pub fn overlay_json(&self) -> String {
        serde_json::to_string(&self.overlay.view()).unwrap_or_default()
    }

    /// Partially revealed touring quote.
    pub fn typed_quote(&self) -> String {
        self.overlay.with(|o| o.typed_quote().to_string())
    }

    pub fn text_opacity(&self, chapter_id: usize) -> f32 {
        self.overlay.with(|o| o.text_opacity(chapter_id))
    }

    pub fn text_visible(&self, chapter_id: usize) -> bool {
        self.overlay.with(|o| o.text_visible(chapter_id))
    }

    pub fn chapters_json(&self) -> String {
        let chapters: Vec<_> = self.director.registry().all().collect();
        serde_json::to_string(&chapters).unwrap_or_default()
    }
}

impl Default for WasmTour {
    fn default() -> Self {
        Self::new()
    }
}
