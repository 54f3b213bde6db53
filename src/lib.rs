pub mod camera;
pub mod chapter;
pub mod config;
pub mod director;
pub mod easing;
pub mod free_fly;
pub mod input;
pub mod observer;
pub mod overlay;
pub mod recorder;
pub mod scene;
pub mod tour_state;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(target_arch = "wasm32")]
pub mod wasm;
