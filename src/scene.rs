//! Scene renderer interface.
//!
//! The crate does not draw anything. Hosts implement `ChapterScene` for each
//! chapter's visuals and hand them to a `SceneSet`, which renders every scene
//! once per frame from the settled tour state and camera pose.

use glam::Vec3;

use crate::camera::CameraPose;
use crate::chapter::ChapterRegistry;
use crate::tour_state::TourSnapshot;

/// Everything a chapter scene needs to draw one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneParams {
    pub chapter_id: usize,
    pub is_active: bool,
    /// No chapter is active; scenes render at reduced presence.
    pub dimmed: bool,
    /// Proximity-derived emphasis in `[0, 1]`, 1 for the active chapter.
    pub intensity: f32,
    pub hovered: bool,
    pub anchor: Vec3,
    pub pose: CameraPose,
    /// Seconds since the tour started.
    pub time: f32,
}

pub trait ChapterScene {
    fn chapter_id(&self) -> usize;

    fn render(&mut self, params: &SceneParams);
}

/// Emphasis falling off linearly to zero at twice the activation distance.
pub fn proximity_intensity(
    camera: Vec3,
    anchor: Vec3,
    activation_distance: f32,
    is_active: bool,
) -> f32 {
    if is_active {
        return 1.0;
    }
    if activation_distance <= 0.0 {
        return 0.0;
    }
    1.0 - (camera.distance(anchor) / (2.0 * activation_distance)).clamp(0.0, 1.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeHighlight {
    Active,
    Hovered,
    Idle,
}

impl NodeHighlight {
    pub fn of(is_active: bool, hovered: bool) -> Self {
        if is_active {
            NodeHighlight::Active
        } else if hovered {
            NodeHighlight::Hovered
        } else {
            NodeHighlight::Idle
        }
    }
}

/// Animated look of a chapter orb.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStyle {
    pub scale: f32,
    pub glow_scale: f32,
    pub glow_opacity: f32,
    pub emissive: f32,
}

pub fn node_style(highlight: NodeHighlight, time: f32, chapter_id: usize) -> NodeStyle {
    let phase = chapter_id as f32;
    match highlight {
        NodeHighlight::Active => NodeStyle {
            scale: 1.4 + (time * 2.0).sin() * 0.2,
            glow_scale: 3.5 + (time * 1.5).sin() * 0.5,
            glow_opacity: 0.25,
            emissive: 3.0,
        },
        NodeHighlight::Hovered => NodeStyle {
            scale: 1.2 + (time * 3.0).sin() * 0.1,
            glow_scale: 2.8,
            glow_opacity: 0.18,
            emissive: 2.0,
        },
        NodeHighlight::Idle => NodeStyle {
            scale: 1.0 + (time * 1.5 + phase).sin() * 0.05,
            glow_scale: 2.2 + (time + phase * 2.0).sin() * 0.3,
            glow_opacity: 0.1,
            emissive: 1.0,
        },
    }
}

/// Orb scale for a chapter at `time`.
pub fn node_pulse(is_active: bool, time: f32, chapter_id: usize) -> f32 {
    node_style(NodeHighlight::of(is_active, false), time, chapter_id).scale
}

/// The full set of chapter scenes.
#[derive(Default)]
pub struct SceneSet {
    scenes: Vec<Box<dyn ChapterScene>>,
    hovered: Option<usize>,
}

impl SceneSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, scene: Box<dyn ChapterScene>) {
        self.scenes.push(scene);
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn set_hovered(&mut self, chapter: Option<usize>) {
        self.hovered = chapter;
    }

    /// Render every scene once. Scenes for chapters missing from the
    /// registry are skipped.
    pub fn render(
        &mut self,
        snapshot: &TourSnapshot,
        pose: &CameraPose,
        registry: &ChapterRegistry,
        activation_distance: f32,
        time: f32,
    ) {
        let dimmed = snapshot.active_chapter.is_none();
        for scene in &mut self.scenes {
            let id = scene.chapter_id();
            let Some(chapter) = registry.get(id) else {
                continue;
            };
            let is_active = snapshot.active_chapter == Some(id);
            let params = SceneParams {
                chapter_id: id,
                is_active,
                dimmed,
                intensity: proximity_intensity(
                    pose.position,
                    chapter.anchor,
                    activation_distance,
                    is_active,
                ),
                hovered: self.hovered == Some(id),
                anchor: chapter.anchor,
                pose: *pose,
                time,
            };
            scene.render(&params);
        }
    }
}
