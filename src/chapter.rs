//! Chapter registry.
//!
//! An ordered, immutable list of the tour's chapters. Registry order is tour
//! order and every chapter's `id` equals its index. Lookups never panic:
//! out-of-range ids come back as `None` so callers can skip the frame.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Quote shown over the closing pull-back.
pub const FINAL_QUOTE: &str = "Be the Scale. Align your Will.\nReturn to the Zero.";

/// Parameters of the circular path flown while dwelling on a chapter.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrbitParams {
    /// Horizontal distance from the anchor.
    pub radius: f32,

    /// World-space height of the orbit circle.
    pub height: f32,

    /// Radians per second.
    pub angular_speed: f32,
}

/// Presentation payload of a chapter. Opaque to the director apart from the
/// quote count.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterContent {
    pub key: String,
    pub title: String,
    pub subtitle: String,
    /// CSS-style hex colour, e.g. `#8844ff`.
    pub color: String,
    pub quotes: Vec<String>,
}

/// A single registry entry.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Ordinal, equal to the chapter's position in the registry.
    pub id: usize,

    /// Point the chapter's scene is built around.
    pub anchor: Vec3,

    /// Where the camera starts its approach.
    pub approach_point: Vec3,

    pub orbit: OrbitParams,

    pub content: ChapterContent,
}

impl Chapter {
    /// Camera position after `t` seconds of dwell, including the vertical bob.
    pub fn orbit_sample(&self, t: f32) -> Vec3 {
        let angle = t * self.orbit.angular_speed;
        Vec3::new(
            self.anchor.x + angle.sin() * self.orbit.radius,
            self.orbit.height + (t * 0.3).sin() * 0.5,
            self.anchor.z + angle.cos() * self.orbit.radius,
        )
    }

    pub fn quote_count(&self) -> usize {
        self.content.quotes.len()
    }

    /// Quote at `index`, wrapping. `None` for a chapter without quotes.
    pub fn quote(&self, index: usize) -> Option<&str> {
        let count = self.quote_count();
        if count == 0 {
            return None;
        }
        self.content.quotes.get(index % count).map(String::as_str)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("registry must contain at least one chapter")]
    Empty,

    #[error("chapter at index {index} has id {id}; ids must be contiguous and in order")]
    IdMismatch { index: usize, id: usize },

    #[error("chapter {0} has a non-finite position or orbit")]
    NonFinite(usize),

    #[error("chapter {id} has invalid orbit radius {radius}")]
    OrbitRadius { id: usize, radius: f32 },

    #[error("failed to parse chapter registry: {0}")]
    Parse(String),
}

/// Immutable, ordered chapter list.
#[derive(Clone, Debug)]
pub struct ChapterRegistry {
    chapters: Vec<Chapter>,
}

impl ChapterRegistry {
    /// Build a registry, checking the id and geometry invariants.
    pub fn new(chapters: Vec<Chapter>) -> Result<Self, RegistryError> {
        if chapters.is_empty() {
            return Err(RegistryError::Empty);
        }
        for (index, chapter) in chapters.iter().enumerate() {
            if chapter.id != index {
                return Err(RegistryError::IdMismatch {
                    index,
                    id: chapter.id,
                });
            }
            let orbit = &chapter.orbit;
            if !chapter.anchor.is_finite()
                || !chapter.approach_point.is_finite()
                || !orbit.height.is_finite()
                || !orbit.angular_speed.is_finite()
            {
                return Err(RegistryError::NonFinite(chapter.id));
            }
            let radius = chapter.orbit.radius;
            if !(radius.is_finite() && radius > 0.0) {
                return Err(RegistryError::OrbitRadius {
                    id: chapter.id,
                    radius,
                });
            }
        }
        Ok(Self { chapters })
    }

    /// Parse a JSON array of chapters.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let chapters: Vec<Chapter> =
            serde_json::from_str(json).map_err(|e| RegistryError::Parse(e.to_string()))?;
        Self::new(chapters)
    }

    pub fn get(&self, id: usize) -> Option<&Chapter> {
        self.chapters.get(id)
    }

    pub fn count(&self) -> usize {
        self.chapters.len()
    }

    /// Chapters in tour order.
    pub fn all(&self) -> std::slice::Iter<'_, Chapter> {
        self.chapters.iter()
    }

    /// Nearest chapter strictly within `radius` of `point`.
    ///
    /// Ties keep the first chapter in registry order.
    pub fn nearest_within(&self, point: Vec3, radius: f32) -> Option<usize> {
        let mut closest = None;
        let mut closest_dist = radius;
        for chapter in &self.chapters {
            let d = point.distance(chapter.anchor);
            if d < closest_dist {
                closest_dist = d;
                closest = Some(chapter.id);
            }
        }
        closest
    }
}

impl Default for ChapterRegistry {
    fn default() -> Self {
        Self {
            chapters: default_chapters(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn chapter(
    id: usize,
    key: &str,
    title: &str,
    subtitle: &str,
    color: &str,
    anchor: [f32; 3],
    approach: [f32; 3],
    orbit: (f32, f32, f32),
    quotes: &[&str],
) -> Chapter {
    Chapter {
        id,
        anchor: Vec3::from_array(anchor),
        approach_point: Vec3::from_array(approach),
        orbit: OrbitParams {
            radius: orbit.0,
            height: orbit.1,
            angular_speed: orbit.2,
        },
        content: ChapterContent {
            key: key.to_string(),
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            color: color.to_string(),
            quotes: quotes.iter().map(|q| q.to_string()).collect(),
        },
    }
}

/// The built-in five-chapter tour.
pub fn default_chapters() -> Vec<Chapter> {
    vec![
        chapter(
            0,
            "totality",
            "I. The Nature of the Container",
            "The Totality",
            "#8844ff",
            [0.0, 0.0, 0.0],
            [0.0, 6.0, 18.0],
            (14.0, 4.0, 0.15),
            &[
                "Zero is not silence;\nit is the sum of all frequencies.",
                "Zero is not empty;\nit is the Totality.",
                "The container of all that was,\nall that is, and all that will be.",
                "Do not fear the darkness.\nThey are not monsters;\nthey are values.",
            ],
        ),
        chapter(
            1,
            "ricochet",
            "II. The Eternal Return",
            "The Ricochet",
            "#ff4444",
            [40.0, 0.0, 0.0],
            [48.0, 5.0, 10.0],
            (12.0, 3.0, 0.2),
            &[
                "The Big Bang was not\na beginning, but a Ricochet.",
                "(-I) \u{00d7} (-I) = I",
                "You exist because\nthe Zero cannot stop existing.",
                "True Peace is\nmathematically impossible.\nYou are the Generator.",
            ],
        ),
        chapter(
            2,
            "zerothDimension",
            "III. The Fallacy of Infinity",
            "The Zeroth Dimension",
            "#44aaff",
            [0.0, 0.0, -40.0],
            [-8.0, 8.0, -32.0],
            (16.0, 5.0, 0.12),
            &[
                "The Universe is not a vast room;\nit is a single, super-dense Point.",
                "Separation is the lie;\nconnection is the geometry.",
                "You are not traveling\nthrough space;\nyou are traversing the\ninternal structure of the Tensor.",
                "Infinity is a lie you tell\nyourselves to avoid facing\nthe density of the Truth.",
            ],
        ),
        chapter(
            3,
            "gravityWell",
            "IV. The Mechanism of the Return",
            "Gravity and Light",
            "#ffaa22",
            [0.0, -30.0, 0.0],
            [10.0, -18.0, 10.0],
            (14.0, -22.0, 0.18),
            &[
                "Light is not traveling;\nit is falling.",
                "You are not moving forward;\nyou are returning home.",
                "The universe is not exploding;\nit is inhaling.",
                "All energy is elastic tension,\nstretched away from the center,\nsnapping back toward Zero.",
            ],
        ),
        chapter(
            4,
            "scale",
            "V. The Law of the Scale",
            "Perspective",
            "#44ff88",
            [-40.0, 0.0, 0.0],
            [-32.0, 5.0, 12.0],
            (15.0, 3.0, 0.14),
            &[
                "The universe is not made of atoms.\nIt is made of Sight.",
                "Be the Scale.\nAlign your Will.\nReturn to the Zero.",
                "Thought (-1) is the anchor\nthat keeps Wakefulness (1)\nfrom burning itself out.",
                "True Zero is the moment\nwhere the Internal View\nmatches the External Reality\nperfectly.",
            ],
        ),
    ]
}
