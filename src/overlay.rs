//! 2D overlay derived from tour state.
//!
//! `OverlaySynchronizer` listens to tour snapshots and keeps an `OverlayView`
//! describing what the HUD should show. Time-based presentation (the quote
//! typewriter and the per-chapter floating text fades) is ticked separately
//! with `update(dt)` so it keeps running between state changes.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::chapter::{ChapterRegistry, FINAL_QUOTE};
use crate::observer::TourObserver;
use crate::tour_state::{Phase, SubPhase, TourSnapshot};

pub const INTRO_TITLE: &str = "THE DOCTRINE OF\nTENSOR ZERO";
pub const INTRO_SUBTITLE: &str = "A Calculus of Totality";

/// Seconds per revealed quote character.
const TYPEWRITER_CHAR_INTERVAL: f32 = 0.035;
/// Floating text opacity convergence rate, per second.
const TEXT_FADE_RATE: f32 = 2.5;
/// Below this the floating text is hidden.
const TEXT_VISIBLE_THRESHOLD: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressDot {
    Visited,
    Current,
    Upcoming,
}

/// One entry of the free-explore chapter navigation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavEntry {
    pub chapter_id: usize,
    pub color: String,
    pub active: bool,
    /// Only shown next to the active entry.
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OverlayView {
    #[serde(rename_all = "camelCase")]
    Intro { title: String, subtitle: String },
    #[serde(rename_all = "camelCase")]
    Touring {
        chapter_id: usize,
        title: String,
        subtitle: String,
        color: String,
        quote: Option<String>,
        show_quote: bool,
        progress: Vec<ProgressDot>,
    },
    #[serde(rename_all = "camelCase")]
    FreeExplore {
        active_title: Option<String>,
        can_resume: bool,
        nav: Vec<NavEntry>,
    },
    #[serde(rename_all = "camelCase")]
    Outro { quote: String },
}

impl OverlayView {
    /// Derive the view for `snapshot`.
    pub fn from_snapshot(snapshot: &TourSnapshot, registry: &ChapterRegistry) -> Self {
        match snapshot.phase {
            Phase::Intro => OverlayView::Intro {
                title: INTRO_TITLE.to_string(),
                subtitle: INTRO_SUBTITLE.to_string(),
            },
            Phase::Touring(sub) => {
                let index = snapshot.chapter_index;
                let chapter = registry.get(index);
                let progress = (0..registry.count())
                    .map(|i| match i.cmp(&index) {
                        std::cmp::Ordering::Less => ProgressDot::Visited,
                        std::cmp::Ordering::Equal => ProgressDot::Current,
                        std::cmp::Ordering::Greater => ProgressDot::Upcoming,
                    })
                    .collect();
                OverlayView::Touring {
                    chapter_id: index,
                    title: chapter.map(|c| c.content.title.clone()).unwrap_or_default(),
                    subtitle: chapter.map(|c| c.content.subtitle.clone()).unwrap_or_default(),
                    color: chapter.map(|c| c.content.color.clone()).unwrap_or_default(),
                    quote: chapter
                        .and_then(|c| c.quote(snapshot.quote_index))
                        .map(str::to_string),
                    show_quote: matches!(sub, SubPhase::Approach | SubPhase::Dwell),
                    progress,
                }
            }
            Phase::FreeExplore => {
                let nav = registry
                    .all()
                    .map(|c| {
                        let active = snapshot.active_chapter == Some(c.id);
                        NavEntry {
                            chapter_id: c.id,
                            color: c.content.color.clone(),
                            active,
                            label: active.then(|| c.content.subtitle.clone()),
                        }
                    })
                    .collect();
                OverlayView::FreeExplore {
                    active_title: snapshot
                        .active_chapter
                        .and_then(|id| registry.get(id))
                        .map(|c| c.content.title.clone()),
                    can_resume: snapshot.paused && snapshot.chapter_index + 1 < registry.count(),
                    nav,
                }
            }
            Phase::Outro => OverlayView::Outro {
                quote: FINAL_QUOTE.to_string(),
            },
        }
    }
}

/// Reveals a quote one character at a time.
#[derive(Clone, Debug, Default)]
pub struct Typewriter {
    text: String,
    total: usize,
    revealed: usize,
    timer: f32,
    active: bool,
}

impl Typewriter {
    /// Swap in new text. Unchanged text keeps its progress.
    pub fn set_text(&mut self, text: &str) {
        if text == self.text {
            return;
        }
        self.text = text.to_string();
        self.total = self.text.chars().count();
        self.revealed = 0;
        self.timer = 0.0;
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn advance(&mut self, dt: f32) {
        if !self.active || self.is_complete() || dt <= 0.0 {
            return;
        }
        self.timer += dt;
        while self.timer >= TYPEWRITER_CHAR_INTERVAL && self.revealed < self.total {
            self.timer -= TYPEWRITER_CHAR_INTERVAL;
            self.revealed += 1;
        }
    }

    pub fn displayed(&self) -> &str {
        let end = self
            .text
            .char_indices()
            .nth(self.revealed)
            .map_or(self.text.len(), |(i, _)| i);
        &self.text[..end]
    }

    pub fn is_complete(&self) -> bool {
        self.revealed >= self.total
    }
}

/// Opacity of one chapter's floating text.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextFade {
    pub opacity: f32,
}

impl TextFade {
    pub fn update(&mut self, active: bool, dt: f32) {
        let target = if active { 1.0 } else { 0.0 };
        self.opacity += (target - self.opacity) * (dt * TEXT_FADE_RATE).min(1.0);
    }

    pub fn visible(&self) -> bool {
        self.opacity > TEXT_VISIBLE_THRESHOLD
    }
}

/// Keeps the overlay in step with the tour.
#[derive(Clone, Debug)]
pub struct OverlaySynchronizer {
    view: OverlayView,
    active_chapter: Option<usize>,
    typewriter: Typewriter,
    fades: Vec<TextFade>,
}

impl Default for OverlaySynchronizer {
    fn default() -> Self {
        Self {
            view: OverlayView::Intro {
                title: INTRO_TITLE.to_string(),
                subtitle: INTRO_SUBTITLE.to_string(),
            },
            active_chapter: None,
            typewriter: Typewriter::default(),
            fades: Vec::new(),
        }
    }
}

impl OverlaySynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &OverlayView {
        &self.view
    }

    /// The portion of the touring quote revealed so far.
    pub fn typed_quote(&self) -> &str {
        self.typewriter.displayed()
    }

    /// Floating text opacity for a chapter.
    pub fn text_opacity(&self, chapter_id: usize) -> f32 {
        self.fades.get(chapter_id).map_or(0.0, |f| f.opacity)
    }

    pub fn text_visible(&self, chapter_id: usize) -> bool {
        self.fades.get(chapter_id).is_some_and(TextFade::visible)
    }

    /// Tick time-based presentation.
    pub fn update(&mut self, dt: f32) {
        self.typewriter.advance(dt);
        for (id, fade) in self.fades.iter_mut().enumerate() {
            fade.update(self.active_chapter == Some(id), dt);
        }
    }
}

impl TourObserver for OverlaySynchronizer {
    fn on_change(&mut self, snapshot: &TourSnapshot, registry: &ChapterRegistry) {
        self.view = OverlayView::from_snapshot(snapshot, registry);
        self.active_chapter = snapshot.active_chapter;
        self.fades.resize(registry.count(), TextFade::default());

        if let OverlayView::Touring {
            quote: Some(quote), ..
        } = &self.view
        {
            self.typewriter.set_text(&quote.replace('\n', " "));
        }
        self.typewriter
            .set_active(snapshot.phase == Phase::Touring(SubPhase::Dwell));
    }
}

/// Shared handle so the overlay can be subscribed to the director and read
/// by the HUD at the same time.
#[derive(Clone, Debug, Default)]
pub struct SharedOverlay(Rc<RefCell<OverlaySynchronizer>>);

impl SharedOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut OverlaySynchronizer) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn view(&self) -> OverlayView {
        self.0.borrow().view().clone()
    }

    pub fn update(&self, dt: f32) {
        self.0.borrow_mut().update(dt);
    }
}

impl TourObserver for SharedOverlay {
    fn on_change(&mut self, snapshot: &TourSnapshot, registry: &ChapterRegistry) {
        self.0.borrow_mut().on_change(snapshot, registry);
    }
}
