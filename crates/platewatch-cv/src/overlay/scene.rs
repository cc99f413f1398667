//! Redraw bookkeeping for the overlay.
//!
//! All redraw triggers go through [`OverlayScene::apply`], and the next
//! [`OverlayScene::redraw`] always repaints from scratch.

use super::renderer::{OverlayRenderer, RenderSummary};
use crate::traits::DrawingSurface;
use platewatch_core::{DetectionBatch, Dimensions, DisplaySurface};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where the displayed media comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Image,
    Video,
}

/// Something that invalidates the current overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// A recognition call finished. `None` means it failed.
    BatchArrived(Option<DetectionBatch>),
    /// The user switched between uploaded image and live video.
    SourceChanged(SourceKind),
    /// The media finished decoding or changed resolution.
    SourceLoaded(Dimensions),
    /// The container was laid out or resized.
    Resized(Dimensions),
}

#[derive(Debug, Clone, Default)]
pub struct OverlayScene {
    kind: SourceKind,
    source: Option<Dimensions>,
    container: Dimensions,
    batch: Option<DetectionBatch>,
    dirty: bool,
    redraws: u64,
}

impl OverlayScene {
    pub fn new(kind: SourceKind, container: Dimensions) -> Self {
        Self {
            kind,
            container,
            dirty: true,
            ..Self::default()
        }
    }

    /// Record an event. Returns whether a redraw is now pending.
    pub fn apply(&mut self, event: SceneEvent) -> bool {
        match event {
            SceneEvent::BatchArrived(batch) => {
                // whatever arrives last replaces the previous batch
                self.batch = batch;
                self.dirty = true;
            }
            SceneEvent::SourceChanged(kind) => {
                if kind != self.kind {
                    debug!(?kind, "source changed, dropping overlay");
                    self.kind = kind;
                    self.source = None;
                    self.batch = None;
                    self.dirty = true;
                }
            }
            SceneEvent::SourceLoaded(dimensions) => {
                if self.source != Some(dimensions) {
                    self.source = Some(dimensions);
                    self.dirty = true;
                }
            }
            SceneEvent::Resized(dimensions) => {
                if self.container != dimensions {
                    self.container = dimensions;
                    self.dirty = true;
                }
            }
        }
        self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn batch(&self) -> Option<&DetectionBatch> {
        self.batch.as_ref()
    }

    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }

    /// Geometry for the next draw. Unknown source size maps to zero.
    pub fn display_surface(&self) -> DisplaySurface {
        DisplaySurface::new(self.source.unwrap_or_default(), self.container)
    }

    /// Clear and repaint `surface` from the current state.
    pub fn redraw<S: DrawingSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        renderer: &OverlayRenderer,
    ) -> RenderSummary {
        let summary = renderer.render(surface, &self.display_surface(), self.batch.as_ref());
        self.dirty = false;
        self.redraws += 1;
        summary
    }

    /// Repaint only when an event has invalidated the overlay.
    pub fn redraw_if_dirty<S: DrawingSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        renderer: &OverlayRenderer,
    ) -> Option<RenderSummary> {
        self.dirty.then(|| self.redraw(surface, renderer))
    }
}
