//! Draws a detection batch over contain-scaled media.

use super::style::OverlayStyle;
use crate::traits::DrawingSurface;
use platewatch_core::{BoxError, DetectionBatch, DisplaySurface};
use serde::Serialize;
use tracing::{debug, warn};

/// Why a plate produced no drawing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SkipReason {
    /// The service found no outer box for this plate.
    NoBox,
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedPlate {
    /// 1-based plate number, as used in labels
    pub number: usize,
    pub reason: SkipReason,
}

/// How far a render call got.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RenderStatus {
    /// No batch or an empty one; the surface is left blank.
    Blank,
    /// Source or container size unknown; the surface is left blank.
    NotReady(String),
    Drawn,
}

/// Result of one render call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSummary {
    pub status: RenderStatus,
    pub plates_drawn: usize,
    pub characters_drawn: usize,
    pub skipped: Vec<SkippedPlate>,
}

impl RenderSummary {
    fn with_status(status: RenderStatus) -> Self {
        Self {
            status,
            plates_drawn: 0,
            characters_drawn: 0,
            skipped: Vec::new(),
        }
    }
}

/// Stateless overlay renderer. Every call clears the surface and redraws.
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Resize `surface` to the container, clear it, and draw `batch`.
    pub fn render<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        geometry: &DisplaySurface,
        batch: Option<&DetectionBatch>,
    ) -> RenderSummary {
        let (width, height) = surface_size(geometry);
        surface.resize(width, height);
        surface.clear();

        let Some(batch) = batch.filter(|b| !b.is_empty()) else {
            debug!("no detections, overlay left blank");
            return RenderSummary::with_status(RenderStatus::Blank);
        };

        let transform = match geometry.transform() {
            Ok(transform) => transform,
            Err(not_ready) => {
                debug!(%not_ready, "skipping overlay until dimensions are known");
                return RenderSummary::with_status(RenderStatus::NotReady(not_ready.to_string()));
            }
        };

        let mut summary = RenderSummary::with_status(RenderStatus::Drawn);

        for (index, plate) in batch.iter().enumerate() {
            let number = index + 1;

            let Some(plate_box) = plate.plate_box else {
                summary.skipped.push(SkippedPlate {
                    number,
                    reason: SkipReason::NoBox,
                });
                continue;
            };

            if let Err(err) = plate_box.validate() {
                warn!(number, %err, "skipping malformed plate box");
                summary.skipped.push(SkippedPlate {
                    number,
                    reason: err.into(),
                });
                continue;
            }

            let rect = transform.map_box(&plate_box);
            surface.stroke_rect(rect, &self.style.plate_stroke);

            if self.style.draw_labels {
                let label = format!("{}: {}", number, plate.plate_number);
                let baseline = rect.y - self.style.label_offset;
                surface.fill_text(&label, rect.x, baseline, &self.style.label);
            }

            if self.style.draw_char_boxes {
                for char_box in &plate.char_boxes {
                    if let Err(err) = char_box.validate() {
                        debug!(number, %err, "skipping malformed character box");
                        continue;
                    }
                    let char_rect = transform.map_child_box(&plate_box, char_box);
                    surface.stroke_rect(char_rect, &self.style.char_stroke);
                    summary.characters_drawn += 1;
                }
            }

            summary.plates_drawn += 1;
        }

        debug!(
            drawn = summary.plates_drawn,
            characters = summary.characters_drawn,
            skipped = summary.skipped.len(),
            "overlay rendered"
        );
        summary
    }
}

/// Pixel buffer size for the container, zero while it is not laid out.
fn surface_size(geometry: &DisplaySurface) -> (u32, u32) {
    let side = |v: f64| if v.is_finite() && v > 0.0 { v.round() as u32 } else { 0 };
    (side(geometry.container.width), side(geometry.container.height))
}

impl From<BoxError> for SkipReason {
    fn from(err: BoxError) -> Self {
        SkipReason::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, RecordingSurface};
    use platewatch_core::{BoundingBox, Dimensions, DisplayRect, PlateResult};

    fn geometry() -> DisplaySurface {
        DisplaySurface::new(Dimensions::new(200.0, 150.0), Dimensions::new(400.0, 300.0))
    }

    fn plate_at(text: &str, x: f64, y: f64) -> PlateResult {
        PlateResult::new(text, BoundingBox::from_origin_size(x, y, 40.0, 20.0))
    }

    #[test]
    fn test_plate_and_character_placement() {
        let batch = DetectionBatch::from_vec(vec![
            PlateResult::new("B1234XYZ", BoundingBox::new(10.0, 10.0, 110.0, 60.0))
                .with_char_box(BoundingBox::new(5.0, 5.0, 15.0, 25.0)),
        ]);
        let renderer = OverlayRenderer::default();
        let mut surface = RecordingSurface::new();

        let summary = renderer.render(&mut surface, &geometry(), Some(&batch));
        assert_eq!(summary.status, RenderStatus::Drawn);
        assert_eq!(summary.plates_drawn, 1);
        assert_eq!(summary.characters_drawn, 1);

        let style = renderer.style();
        assert_eq!(
            surface.commands(),
            &[
                DrawCommand::Resize { width: 400, height: 300 },
                DrawCommand::Clear,
                DrawCommand::StrokeRect {
                    rect: DisplayRect::new(20.0, 20.0, 200.0, 100.0),
                    style: style.plate_stroke.clone(),
                },
                DrawCommand::FillText {
                    text: "1: B1234XYZ".into(),
                    x: 20.0,
                    y: 14.0,
                    style: style.label.clone(),
                },
                DrawCommand::StrokeRect {
                    rect: DisplayRect::new(30.0, 30.0, 20.0, 40.0),
                    style: style.char_stroke.clone(),
                },
            ]
        );
    }

    #[test]
    fn test_empty_label_renders_number_only() {
        let batch = DetectionBatch::from_vec(vec![plate_at("", 0.0, 0.0)]);
        let mut surface = RecordingSurface::new();
        OverlayRenderer::default().render(&mut surface, &geometry(), Some(&batch));
        assert_eq!(surface.texts(), vec!["1: ".to_string()]);
    }

    #[test]
    fn test_absent_or_empty_batch_is_blank() {
        let renderer = OverlayRenderer::default();
        let mut surface = RecordingSurface::new();

        let summary = renderer.render(&mut surface, &geometry(), None);
        assert_eq!(summary.status, RenderStatus::Blank);
        assert!(surface.strokes().is_empty());

        let summary = renderer.render(&mut surface, &geometry(), Some(&DetectionBatch::new()));
        assert_eq!(summary.status, RenderStatus::Blank);
        assert_eq!(surface.size(), (400, 300));
    }

    #[test]
    fn test_not_ready_source_still_clears() {
        let batch = DetectionBatch::from_vec(vec![plate_at("A", 0.0, 0.0)]);
        let mut surface = RecordingSurface::new();
        let geometry =
            DisplaySurface::new(Dimensions::new(0.0, 0.0), Dimensions::new(400.0, 300.0));

        let summary = OverlayRenderer::default().render(&mut surface, &geometry, Some(&batch));
        assert!(matches!(summary.status, RenderStatus::NotReady(_)));
        assert_eq!(surface.commands().last(), Some(&DrawCommand::Clear));
        assert!(surface.strokes().is_empty());
    }

    #[test]
    fn test_hidden_container_draws_nothing() {
        let batch = DetectionBatch::from_vec(vec![plate_at("A", 0.0, 0.0)]);
        let mut surface = RecordingSurface::new();
        let geometry =
            DisplaySurface::new(Dimensions::new(200.0, 150.0), Dimensions::new(0.0, 300.0));

        let summary = OverlayRenderer::default().render(&mut surface, &geometry, Some(&batch));
        assert!(matches!(summary.status, RenderStatus::NotReady(_)));
        assert_eq!(surface.size(), (0, 300));
    }

    #[test]
    fn test_malformed_plate_is_isolated() {
        let batch = DetectionBatch::from_vec(vec![
            plate_at("ONE", 0.0, 0.0),
            PlateResult::new("TWO", BoundingBox::new(80.0, 10.0, 60.0, 30.0)),
            plate_at("THREE", 100.0, 100.0),
        ]);
        let mut surface = RecordingSurface::new();

        let summary = OverlayRenderer::default().render(&mut surface, &geometry(), Some(&batch));
        assert_eq!(summary.plates_drawn, 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].number, 2);
        assert!(matches!(summary.skipped[0].reason, SkipReason::Malformed(_)));

        assert_eq!(surface.texts(), vec!["1: ONE".to_string(), "3: THREE".to_string()]);
        assert_eq!(
            surface.strokes(),
            vec![
                DisplayRect::new(0.0, 0.0, 80.0, 40.0),
                DisplayRect::new(200.0, 200.0, 80.0, 40.0),
            ]
        );
    }

    #[test]
    fn test_plate_without_box_skips_children() {
        let mut orphan = PlateResult::default().with_char_box(BoundingBox::new(0.0, 0.0, 5.0, 5.0));
        orphan.plate_number = "LOST".into();
        let batch = DetectionBatch::from_vec(vec![orphan, plate_at("KEPT", 10.0, 10.0)]);
        let mut surface = RecordingSurface::new();

        let summary = OverlayRenderer::default().render(&mut surface, &geometry(), Some(&batch));
        assert_eq!(summary.skipped, vec![SkippedPlate { number: 1, reason: SkipReason::NoBox }]);
        assert_eq!(summary.characters_drawn, 0);
        assert_eq!(surface.texts(), vec!["2: KEPT".to_string()]);
    }

    #[test]
    fn test_malformed_character_box_skipped_alone() {
        let plate = plate_at("AB", 0.0, 0.0)
            .with_char_box(BoundingBox::new(0.0, 0.0, 5.0, 5.0))
            .with_char_box(BoundingBox::new(f64::NAN, 0.0, 5.0, 5.0))
            .with_char_box(BoundingBox::new(10.0, 0.0, 15.0, 5.0));
        let batch = DetectionBatch::from_vec(vec![plate]);
        let mut surface = RecordingSurface::new();

        let summary = OverlayRenderer::default().render(&mut surface, &geometry(), Some(&batch));
        assert_eq!(summary.plates_drawn, 1);
        assert_eq!(summary.characters_drawn, 2);
        assert_eq!(surface.strokes().len(), 3);
    }

    #[test]
    fn test_style_toggles() {
        let style = OverlayStyle {
            draw_labels: false,
            draw_char_boxes: false,
            ..OverlayStyle::default()
        };
        let batch = DetectionBatch::from_vec(vec![
            plate_at("AB", 0.0, 0.0).with_char_box(BoundingBox::new(0.0, 0.0, 5.0, 5.0)),
        ]);
        let mut surface = RecordingSurface::new();

        OverlayRenderer::new(style).render(&mut surface, &geometry(), Some(&batch));
        assert!(surface.texts().is_empty());
        assert_eq!(surface.strokes().len(), 1);
    }

    #[test]
    fn test_fractional_container_rounds() {
        let mut surface = RecordingSurface::new();
        let geometry =
            DisplaySurface::new(Dimensions::new(10.0, 10.0), Dimensions::new(640.4, 359.6));
        OverlayRenderer::default().render(&mut surface, &geometry, None);
        assert_eq!(surface.size(), (640, 360));
    }
}
