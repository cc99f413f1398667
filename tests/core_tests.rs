// tests/core_tests.rs
use async_trait::async_trait;
use platewatch_client::{dispatch, ClientError, Frame, LatestBatch, LiveEvent, Recognizer, Upload};
use platewatch_core::{
    compute_display_transform, BoundingBox, DetectionBatch, Dimensions, DisplayRect, DisplaySurface,
    NotReady, PlateResult,
};
use platewatch_cv::{
    OverlayRenderer, OverlayScene, RasterSurface, RecordingSurface, RenderStatus, SceneEvent,
    SkipReason, SourceKind,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn sample_batch() -> DetectionBatch {
    let plate = PlateResult::new("B1234XYZ", BoundingBox::new(10.0, 10.0, 110.0, 60.0))
        .with_char_box(BoundingBox::new(5.0, 5.0, 15.0, 25.0))
        .with_char_box(BoundingBox::new(20.0, 5.0, 30.0, 25.0));
    DetectionBatch::from_vec(vec![plate])
}

fn sample_geometry() -> DisplaySurface {
    DisplaySurface::new(Dimensions::new(200.0, 150.0), Dimensions::new(400.0, 300.0))
}

fn assert_rect_eq(actual: DisplayRect, expected: (f64, f64, f64, f64)) {
    let (x, y, width, height) = expected;
    assert!(
        (actual.x - x).abs() < 1e-9
            && (actual.y - y).abs() < 1e-9
            && (actual.width - width).abs() < 1e-9
            && (actual.height - height).abs() < 1e-9,
        "got {actual:?}, expected {expected:?}"
    );
}

#[test]
fn test_contained_and_centered_for_random_sizes() {
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let source = Dimensions::new(rng.gen_range(1.0..4000.0), rng.gen_range(1.0..4000.0));
        let container = Dimensions::new(rng.gen_range(1.0..2000.0), rng.gen_range(1.0..2000.0));
        let transform = compute_display_transform(source, container).unwrap();
        let content = transform.content_rect(source);

        assert!(content.x >= -1e-6 && content.y >= -1e-6);
        assert!(content.right() <= container.width + 1e-6);
        assert!(content.bottom() <= container.height + 1e-6);
        // one axis fills the container, the other is centered
        let fills_width = (content.width - container.width).abs() < 1e-6;
        let fills_height = (content.height - container.height).abs() < 1e-6;
        assert!(fills_width || fills_height);
        assert!((2.0 * content.x + content.width - container.width).abs() < 1e-6);
        assert!((2.0 * content.y + content.height - container.height).abs() < 1e-6);
    }
}

#[test]
fn test_child_box_composition() {
    let renderer = OverlayRenderer::default();
    let mut surface = RecordingSurface::new();
    let plate = PlateResult::new("AB", BoundingBox::new(10.0, 10.0, 110.0, 60.0))
        .with_char_box(BoundingBox::new(5.0, 5.0, 15.0, 25.0));
    let batch = DetectionBatch::from_vec(vec![plate]);

    renderer.render(&mut surface, &sample_geometry(), Some(&batch));

    let strokes = surface.strokes();
    assert_eq!(strokes.len(), 2);
    assert_rect_eq(strokes[0], (20.0, 20.0, 200.0, 100.0));
    assert_rect_eq(strokes[1], (30.0, 30.0, 20.0, 40.0));
    assert_eq!(surface.texts(), vec!["1: AB"]);
}

#[test]
fn test_render_is_idempotent() {
    let renderer = OverlayRenderer::default();
    let geometry = sample_geometry();
    let batch = sample_batch();

    let mut first = RasterSurface::new();
    renderer.render(&mut first, &geometry, Some(&batch));

    // a different batch in between leaves no trace
    let mut second = RasterSurface::new();
    let other = PlateResult::new("Z9", BoundingBox::new(0.0, 0.0, 50.0, 50.0));
    let other = DetectionBatch::from_vec(vec![other]);
    renderer.render(&mut second, &geometry, Some(&other));
    renderer.render(&mut second, &geometry, Some(&batch));

    assert!(!first.is_blank());
    assert_eq!(first.image().as_raw(), second.image().as_raw());
}

#[test]
fn test_empty_batch_clears_previous_drawing() {
    let renderer = OverlayRenderer::default();
    let geometry = sample_geometry();
    let mut surface = RasterSurface::new();

    renderer.render(&mut surface, &geometry, Some(&sample_batch()));
    assert!(!surface.is_blank());

    let summary = renderer.render(&mut surface, &geometry, Some(&DetectionBatch::new()));
    assert_eq!(summary.status, RenderStatus::Blank);
    assert!(surface.is_blank());

    renderer.render(&mut surface, &geometry, Some(&sample_batch()));
    renderer.render(&mut surface, &geometry, None);
    assert!(surface.is_blank());
}

#[test]
fn test_huge_well_formed_box_is_drawn() {
    let plate_box = BoundingBox::new(-3.0e9, 10.0, 3.0e9, 20.0);
    assert!(plate_box.is_well_formed());
    let batch = DetectionBatch::from_vec(vec![PlateResult::new("WIDE", plate_box)]);

    let renderer = OverlayRenderer::default();
    let mut surface = RasterSurface::new();
    let summary = renderer.render(&mut surface, &sample_geometry(), Some(&batch));

    assert_eq!(summary.plates_drawn, 1);
    // top and bottom edges cross the whole surface at y = 20 and y = 40
    assert_eq!(surface.image().get_pixel(200, 20).0[3], 255);
    assert_eq!(surface.image().get_pixel(200, 40).0[3], 255);
    assert_eq!(surface.image().get_pixel(200, 30).0[3], 0);
}

#[test]
fn test_unknown_source_is_not_ready() {
    let result =
        compute_display_transform(Dimensions::new(0.0, 150.0), Dimensions::new(400.0, 300.0));
    assert!(matches!(result, Err(NotReady::Source { .. })));

    let renderer = OverlayRenderer::default();
    let mut surface = RecordingSurface::new();
    let geometry = DisplaySurface::new(Dimensions::new(0.0, 150.0), Dimensions::new(400.0, 300.0));
    let summary = renderer.render(&mut surface, &geometry, Some(&sample_batch()));

    assert!(matches!(summary.status, RenderStatus::NotReady(_)));
    assert!(surface.strokes().is_empty());
    assert!(surface.texts().is_empty());
}

#[test]
fn test_malformed_plate_does_not_stop_the_batch() {
    let batch = DetectionBatch::from_vec(vec![
        PlateResult::new("ONE", BoundingBox::new(0.0, 0.0, 40.0, 20.0)),
        PlateResult::new("TWO", BoundingBox::new(50.0, 50.0, 10.0, 10.0)),
        PlateResult::new("THREE", BoundingBox::new(60.0, 60.0, 100.0, 80.0)),
    ]);
    let renderer = OverlayRenderer::default();
    let mut surface = RecordingSurface::new();

    let summary = renderer.render(&mut surface, &sample_geometry(), Some(&batch));

    assert_eq!(summary.plates_drawn, 2);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].number, 2);
    assert!(matches!(summary.skipped[0].reason, SkipReason::Malformed(_)));
    assert_eq!(surface.texts(), vec!["1: ONE", "3: THREE"]);
}

/// Answers after a delay chosen by the file name, naming the plate after it.
struct DelayedRecognizer;

#[async_trait]
impl Recognizer for DelayedRecognizer {
    async fn recognize(&self, upload: Upload) -> Result<DetectionBatch, ClientError> {
        let delay = if upload.file_name.starts_with('A') { 150 } else { 10 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        let text = upload.file_name.trim_end_matches(".jpg").to_string();
        let plate = PlateResult::new(text, BoundingBox::new(0.0, 0.0, 20.0, 10.0));
        Ok(DetectionBatch::from_vec(vec![plate]))
    }
}

#[tokio::test]
async fn test_out_of_order_responses_last_arrival_wins() {
    let recognizer: Arc<dyn Recognizer> = Arc::new(DelayedRecognizer);
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    for (seq, name) in [(1, "A"), (2, "B")] {
        let frame = Frame {
            file_name: format!("{name}.jpg"),
            bytes: Vec::new(),
        };
        dispatch(recognizer.clone(), seq, frame, cancel.clone(), tx.clone());
    }
    drop(tx);

    let mut scene = OverlayScene::new(SourceKind::Video, Dimensions::new(400.0, 300.0));
    scene.apply(SceneEvent::SourceLoaded(Dimensions::new(200.0, 150.0)));
    let mut latest = LatestBatch::new();
    let renderer = OverlayRenderer::default();
    let mut surface = RecordingSurface::new();

    while let Some(LiveEvent::Response(update)) = rx.recv().await {
        latest.apply(update);
        scene.apply(SceneEvent::BatchArrived(latest.batch().cloned()));
        scene.redraw_if_dirty(&mut surface, &renderer);
    }

    assert_eq!(scene.redraw_count(), 2);
    assert_eq!(latest.frame_seq(), Some(1));
    assert_eq!(surface.texts().last().map(String::as_str), Some("1: A"));
    assert_eq!(scene.batch().and_then(|b| b.get(0)).map(|p| p.plate_number.as_str()), Some("A"));
}
