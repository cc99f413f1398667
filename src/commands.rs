//! Subcommand implementations

use crate::cli::{AnnotateArgs, LiveArgs, RecognizeArgs, WatchlistAction};
use crate::config::DashboardConfig;
use anyhow::{anyhow, bail, Context, Result};
use image::{DynamicImage, RgbaImage};
use platewatch_client::{
    parse_batch, Camera, DirectoryCamera, LatestBatch, LiveEvent, LiveSession, LiveUpdate,
    RecognitionClient, Recognizer, SnapshotCamera, SupabaseStore, Upload,
};
use platewatch_core::records::normalize_plate;
use platewatch_core::{DetectionBatch, Dimensions, DisplaySurface, HistoryStats, NewDetection};
use platewatch_cv::{
    AnnotationJob, Annotator, ImageUtils, OverlayRenderer, OverlayScene, RasterSurface,
    RecordingSurface, RenderStatus, RenderSummary, SceneEvent, SourceKind,
};
use platewatch_cv::traits::DrawingSurface;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub fn annotate(config: &DashboardConfig, args: &AnnotateArgs) -> Result<()> {
    if args.output.is_some() && args.images.len() > 1 {
        bail!("--output can only be used with a single image");
    }
    if args.response.len() > 1 && args.response.len() != args.images.len() {
        bail!(
            "got {} responses for {} images; pass one per image or a single shared one",
            args.response.len(),
            args.images.len()
        );
    }

    let container = args.container.unwrap_or(config.container);
    let jobs = args
        .images
        .iter()
        .enumerate()
        .map(|(index, image_path)| {
            let response = args.response.get(index).or_else(|| args.response.first());
            let batch = response.map(|path| read_batch(path)).transpose()?;
            Ok(AnnotationJob {
                image_path: image_path.clone(),
                batch,
                container: pixel_size(container),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if args.plan {
        return print_plans(config, &jobs, container);
    }

    let annotator = build_annotator(config)?;
    let mut failed = 0;
    for (job, result) in jobs.iter().zip(annotator.run_batch(&jobs)) {
        match result {
            Ok((frame, summary)) => {
                let output = match &args.output {
                    Some(output) => output.clone(),
                    None => annotated_path(&config.output_dir, &job.image_path),
                };
                ImageUtils::save(&frame, &output)?;
                report(&summary);
                println!("saved {}", output.display());
            }
            Err(err) => {
                warn!(path = ?job.image_path, "annotation failed: {err:#}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} images could not be annotated", jobs.len());
    }
    Ok(())
}

/// Print the recorded draw commands of each job instead of rasterizing.
fn print_plans(
    config: &DashboardConfig,
    jobs: &[AnnotationJob],
    container: Dimensions,
) -> Result<()> {
    let renderer = OverlayRenderer::new(config.overlay.clone());
    let mut plans = Vec::with_capacity(jobs.len());

    for job in jobs {
        let image = ImageUtils::load(&job.image_path)?;
        let geometry = DisplaySurface::new(ImageUtils::dimensions(&image), container);
        let mut surface = RecordingSurface::new();
        let summary = renderer.render(&mut surface, &geometry, job.batch.as_ref());
        plans.push(serde_json::json!({
            "image": job.image_path,
            "summary": summary,
            "commands": surface.commands(),
        }));
    }

    println!("{}", serde_json::to_string_pretty(&plans)?);
    Ok(())
}

pub async fn recognize(config: &DashboardConfig, args: &RecognizeArgs) -> Result<()> {
    let client = RecognitionClient::new(&config.recognition)?;
    let upload = prepare_upload(&args.image).await?;

    let started = Instant::now();
    let batch = client.recognize(upload).await?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    print_batch(&batch, elapsed_ms);

    if let Some(output) = &args.annotate {
        let image = ImageUtils::load(&args.image)?;
        let annotator = build_annotator(config)?;
        let (frame, summary) =
            annotator.annotate(&image, Some(&batch), pixel_size(config.container))?;
        ImageUtils::save(&frame, output)?;
        report(&summary);
        println!("saved {}", output.display());
    }

    if args.save {
        save_detections(config, &batch, elapsed_ms).await?;
    }
    Ok(())
}

/// Store every read plate, marked as a match when it is on the watch list.
async fn save_detections(
    config: &DashboardConfig,
    batch: &DetectionBatch,
    elapsed_ms: f64,
) -> Result<()> {
    let store = SupabaseStore::new(&config.store)?;
    let watch_list = store.load_watch_list().await?;
    let time_ms = batch.time_taken_ms.unwrap_or(elapsed_ms);

    for plate in batch.iter().filter(|plate| plate.is_read()) {
        let detection = NewDetection {
            plate_number: plate.plate_number.clone(),
            confidence: plate.best_confidence().unwrap_or(0.0),
            status: watch_list.status_for(&plate.plate_number),
            time_ms,
            user_id: store.user_id().to_string(),
        };
        let row = store.save_detection(&detection).await?;
        println!("saved #{} {} ({})", row.id, row.plate_number, row.status.as_str());
    }
    Ok(())
}

pub async fn live(config: &DashboardConfig, args: &LiveArgs) -> Result<()> {
    let camera = open_camera(config, args)?;
    let recognizer: Arc<dyn Recognizer> = Arc::new(RecognitionClient::new(&config.recognition)?);
    let annotator = build_annotator(config)?;

    let output_dir = args.output_dir.clone().unwrap_or_else(|| config.output_dir.clone());
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;
    let output = output_dir.join("latest.png");

    let mut view = LiveView {
        scene: OverlayScene::new(SourceKind::Video, config.container),
        latest: LatestBatch::new(),
        annotator,
        output,
    };

    let mut session = LiveSession::start(camera, recognizer, config.live.interval());
    info!(interval_ms = config.live.interval_ms, "live session started");

    let deadline = async {
        match args.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut failure = None;
    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("duration elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            event = session.next_event() => match event {
                Some(LiveEvent::Response(update)) => view.show(update)?,
                Some(LiveEvent::CaptureFailed(err)) => {
                    failure = Some(err);
                    break;
                }
                None => break,
            }
        }
    }

    session.stop().await;
    if let Some(err) = failure {
        bail!("camera failed: {err}");
    }
    println!("{} redraws, last frame in {}", view.scene.redraw_count(), view.output.display());
    Ok(())
}

/// Consumer side of the live session. Owns the scene, so redraws never overlap.
struct LiveView {
    scene: OverlayScene,
    latest: LatestBatch,
    annotator: Annotator,
    output: PathBuf,
}

impl LiveView {
    fn show(&mut self, update: LiveUpdate) -> Result<()> {
        let frame = match ImageUtils::decode(&update.frame.bytes) {
            Ok(frame) => Some(frame),
            Err(err) => {
                warn!(frame = update.frame_seq, "undecodable frame: {err:#}");
                None
            }
        };

        let frame_seq = update.frame_seq;
        self.latest.apply(update);
        if let Some(batch) = self.latest.batch() {
            info!(
                frame = frame_seq,
                plates = batch.len(),
                best = ?batch.best().map(|p| &p.plate_number),
                "response"
            );
        }

        let Some(frame) = frame else {
            return Ok(());
        };
        self.scene.apply(SceneEvent::SourceLoaded(ImageUtils::dimensions(&frame)));
        self.scene.apply(SceneEvent::BatchArrived(self.latest.batch().cloned()));
        self.write(&frame)
    }

    fn write(&mut self, frame: &DynamicImage) -> Result<()> {
        if let Some(composed) = self.compose(frame) {
            ImageUtils::save(&composed, &self.output)?;
        }
        Ok(())
    }

    /// Redraw if needed and put the overlay over the letterboxed frame.
    /// `None` when nothing changed or the container is not laid out yet.
    fn compose(&mut self, frame: &DynamicImage) -> Option<RgbaImage> {
        let mut overlay = self.annotator.surface();
        let summary = self.scene.redraw_if_dirty(&mut overlay, self.annotator.renderer())?;
        let transform = match self.scene.display_surface().transform() {
            Ok(transform) => transform,
            Err(not_ready) => {
                debug!(%not_ready, "frame not written");
                return None;
            }
        };

        if !summary.skipped.is_empty() {
            warn!(skipped = summary.skipped.len(), "some plates were not drawn");
        }
        let mut composed = ImageUtils::letterbox(frame, &transform, overlay.size());
        ImageUtils::composite(&mut composed, overlay.image());
        Some(composed)
    }
}

pub async fn history(config: &DashboardConfig, limit: Option<usize>) -> Result<()> {
    let store = SupabaseStore::new(&config.store)?;
    let rows = store.recent_detections(limit).await?;
    let total = store.detection_count().await?;

    if rows.is_empty() {
        println!("no detections yet");
        return Ok(());
    }
    for row in &rows {
        println!(
            "{}  {:<12} {:>6.2}  {:<8} {:>6.0} ms",
            row.created_at.format("%Y-%m-%d %H:%M:%S"),
            row.plate_number,
            row.confidence,
            row.status.as_str(),
            row.time_ms
        );
    }

    let stats = HistoryStats::from_records(&rows);
    println!("total scanned:   {total}");
    println!("recent scans:    {}", stats.recent);
    println!("recent accuracy: {:.1}%", stats.accuracy);
    println!("failed:          {}", stats.failed);
    Ok(())
}

pub async fn watchlist(config: &DashboardConfig, action: &WatchlistAction) -> Result<()> {
    let store = SupabaseStore::new(&config.store)?;
    match action {
        WatchlistAction::List => {
            let entries = store.watch_list().await?;
            if entries.is_empty() {
                println!("watch list is empty");
            }
            for entry in entries {
                println!("{:<12} {}", entry.plate_number, entry.status.as_str());
            }
        }
        WatchlistAction::Add { plate } => {
            store.add_to_watch_list(plate).await?;
            println!("watching {}", normalize_plate(plate));
        }
        WatchlistAction::Remove { plate } => {
            store.remove_from_watch_list(plate).await?;
            println!("stopped watching {}", normalize_plate(plate));
        }
    }
    Ok(())
}

fn build_annotator(config: &DashboardConfig) -> Result<Annotator> {
    let annotator = Annotator::new(OverlayRenderer::new(config.overlay.clone()));
    match &config.font_path {
        Some(path) => Ok(annotator.with_font(RasterSurface::load_font(path)?)),
        None => {
            if config.overlay.draw_labels {
                warn!("no font_path configured, plate labels will not be drawn");
            }
            Ok(annotator)
        }
    }
}

fn open_camera(config: &DashboardConfig, args: &LiveArgs) -> Result<Box<dyn Camera>> {
    let timeout = Duration::from_secs(config.live.snapshot_timeout_secs);
    if let Some(dir) = &args.frames {
        return Ok(Box::new(DirectoryCamera::open(dir)?));
    }
    args.snapshot_url
        .clone()
        .or_else(|| config.live.snapshot_url.clone())
        .map(|url| Box::new(SnapshotCamera::new(url, timeout)) as Box<dyn Camera>)
        .ok_or_else(|| {
            anyhow!("no camera: pass --snapshot-url or --frames, or set live.snapshot_url")
        })
}

/// Read an image for upload, re-encoding formats the service does not take.
async fn prepare_upload(path: &Path) -> Result<Upload> {
    let upload = Upload::from_path(path).await?;
    if upload.mime == "image/jpeg" || upload.mime == "image/png" {
        return Ok(upload);
    }
    let image = ImageUtils::decode(&upload.bytes)?;
    let stem = file_stem(path, "frame");
    Ok(Upload::new(format!("{stem}.jpg"), ImageUtils::encode_jpeg(&image)?))
}

fn read_batch(path: &Path) -> Result<DetectionBatch> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read response {:?}", path))?;
    parse_batch(&body).with_context(|| format!("Failed to parse response {:?}", path))
}

fn print_batch(batch: &DetectionBatch, elapsed_ms: f64) {
    if batch.is_empty() {
        println!("no plates found");
        return;
    }
    for (index, plate) in batch.iter().enumerate() {
        let text = if plate.is_read() { plate.plate_number.as_str() } else { "(unread)" };
        match plate.best_confidence() {
            Some(confidence) => println!("{}: {} (confidence {:.2})", index + 1, text, confidence),
            None => println!("{}: {}", index + 1, text),
        }
    }
    if let Some(best) = batch.best() {
        println!("best: {}", best.plate_number);
    }
    let stats = batch.stats();
    if stats.max_confidence > 0.0 {
        println!(
            "confidence: avg {:.2}, min {:.2}, max {:.2}",
            stats.avg_confidence, stats.min_confidence, stats.max_confidence
        );
    }
    println!(
        "{} of {} plates localized, {} characters, took {:.0} ms",
        stats.localized_plates,
        stats.total_plates,
        stats.character_boxes,
        batch.time_taken_ms.unwrap_or(elapsed_ms)
    );
}

fn report(summary: &RenderSummary) {
    match &summary.status {
        RenderStatus::Blank => println!("no plates found"),
        RenderStatus::NotReady(reason) => println!("nothing drawn: {reason}"),
        RenderStatus::Drawn => println!(
            "drew {} plates, {} characters",
            summary.plates_drawn, summary.characters_drawn
        ),
    }
    for skipped in &summary.skipped {
        println!("skipped plate {}: {:?}", skipped.number, skipped.reason);
    }
}

fn pixel_size(container: Dimensions) -> (u32, u32) {
    (container.width.round() as u32, container.height.round() as u32)
}

fn annotated_path(output_dir: &Path, image: &Path) -> PathBuf {
    let stem = file_stem(image, "image");
    output_dir.join(format!("{stem}_annotated.png"))
}

fn file_stem(path: &Path, fallback: &str) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| fallback.to_string())
}
