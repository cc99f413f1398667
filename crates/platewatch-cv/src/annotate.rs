//! Produce annotated frames: letterboxed media with the overlay on top.

use crate::overlay::{OverlayRenderer, RenderSummary};
use crate::surface::RasterSurface;
use crate::utils::ImageUtils;
use crate::Result;
use ab_glyph::FontArc;
use image::{DynamicImage, RgbaImage};
use platewatch_core::{DetectionBatch, Dimensions, DisplaySurface};
use std::path::PathBuf;
use tracing::info;

/// One image to annotate with its recognition result.
#[derive(Debug, Clone)]
pub struct AnnotationJob {
    pub image_path: PathBuf,
    pub batch: Option<DetectionBatch>,
    pub container: (u32, u32),
}

/// Renders overlays onto pixel buffers, compositing them over the source.
#[derive(Debug, Clone, Default)]
pub struct Annotator {
    renderer: OverlayRenderer,
    font: Option<FontArc>,
}

impl Annotator {
    pub fn new(renderer: OverlayRenderer) -> Self {
        Self {
            renderer,
            font: None,
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    pub fn renderer(&self) -> &OverlayRenderer {
        &self.renderer
    }

    /// A fresh raster surface sharing this annotator's font
    pub fn surface(&self) -> RasterSurface {
        match &self.font {
            Some(font) => RasterSurface::new().with_font(font.clone()),
            None => RasterSurface::new(),
        }
    }

    /// Render only the transparent overlay layer
    pub fn overlay(
        &self,
        geometry: &DisplaySurface,
        batch: Option<&DetectionBatch>,
    ) -> (RgbaImage, RenderSummary) {
        let mut surface = self.surface();
        let summary = self.renderer.render(&mut surface, geometry, batch);
        (surface.into_image(), summary)
    }

    /// Letterbox `image` into `container` and draw `batch` over it.
    pub fn annotate(
        &self,
        image: &DynamicImage,
        batch: Option<&DetectionBatch>,
        container: (u32, u32),
    ) -> Result<(RgbaImage, RenderSummary)> {
        let geometry =
            DisplaySurface::new(ImageUtils::dimensions(image), Dimensions::from(container));
        let transform = geometry.transform()?;

        let mut frame = ImageUtils::letterbox(image, &transform, container);
        let (overlay, summary) = self.overlay(&geometry, batch);
        ImageUtils::composite(&mut frame, &overlay);
        Ok((frame, summary))
    }

    /// Load and annotate a single job
    pub fn run(&self, job: &AnnotationJob) -> Result<(RgbaImage, RenderSummary)> {
        let image = ImageUtils::load(&job.image_path)?;
        let result = self.annotate(&image, job.batch.as_ref(), job.container)?;
        info!(
            path = ?job.image_path,
            plates = result.1.plates_drawn,
            skipped = result.1.skipped.len(),
            "annotated"
        );
        Ok(result)
    }

    /// Annotate many images, in parallel with the `parallel` feature
    pub fn run_batch(&self, jobs: &[AnnotationJob]) -> Vec<Result<(RgbaImage, RenderSummary)>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            jobs.par_iter().map(|job| self.run(job)).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            jobs.iter().map(|job| self.run(job)).collect()
        }
    }
}
