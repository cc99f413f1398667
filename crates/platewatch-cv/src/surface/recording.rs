//! Surface that records draw calls instead of rasterizing them.

use crate::overlay::{StrokeStyle, TextStyle};
use crate::traits::DrawingSurface;
use platewatch_core::DisplayRect;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Resize { width: u32, height: u32 },
    Clear,
    StrokeRect { rect: DisplayRect, style: StrokeStyle },
    FillText { text: String, x: f64, y: f64, style: TextStyle },
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call since the surface was created.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Calls made after the most recent clear, i.e. what is visible now.
    pub fn visible(&self) -> &[DrawCommand] {
        let start = self
            .commands
            .iter()
            .rposition(|c| matches!(c, DrawCommand::Clear | DrawCommand::Resize { .. }))
            .map_or(0, |i| i + 1);
        &self.commands[start..]
    }

    /// Visible rectangles
    pub fn strokes(&self) -> Vec<DisplayRect> {
        self.visible()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::StrokeRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }

    /// Visible labels
    pub fn texts(&self) -> Vec<String> {
        self.visible()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillText { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self.visible())
    }
}

impl DrawingSurface for RecordingSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.commands.push(DrawCommand::Resize { width, height });
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn stroke_rect(&mut self, rect: DisplayRect, style: &StrokeStyle) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            style: style.clone(),
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
            style: style.clone(),
        });
    }
}
