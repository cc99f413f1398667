//! Recognition results: detected plates and the batch returned per call.

use crate::bbox::BoundingBox;
use serde::{Deserialize, Serialize};

/// One detected plate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlateResult {
    /// Recognised text. Empty when the plate was found but not read.
    #[serde(default)]
    pub plate_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Absolute box in source pixels, `None` when nothing was localized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_box: Option<BoundingBox>,
    /// Character boxes relative to the minimum corner of `plate_box`.
    #[serde(default)]
    pub char_boxes: Vec<BoundingBox>,
}

impl PlateResult {
    /// Create a plate with an outer box and no characters
    pub fn new(plate_number: impl Into<String>, plate_box: BoundingBox) -> Self {
        Self {
            plate_number: plate_number.into(),
            plate_box: Some(plate_box),
            ..Self::default()
        }
    }

    /// Set confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.plate_confidence = Some(confidence);
        self
    }

    /// Add a character box (relative to the plate box)
    pub fn with_char_box(mut self, char_box: BoundingBox) -> Self {
        self.char_boxes.push(char_box);
        self
    }

    /// Plate confidence, falling back to the generic confidence field.
    pub fn best_confidence(&self) -> Option<f64> {
        self.plate_confidence.or(self.confidence)
    }

    pub fn is_localized(&self) -> bool {
        self.plate_box.is_some()
    }

    pub fn is_read(&self) -> bool {
        !self.plate_number.is_empty()
    }
}

/// All plates returned by one recognition call, in service order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionBatch {
    #[serde(default)]
    pub plates: Vec<PlateResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken_ms: Option<f64>,
}

impl DetectionBatch {
    /// Create new empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from vector of plates
    pub fn from_vec(plates: Vec<PlateResult>) -> Self {
        Self {
            plates,
            time_taken_ms: None,
        }
    }

    /// Set elapsed time reported by the service
    pub fn with_time_taken(mut self, time_taken_ms: f64) -> Self {
        self.time_taken_ms = Some(time_taken_ms);
        self
    }

    pub fn push(&mut self, plate: PlateResult) {
        self.plates.push(plate);
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    /// Plate by zero-based index
    pub fn get(&self, index: usize) -> Option<&PlateResult> {
        self.plates.get(index)
    }

    /// Plate by the 1-based number shown in overlay labels
    pub fn plate(&self, number: usize) -> Option<&PlateResult> {
        number.checked_sub(1).and_then(|index| self.plates.get(index))
    }

    /// Plates that carry an outer box, with their 1-based number
    pub fn localized(&self) -> impl Iterator<Item = (usize, &PlateResult)> {
        self.plates
            .iter()
            .enumerate()
            .filter(|(_, plate)| plate.is_localized())
            .map(|(index, plate)| (index + 1, plate))
    }

    /// Plate with the most recognised characters; earliest wins ties.
    pub fn best(&self) -> Option<&PlateResult> {
        self.plates
            .iter()
            .filter(|plate| plate.is_read())
            .fold(None, |best: Option<&PlateResult>, plate| match best {
                Some(current) if char_count(current) >= char_count(plate) => Some(current),
                _ => Some(plate),
            })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlateResult> {
        self.plates.iter()
    }

    /// Get statistics
    pub fn stats(&self) -> BatchStats {
        let mut total_confidence = 0.0;
        let mut scored = 0usize;
        let mut max_confidence: f64 = 0.0;
        let mut min_confidence = f64::INFINITY;

        for confidence in self.plates.iter().filter_map(PlateResult::best_confidence) {
            scored += 1;
            total_confidence += confidence;
            max_confidence = max_confidence.max(confidence);
            min_confidence = min_confidence.min(confidence);
        }

        let avg_confidence = if scored == 0 {
            0.0
        } else {
            total_confidence / scored as f64
        };

        BatchStats {
            total_plates: self.plates.len(),
            localized_plates: self.plates.iter().filter(|p| p.is_localized()).count(),
            character_boxes: self.plates.iter().map(|p| p.char_boxes.len()).sum(),
            avg_confidence,
            max_confidence,
            min_confidence: if min_confidence == f64::INFINITY { 0.0 } else { min_confidence },
        }
    }
}

fn char_count(plate: &PlateResult) -> usize {
    plate.plate_number.chars().count()
}

impl IntoIterator for DetectionBatch {
    type Item = PlateResult;
    type IntoIter = std::vec::IntoIter<PlateResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.plates.into_iter()
    }
}

impl<'a> IntoIterator for &'a DetectionBatch {
    type Item = &'a PlateResult;
    type IntoIter = std::slice::Iter<'a, PlateResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.plates.iter()
    }
}

impl FromIterator<PlateResult> for DetectionBatch {
    fn from_iter<T: IntoIterator<Item = PlateResult>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

/// Statistics about a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_plates: usize,
    pub localized_plates: usize,
    pub character_boxes: usize,
    pub avg_confidence: f64,
    pub max_confidence: f64,
    pub min_confidence: f64,
}
