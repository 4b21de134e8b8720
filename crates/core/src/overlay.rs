//! Detection overlay derivation.
//!
//! Pure functions that map the latest [`ScanResult`] for a feed onto
//! renderable annotation rectangles positioned in the feed's
//! display-surface coordinate space. Annotations are derived wholesale
//! each time the result changes -- they are never merged with
//! annotations from a superseded result.
//!
//! Bounding boxes arrive from the engine as raw pixel offsets and are
//! placed with an identity mapping; [`Annotation::fits_within`] lets
//! callers detect boxes that fall outside the rendered surface.

use serde::Serialize;

use crate::types::ScanResult;

/// Axis-aligned rectangle in surface-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Rendered size of an entity's display surface.
///
/// Supplied by the presentation layer's geometry provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SurfaceGeometry {
    pub width: u32,
    pub height: u32,
}

/// One renderable detection overlay: a labelled, confidence-tagged
/// rectangle over the feed's display surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub label: String,
    /// Model confidence in `0.0..=1.0`.
    pub confidence: f64,
    pub rect: Rect,
}

impl Annotation {
    /// Badge text rendered over the box, e.g. `"PERSON 92%"`.
    pub fn caption(&self) -> String {
        let pct = (self.confidence * 100.0).round() as i64;
        format!("{} {pct}%", self.label.to_uppercase())
    }

    /// Whether the rectangle lies entirely inside the surface.
    pub fn fits_within(&self, surface: &SurfaceGeometry) -> bool {
        self.rect.x >= 0
            && self.rect.y >= 0
            && self.rect.x.saturating_add(self.rect.width) <= surface.width as i32
            && self.rect.y.saturating_add(self.rect.height) <= surface.height as i32
    }
}

/// Derive the full annotation set for a feed from its current scan
/// result.
///
/// Produces exactly one annotation per detected object. The returned
/// list replaces any previously derived annotations for the entity.
pub fn reconcile_annotations(scan: &ScanResult, _surface: &SurfaceGeometry) -> Vec<Annotation> {
    scan.detected_objects
        .iter()
        .map(|det| {
            let [x, y, width, height] = det.bbox;
            Annotation {
                label: det.label.clone(),
                confidence: det.confidence,
                rect: Rect {
                    x,
                    y,
                    width,
                    height,
                },
            }
        })
        .collect()
}
