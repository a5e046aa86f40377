//! Landmark normalization.
//!
//! Turns the landmarks of one hand into a [`FeatureVector`] that does not depend on where the hand
//! is in the frame or how large it appears. This is the exact preprocessing the keypoint classifier
//! was trained with, so any change here changes classification results.

use std::{ops::Index, slice};

use crate::image::Rect;
use crate::landmark::{Landmarks, PixelPoint};

/// Flattened, translation- and scale-normalized `(x, y)` offsets of one hand.
///
/// Contains `2 * N` values for a hand with `N` landmarks, all in range -1.0 to 1.0.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn iter(&self) -> slice::Iter<'_, f32> {
        self.values.iter()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}

impl Index<usize> for FeatureVector {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.values[index]
    }
}

/// Converts a single normalized coordinate to a pixel coordinate.
///
/// The result is rounded and clamped to `0..size`, so landmarks on (or slightly past) the image
/// edge map to the outermost pixel.
fn to_pixel(coord: f32, size: u32) -> i32 {
    let max = size.saturating_sub(1).min(i32::MAX as u32) as i32;
    ((coord * size as f32).round() as i32).clamp(0, max)
}

/// Maps every landmark of `hand` into the pixel space of a `width`x`height` image.
pub fn pixel_points(hand: &Landmarks, width: u32, height: u32) -> Vec<PixelPoint> {
    hand.iter()
        .map(|lm| PixelPoint::new(to_pixel(lm.x(), width), to_pixel(lm.y(), height)))
        .collect()
}

/// Computes the pixel-space bounding rectangle of a hand.
///
/// Returns [`None`] if the hand has no landmarks.
pub fn bounding_rect(hand: &Landmarks, width: u32, height: u32) -> Option<Rect> {
    Rect::bounding(
        pixel_points(hand, width, height)
            .into_iter()
            .map(|pt| [pt.x as f32, pt.y as f32]),
    )
}

/// Normalizes the landmarks of one hand into the classifier's input layout.
///
/// 1. Landmarks are converted to pixel coordinates (see [`pixel_points`]).
/// 2. All points are made relative to the first landmark (the wrist).
/// 3. The `(x, y)` pairs are flattened in landmark order.
/// 4. Everything is divided by the largest absolute value.
///
/// If all landmarks coincide, the result is all zeros.
pub fn normalize(hand: &Landmarks, image_width: u32, image_height: u32) -> FeatureVector {
    let points = pixel_points(hand, image_width, image_height);
    let Some(&base) = points.first() else {
        return FeatureVector::default();
    };

    let relative = points
        .iter()
        .flat_map(|pt| [pt.x - base.x, pt.y - base.y])
        .collect::<Vec<_>>();

    let max_abs = match relative.iter().map(|v| v.unsigned_abs()).max() {
        Some(0) | None => 1,
        Some(max) => max,
    };

    let max_abs = max_abs as f32;
    let values = relative.into_iter().map(|v| v as f32 / max_abs).collect();
    log::trace!("normalized {} landmarks, max offset {}", points.len(), max_abs);

    FeatureVector { values }
}
