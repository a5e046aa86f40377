//! Landmark containers produced by an external hand landmark detector.
//!
//! Landmark coordinates are *normalized*: `x` and `y` are in range 0.0 to 1.0 relative to the width
//! and height of the image the detector was run on. Depth estimates are not used by anything in
//! this crate and are not stored.
//!
//! The order of landmarks within a hand is defined by the detector and is significant: skeleton
//! connections and the classifier's feature layout both refer to landmarks by index. Nothing in
//! this module ever reorders them.

use std::{fmt, slice};

/// A single detected landmark.
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy, Default)]
pub struct Landmark {
    pos: [f32; 2],
}

impl Landmark {
    pub fn from_xy(x: f32, y: f32) -> Self {
        Self { pos: [x, y] }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.pos[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.pos[1]
    }
}

/// The ordered landmarks of a single hand.
#[derive(Clone, PartialEq, Default)]
pub struct Landmarks {
    landmarks: Box<[Landmark]>,
}

impl Landmarks {
    /// Creates a new [`Landmarks`] collection containing `len` landmarks at the origin.
    pub fn new(len: usize) -> Self {
        Self {
            landmarks: vec![Landmark::default(); len].into_boxed_slice(),
        }
    }

    /// Creates a landmark list from normalized `(x, y)` pairs.
    pub fn from_xy<I: IntoIterator<Item = (f32, f32)>>(points: I) -> Self {
        points
            .into_iter()
            .map(|(x, y)| Landmark::from_xy(x, y))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Landmark> {
        self.landmarks.iter()
    }

}

impl FromIterator<Landmark> for Landmarks {
    fn from_iter<T: IntoIterator<Item = Landmark>>(iter: T) -> Self {
        Self {
            landmarks: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Landmarks {
    type Item = &'a Landmark;
    type IntoIter = slice::Iter<'a, Landmark>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Landmarks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.landmarks.iter().map(|lm| (lm.x(), lm.y())))
            .finish()
    }
}

/// A landmark position in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// All hands found by the detector in one frame, in detector order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionResult {
    hands: Vec<Landmarks>,
}

impl DetectionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hand: Landmarks) {
        self.hands.push(hand);
    }

    pub fn hands(&self) -> &[Landmarks] {
        &self.hands
    }

    pub fn len(&self) -> usize {
        self.hands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

impl FromIterator<Landmarks> for DetectionResult {
    fn from_iter<T: IntoIterator<Item = Landmarks>>(iter: T) -> Self {
        Self {
            hands: iter.into_iter().collect(),
        }
    }
}

/// Where the frames handed to the detector come from.
///
/// This decides how detector coordinates are scaled onto the view, see
/// [`ViewGeometry`][crate::overlay::ViewGeometry].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// A single still image.
    #[default]
    Image,
    /// Frames decoded from a video file.
    Video,
    /// A live camera feed, displayed by a preview surface that fills the view.
    LiveStream,
}

/// A [`DetectionResult`] tagged with the geometry of the frame it was computed from.
///
/// This is the unit of work that is handed from the detection thread to the classifier and
/// renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFrame {
    pub result: DetectionResult,
    pub image_width: u32,
    pub image_height: u32,
    pub mode: CaptureMode,
}
