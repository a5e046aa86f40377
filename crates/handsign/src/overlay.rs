//! Drawing classified hands on top of the displayed frame.
//!
//! The [`OverlayRenderer`] keeps the latest detection results and draws, for every hand, its
//! landmarks, its skeleton, a translucent bounding box, and the recognized hand sign in the middle
//! of that box. Drawing goes through the [`Canvas`] trait; [`Image`] implements it.

use crate::{
    classifier::{ClassifyError, GestureClassifier},
    hand,
    image::{draw, Color, Image, Rect},
    labels::LabelTable,
    landmark::{CaptureMode, DetectionFrame, DetectionResult, Landmark},
    normalize::normalize,
    worker::ClassifiedFrame,
};

/// A surface the overlay can be drawn on.
///
/// All coordinates are in view space.
pub trait Canvas {
    /// Draws a filled square of `size` pixels centered on `(x, y)`.
    fn point(&mut self, x: f32, y: f32, color: Color, size: u32);

    fn line(&mut self, from: [f32; 2], to: [f32; 2], color: Color, width: u32);

    /// Fills `rect`, blending `color` according to its alpha channel.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draws `text` centered on `(x, y)`.
    fn text(&mut self, x: f32, y: f32, text: &str, color: Color);
}

impl Canvas for Image {
    fn point(&mut self, x: f32, y: f32, color: Color, size: u32) {
        // Markers are centered, so their size has to be odd.
        draw::marker(self, x, y).color(color).size(size.max(1) | 1);
    }

    fn line(&mut self, from: [f32; 2], to: [f32; 2], color: Color, width: u32) {
        draw::line(self, from[0], from[1], to[0], to[1])
            .color(color)
            .stroke_width(width);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        draw::filled_rect(self, rect).color(color);
    }

    fn text(&mut self, x: f32, y: f32, text: &str, color: Color) {
        draw::text(self, x, y, text).color(color);
    }
}

/// Size of the view the overlay is displayed in, relative to the analyzed image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewGeometry {
    pub view_width: u32,
    pub view_height: u32,
    pub image_width: u32,
    pub image_height: u32,
    pub mode: CaptureMode,
}

impl ViewGeometry {
    /// Returns the factor that maps image pixels to view pixels.
    ///
    /// Still images and video frames are letterboxed into the view, so the image is scaled to fit.
    /// Live camera previews fill the whole view and get cropped, so the image is scaled to cover.
    pub fn scale_factor(&self) -> f32 {
        let sx = self.view_width as f32 / self.image_width.max(1) as f32;
        let sy = self.view_height as f32 / self.image_height.max(1) as f32;
        match self.mode {
            CaptureMode::Image | CaptureMode::Video => sx.min(sy),
            CaptureMode::LiveStream => sx.max(sy),
        }
    }

    /// Maps a normalized landmark into view space.
    pub fn to_view(&self, landmark: &Landmark) -> [f32; 2] {
        let scale = self.scale_factor();
        [
            landmark.x() * self.image_width as f32 * scale,
            landmark.y() * self.image_height as f32 * scale,
        ]
    }
}

/// Colors and sizes used by the [`OverlayRenderer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub point_color: Color,
    pub point_size: u32,
    pub line_color: Color,
    pub line_width: u32,
    /// Fill of the bounding box. Its alpha controls the box's opacity.
    pub box_color: Color,
    pub text_color: Color,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            point_color: Color::YELLOW,
            point_size: 8,
            line_color: Color::from_rgb8(0, 127, 139),
            line_width: 8,
            box_color: Color::BLACK.with_alpha(50),
            text_color: Color::WHITE,
        }
    }
}

/// Renders hand landmarks and their recognized hand signs.
///
/// Labels come from one of two places: if the results were set with
/// [`set_classified`][Self::set_classified], the labels computed there are used. Otherwise, hands
/// are classified while rendering, by the renderer's own classifier (if it has one).
pub struct OverlayRenderer {
    frame: Option<DetectionFrame>,
    labels: Option<Vec<Option<usize>>>,
    view_width: u32,
    view_height: u32,
    label_table: LabelTable,
    connections: Vec<(usize, usize)>,
    style: OverlayStyle,
    classifier: Option<GestureClassifier>,
}

impl OverlayRenderer {
    /// Creates a renderer for a view of the given size.
    pub fn new(view_width: u32, view_height: u32) -> Self {
        Self {
            frame: None,
            labels: None,
            view_width,
            view_height,
            label_table: LabelTable::default(),
            connections: hand::connections(),
            style: OverlayStyle::default(),
            classifier: None,
        }
    }

    /// Uses `classifier` to classify hands that come without precomputed labels.
    pub fn with_classifier(self, classifier: GestureClassifier) -> Self {
        Self {
            classifier: Some(classifier),
            ..self
        }
    }

    pub fn with_labels(self, label_table: LabelTable) -> Self {
        Self {
            label_table,
            ..self
        }
    }

    pub fn with_style(self, style: OverlayStyle) -> Self {
        Self { style, ..self }
    }

    /// Replaces the landmark index pairs that are connected when drawing the skeleton.
    ///
    /// Defaults to [`hand::CONNECTIVITY`].
    pub fn set_connections(&mut self, connections: Vec<(usize, usize)>) {
        self.connections = connections;
    }

    pub fn classifier(&self) -> Option<&GestureClassifier> {
        self.classifier.as_ref()
    }

    pub fn classifier_mut(&mut self) -> Option<&mut GestureClassifier> {
        self.classifier.as_mut()
    }

    /// Stores the detection results of one frame, to be labeled while rendering.
    pub fn set_results(
        &mut self,
        result: DetectionResult,
        image_width: u32,
        image_height: u32,
        mode: CaptureMode,
    ) {
        self.set_frame(DetectionFrame {
            result,
            image_width,
            image_height,
            mode,
        });
    }

    /// Like [`set_results`][Self::set_results], but takes a complete [`DetectionFrame`].
    pub fn set_frame(&mut self, frame: DetectionFrame) {
        self.frame = Some(frame);
        self.labels = None;
        self.log_geometry();
    }

    /// Stores detection results whose hands were already classified, for example by a
    /// [`ClassifierWorker`][crate::worker::ClassifierWorker].
    ///
    /// If classifying the frame failed, the stored results are cleared and the error is returned.
    pub fn set_classified(&mut self, classified: ClassifiedFrame) -> Result<(), ClassifyError> {
        let ClassifiedFrame { frame, labels } = classified;
        let labels = match labels {
            Ok(labels) => labels,
            Err(e) => {
                self.clear();
                return Err(e);
            }
        };
        self.frame = Some(frame);
        self.labels = Some(labels);
        self.log_geometry();
        Ok(())
    }

    /// Updates the size of the view the overlay is displayed in.
    pub fn set_view_size(&mut self, view_width: u32, view_height: u32) {
        self.view_width = view_width;
        self.view_height = view_height;
        self.log_geometry();
    }

    /// Returns the current view geometry, or [`None`] if no results have been set.
    pub fn geometry(&self) -> Option<ViewGeometry> {
        self.frame.as_ref().map(|frame| ViewGeometry {
            view_width: self.view_width,
            view_height: self.view_height,
            image_width: frame.image_width,
            image_height: frame.image_height,
            mode: frame.mode,
        })
    }

    /// Returns the image-to-view scale factor, `1.0` if no results have been set.
    pub fn scale_factor(&self) -> f32 {
        self.geometry().map_or(1.0, |g| g.scale_factor())
    }

    fn log_geometry(&self) {
        if let Some(geometry) = self.geometry() {
            log::trace!("{:?}: scale factor {}", geometry, geometry.scale_factor());
        }
    }

    /// Forgets the stored results. The classifier is kept.
    pub fn clear(&mut self) {
        self.frame = None;
        self.labels = None;
    }

    /// Draws the overlay for the stored results onto `canvas`.
    ///
    /// Nothing is drawn if no results are stored. Returns an error if classifying a hand fails.
    pub fn render<C: Canvas + ?Sized>(&mut self, canvas: &mut C) -> Result<(), ClassifyError> {
        let (Some(frame), Some(geometry)) = (&self.frame, self.geometry()) else {
            return Ok(());
        };

        for (i, hand) in frame.result.hands().iter().enumerate() {
            if hand.is_empty() {
                continue;
            }

            let label = match (&self.labels, &mut self.classifier) {
                (Some(labels), _) => labels.get(i).copied().flatten(),
                (None, Some(classifier)) => {
                    let features = normalize(hand, frame.image_width, frame.image_height);
                    classifier.classify(&features)?
                }
                (None, None) => None,
            };

            let points = hand
                .iter()
                .map(|lm| geometry.to_view(lm))
                .collect::<Vec<_>>();

            for &[x, y] in points.iter().filter(|p| is_finite(p)) {
                canvas.point(x, y, self.style.point_color, self.style.point_size);
            }

            for &(start, end) in &self.connections {
                match (points.get(start), points.get(end)) {
                    (Some(&from), Some(&to)) if is_finite(&from) && is_finite(&to) => {
                        canvas.line(from, to, self.style.line_color, self.style.line_width)
                    }
                    (Some(_), Some(_)) => {
                        log::trace!("skipping connection {}-{} with non-finite endpoint", start, end)
                    }
                    _ => log::trace!(
                        "skipping connection {}-{} for hand with {} landmarks",
                        start,
                        end,
                        points.len()
                    ),
                }
            }

            let Some(bounds) = Rect::bounding(points.iter().copied()) else {
                continue;
            };
            canvas.fill_rect(bounds, self.style.box_color);

            match label.and_then(|index| self.label_table.get(index)) {
                Some(text) => {
                    let [cx, cy] = bounds.center();
                    canvas.text(cx, cy, text, self.style.text_color);
                }
                None => log::trace!("no label for hand {} (class {:?})", i, label),
            }
        }

        Ok(())
    }
}

fn is_finite(point: &[f32; 2]) -> bool {
    point.iter().all(|c| c.is_finite())
}
