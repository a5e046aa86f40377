//! Shared test fixtures.

use std::{
    ops::Range,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use crate::{
    classifier::Network,
    image::{Color, Rect},
    landmark::Landmarks,
    nn::tensor::Tensor,
    overlay::Canvas,
};

/// A real ONNX keypoint classifier taking 42 features and producing 27 scores.
///
/// It computes `softmax(x @ W + b)` with `W[i][j] = 1` where `j == i % 27` and `b[j] = 0.001 * j`:
/// all-zero features select class 26, a single `1.0` at feature `i` selects class `i % 27`.
/// Generated by `testdata/onnx/make_fixtures.py`.
pub const KEYPOINT_MODEL: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/testdata/onnx/keypoint_classifier_42x27.onnx"
));

/// Like [`KEYPOINT_MODEL`], but with 32 inputs and 4 classes, as a file path.
pub const POINT_HISTORY_MODEL_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/testdata/onnx/point_history_classifier_32x4.onnx"
);

/// Builds a hand whose landmarks land exactly on the given pixels of a `width`x`height` image.
pub fn hand_from_pixels(pixels: &[(i32, i32)], width: u32, height: u32) -> Landmarks {
    Landmarks::from_xy(
        pixels
            .iter()
            .map(|&(x, y)| (x as f32 / width as f32, y as f32 / height as f32)),
    )
}

/// Generates `n` random pixel positions.
pub fn random_hand(
    rng: &mut fastrand::Rng,
    n: usize,
    x: Range<i32>,
    y: Range<i32>,
) -> Vec<(i32, i32)> {
    (0..n)
        .map(|_| (rng.i32(x.clone()), rng.i32(y.clone())))
        .collect()
}

/// A [`Network`] that returns the same scores for every input.
pub struct FixedScores {
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    scores: Option<Vec<f32>>,
    seen: Arc<Mutex<Vec<Tensor>>>,
    dropped: Arc<AtomicBool>,
}

impl FixedScores {
    pub fn new(input_len: usize, scores: &[f32]) -> Self {
        Self {
            input_shape: vec![1, input_len],
            output_shape: vec![1, scores.len()],
            scores: Some(scores.to_vec()),
            seen: Arc::default(),
            dropped: Arc::default(),
        }
    }

    /// A network whose every inference fails.
    pub fn failing(input_len: usize, output_len: usize) -> Self {
        let mut network = Self::new(input_len, &[]);
        network.output_shape = vec![1, output_len];
        network.scores = None;
        network
    }

    pub fn with_input_shape(mut self, shape: &[usize]) -> Self {
        self.input_shape = shape.to_vec();
        self
    }

    /// Declares `len` outputs without changing the scores that are returned.
    pub fn with_declared_outputs(mut self, len: usize) -> Self {
        self.output_shape = vec![1, len];
        self
    }

    /// Every input tensor passed to [`Network::infer`].
    pub fn seen_inputs(&self) -> Arc<Mutex<Vec<Tensor>>> {
        self.seen.clone()
    }

    /// Set once the network has been dropped.
    pub fn dropped_flag(&self) -> Arc<AtomicBool> {
        self.dropped.clone()
    }
}

impl Network for FixedScores {
    fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    fn infer(&self, input: Tensor) -> anyhow::Result<Tensor> {
        self.seen.lock().unwrap().push(input);
        match &self.scores {
            Some(scores) => Ok(Tensor::from_iter(&[1, scores.len()], scores.iter().copied())),
            None => anyhow::bail!("inference failed"),
        }
    }
}

impl Drop for FixedScores {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Point([f32; 2]),
    Line([f32; 2], [f32; 2]),
    FillRect(Rect, Color),
    Text(String, [f32; 2]),
}

/// A [`Canvas`] that records all draw calls.
#[derive(Default)]
pub struct RecordingCanvas {
    pub ops: Vec<Op>,
}

impl RecordingCanvas {
    pub fn points(&self) -> Vec<[f32; 2]> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Point(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn lines(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::Line(..)))
            .count()
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::FillRect(rect, _) => Some(*rect),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Text(text, _) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn point(&mut self, x: f32, y: f32, _color: Color, _size: u32) {
        self.ops.push(Op::Point([x, y]));
    }

    fn line(&mut self, from: [f32; 2], to: [f32; 2], _color: Color, _width: u32) {
        self.ops.push(Op::Line(from, to));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(Op::FillRect(rect, color));
    }

    fn text(&mut self, x: f32, y: f32, text: &str, _color: Color) {
        self.ops.push(Op::Text(text.to_string(), [x, y]));
    }
}
