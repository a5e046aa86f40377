//! Keypoint classification.
//!
//! A [`GestureClassifier`] maps the [`FeatureVector`] of one hand to the index of a hand sign. The
//! model behind it is anything implementing [`Network`]; normally that is an ONNX
//! [`NeuralNetwork`].

use std::path::Path;

use anyhow::{bail, Context};
use thiserror::Error;

use crate::{
    hand::NUM_LANDMARKS,
    iter::first_max_position,
    nn::{tensor::Tensor, Inputs, Loader, NeuralNetwork},
    normalize::FeatureVector,
    timer::Timer,
};

/// Length of the feature vector of a standard 21-landmark hand.
pub const FEATURE_LEN: usize = NUM_LANDMARKS * 2;

/// A model with a single `f32` input and output.
///
/// Shapes are either `[1, N]` or `[N]`.
pub trait Network: Send {
    fn input_shape(&self) -> &[usize];

    fn output_shape(&self) -> &[usize];

    /// Performs one forward pass.
    fn infer(&self, input: Tensor) -> anyhow::Result<Tensor>;
}

impl Network for NeuralNetwork {
    fn input_shape(&self) -> &[usize] {
        self.inputs().next().map(|info| info.shape()).unwrap_or(&[])
    }

    fn output_shape(&self) -> &[usize] {
        self.outputs().next().map(|info| info.shape()).unwrap_or(&[])
    }

    fn infer(&self, input: Tensor) -> anyhow::Result<Tensor> {
        self.estimate(&Inputs::from(input))?
            .into_first()
            .context("network produced no output")
    }
}

/// Contract violations reported by [`GestureClassifier`].
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// The feature vector does not have the length the model expects.
    #[error("feature vector has {actual} values, but the model expects {expected}")]
    InputLength { expected: usize, actual: usize },

    /// The model returned a different number of scores than it declared.
    #[error("model returned {actual} scores, but declared {expected}")]
    OutputShape { expected: usize, actual: usize },

    /// The model has already been released.
    #[error("classifier model has been released")]
    Released,

    /// The inference engine failed.
    #[error(transparent)]
    Inference(#[from] anyhow::Error),
}

/// Classifies hand landmarks into hand sign indices.
///
/// Inference takes `&mut self`, so a classifier can only ever run one forward pass at a time. Move
/// it into a [`ClassifierWorker`][crate::worker::ClassifierWorker] to run it off the render
/// thread.
pub struct GestureClassifier {
    network: Option<Box<dyn Network>>,
    input_len: usize,
    output_len: usize,
    timer: Timer,
}

impl GestureClassifier {
    /// Creates a classifier from an already loaded model.
    ///
    /// Returns an error if the model's input or output shape is unsupported.
    pub fn new<N: Network + 'static>(network: N) -> anyhow::Result<Self> {
        let input_len = vector_len(network.input_shape()).context("unsupported model input")?;
        let output_len = vector_len(network.output_shape()).context("unsupported model output")?;
        log::debug!(
            "keypoint classifier: {} inputs, {} classes",
            input_len,
            output_len
        );

        Ok(Self {
            network: Some(Box::new(network)),
            input_len,
            output_len,
            timer: Timer::new("classify"),
        })
    }

    /// Loads the keypoint classifier model from an `.onnx` file.
    ///
    /// The model's input is pinned to `[1, FEATURE_LEN]`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::from_path_with_input_len(path, FEATURE_LEN)
    }

    /// Loads a classifier model taking `input_len` features from an `.onnx` file.
    ///
    /// This is used for models other than the keypoint classifier, such as the point history
    /// classifier (see [`crate::history`]).
    pub fn from_path_with_input_len<P: AsRef<Path>>(
        path: P,
        input_len: usize,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        Self::from_loader(NeuralNetwork::from_path(path)?, input_len)
            .with_context(|| format!("failed to load classifier from '{}'", path.display()))
    }

    /// Loads the keypoint classifier model from in-memory ONNX data.
    pub fn from_onnx(raw: &[u8]) -> anyhow::Result<Self> {
        Self::from_loader(NeuralNetwork::from_onnx(raw), FEATURE_LEN)
    }

    /// Loads the model configured via `HANDSIGN_MODEL`.
    pub fn from_config() -> anyhow::Result<Self> {
        Self::from_path(crate::config::model_path()?)
    }

    fn from_loader(loader: Loader<'_>, input_len: usize) -> anyhow::Result<Self> {
        let network = loader.with_input_shape([1, input_len]).load()?;
        if network.num_inputs() != 1 || network.num_outputs() == 0 {
            bail!(
                "classifier model must have 1 input and at least 1 output, got {} and {}",
                network.num_inputs(),
                network.num_outputs(),
            );
        }
        Self::new(network)
    }

    /// Returns the feature vector length the model expects.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Returns the number of classes the model distinguishes.
    pub fn output_len(&self) -> usize {
        self.output_len
    }

    /// Returns whether [`release`][Self::release] has been called.
    pub fn is_released(&self) -> bool {
        self.network.is_none()
    }

    /// Returns the timer that measures inference.
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Runs the model and returns its raw per-class scores.
    pub fn classify_scores(&mut self, features: &FeatureVector) -> Result<Vec<f32>, ClassifyError> {
        let network = self.network.as_deref().ok_or(ClassifyError::Released)?;
        if features.len() != self.input_len {
            return Err(ClassifyError::InputLength {
                expected: self.input_len,
                actual: features.len(),
            });
        }

        let input = Tensor::from_iter(&[1, self.input_len], features.iter().copied());
        let output = self.timer.time(|| network.infer(input))?;
        if output.len() != self.output_len {
            return Err(ClassifyError::OutputShape {
                expected: self.output_len,
                actual: output.len(),
            });
        }

        Ok(output.as_raw_data().to_vec())
    }

    /// Classifies a hand, returning the index of the highest-scoring class.
    ///
    /// Ties go to the lowest index. Returns `Ok(None)` if the model has no classes or produced only
    /// NaN scores.
    pub fn classify(&mut self, features: &FeatureVector) -> Result<Option<usize>, ClassifyError> {
        let scores = self.classify_scores(features)?;
        let class = first_max_position(scores.iter().copied());
        log::trace!("scores {:?} -> {:?}", scores, class);
        Ok(class)
    }

    /// Releases the model.
    ///
    /// Afterwards, all classification attempts fail with [`ClassifyError::Released`]. Releasing an
    /// already released classifier is an error as well.
    pub fn release(&mut self) -> Result<(), ClassifyError> {
        match self.network.take() {
            Some(network) => {
                drop(network);
                log::debug!("keypoint classifier released");
                Ok(())
            }
            None => Err(ClassifyError::Released),
        }
    }
}

impl Drop for GestureClassifier {
    fn drop(&mut self) {
        if self.network.is_some() {
            self.release().ok();
        }
    }
}

fn vector_len(shape: &[usize]) -> anyhow::Result<usize> {
    match *shape {
        [n] | [1, n] => Ok(n),
        _ => bail!("expected shape [1, N] or [N], got {:?}", shape),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        normalize::normalize,
        test::{hand_from_pixels, FixedScores, KEYPOINT_MODEL, POINT_HISTORY_MODEL_PATH},
    };

    fn features(len: usize) -> FeatureVector {
        vec![0.25; len].into()
    }

    #[test]
    fn picks_highest_score() {
        let mut classifier = GestureClassifier::new(FixedScores::new(4, &[0.1, 0.2, 0.9])).unwrap();
        assert_eq!(classifier.input_len(), 4);
        assert_eq!(classifier.output_len(), 3);
        assert_eq!(classifier.classify(&features(4)).unwrap(), Some(2));
        assert_eq!(
            classifier.classify_scores(&features(4)).unwrap(),
            [0.1, 0.2, 0.9]
        );
        assert_eq!(classifier.timer().count(), 2);
    }

    #[test]
    fn tie_goes_to_lowest_index() {
        let mut classifier = GestureClassifier::new(FixedScores::new(2, &[0.5, 0.5, 0.1])).unwrap();
        assert_eq!(classifier.classify(&features(2)).unwrap(), Some(0));
    }

    #[test]
    fn passes_features_as_row() {
        let network = FixedScores::new(3, &[1.0]);
        let seen = network.seen_inputs();
        let mut classifier = GestureClassifier::new(network).unwrap();
        classifier.classify(&vec![0.0, -0.5, 1.0].into()).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].shape(), [1, 3]);
        assert_eq!(seen[0].row(0), [0.0, -0.5, 1.0]);
    }

    #[test]
    fn wrong_input_length() {
        let network = FixedScores::new(FEATURE_LEN, &[1.0, 0.0]);
        let seen = network.seen_inputs();
        let mut classifier = GestureClassifier::new(network).unwrap();
        match classifier.classify(&features(40)) {
            Err(ClassifyError::InputLength {
                expected: 42,
                actual: 40,
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        // The model is never invoked with a bad vector.
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn wrong_output_length() {
        let network = FixedScores::new(2, &[1.0, 0.0]).with_declared_outputs(3);
        let mut classifier = GestureClassifier::new(network).unwrap();
        assert!(matches!(
            classifier.classify(&features(2)),
            Err(ClassifyError::OutputShape {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn empty_output() {
        let mut classifier = GestureClassifier::new(FixedScores::new(2, &[])).unwrap();
        assert_eq!(classifier.classify(&features(2)).unwrap(), None);
    }

    #[test]
    fn nan_scores() {
        let mut classifier =
            GestureClassifier::new(FixedScores::new(2, &[f32::NAN, 0.1, 0.3])).unwrap();
        assert_eq!(classifier.classify(&features(2)).unwrap(), Some(2));

        let mut classifier = GestureClassifier::new(FixedScores::new(2, &[f32::NAN])).unwrap();
        assert_eq!(classifier.classify(&features(2)).unwrap(), None);
    }

    #[test]
    fn inference_failure() {
        let mut classifier = GestureClassifier::new(FixedScores::failing(2, 3)).unwrap();
        let err = classifier.classify(&features(2)).unwrap_err();
        assert!(matches!(err, ClassifyError::Inference(_)), "{err:?}");
    }

    #[test]
    fn release() {
        let network = FixedScores::new(2, &[1.0]);
        let dropped = network.dropped_flag();
        let mut classifier = GestureClassifier::new(network).unwrap();
        assert!(!classifier.is_released());

        classifier.release().unwrap();
        assert!(classifier.is_released());
        assert!(dropped.load(std::sync::atomic::Ordering::SeqCst));
        assert!(matches!(
            classifier.classify(&features(2)),
            Err(ClassifyError::Released)
        ));
        assert!(matches!(classifier.release(), Err(ClassifyError::Released)));
    }

    #[test]
    fn drop_releases() {
        let network = FixedScores::new(2, &[1.0]);
        let dropped = network.dropped_flag();
        let classifier = GestureClassifier::new(network).unwrap();
        drop(classifier);
        assert!(dropped.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn shapes() {
        assert_eq!(vector_len(&[1, 42]).unwrap(), 42);
        assert_eq!(vector_len(&[27]).unwrap(), 27);
        assert!(vector_len(&[2, 42]).is_err());
        assert!(vector_len(&[1, 1, 42]).is_err());
        assert!(vector_len(&[]).is_err());

        let batched = FixedScores::new(2, &[1.0]).with_input_shape(&[4, 2]);
        assert!(GestureClassifier::new(batched).is_err());
    }

    #[test]
    fn missing_model() {
        assert!(GestureClassifier::from_path("/nonexistent/keypoint_classifier.onnx").is_err());
        assert!(GestureClassifier::from_onnx(b"not a model").is_err());
    }

    #[test]
    fn onnx_keypoint_model() {
        let mut classifier = GestureClassifier::from_onnx(KEYPOINT_MODEL).unwrap();
        assert_eq!(classifier.input_len(), FEATURE_LEN);
        assert_eq!(classifier.output_len(), 27);

        assert_eq!(
            classifier.classify(&vec![0.0; FEATURE_LEN].into()).unwrap(),
            Some(26)
        );

        let mut values = vec![0.0; FEATURE_LEN];
        values[30] = 1.0;
        let one_hot = FeatureVector::from(values);
        assert_eq!(classifier.classify(&one_hot).unwrap(), Some(3));
        let scores = classifier.classify_scores(&one_hot).unwrap();
        assert_eq!(scores.len(), 27);
        assert_abs_diff_eq!(scores.iter().sum::<f32>(), 1.0, epsilon = 1e-5);

        assert!(matches!(
            classifier.classify(&features(FEATURE_LEN - 1)),
            Err(ClassifyError::InputLength {
                expected: 42,
                actual: 41
            })
        ));

        classifier.release().unwrap();
        assert!(matches!(
            classifier.classify(&one_hot),
            Err(ClassifyError::Released)
        ));
    }

    #[test]
    fn onnx_model_classifies_normalized_hand() {
        let mut classifier = GestureClassifier::from_onnx(KEYPOINT_MODEL).unwrap();

        // Every landmark on the wrist except landmark 15, which sits to its right. After
        // normalization, the only non-zero feature is landmark 15's x (feature 30).
        let mut pixels = vec![(200, 300); NUM_LANDMARKS];
        pixels[15] = (260, 300);
        let hand = hand_from_pixels(&pixels, 640, 480);
        let features = normalize(&hand, 640, 480);
        assert_eq!(features[30], 1.0);
        assert_eq!(classifier.classify(&features).unwrap(), Some(3));
    }

    #[test]
    fn onnx_model_with_custom_input_len() {
        let mut classifier =
            GestureClassifier::from_path_with_input_len(POINT_HISTORY_MODEL_PATH, 32).unwrap();
        assert_eq!(classifier.input_len(), 32);
        assert_eq!(classifier.output_len(), 4);
        assert_eq!(classifier.classify(&vec![0.0; 32].into()).unwrap(), Some(3));

        // The model's weights do not fit a pinned input of the wrong length.
        assert!(GestureClassifier::from_path_with_input_len(POINT_HISTORY_MODEL_PATH, 42).is_err());
        assert!(GestureClassifier::from_path(POINT_HISTORY_MODEL_PATH).is_err());
    }
}
