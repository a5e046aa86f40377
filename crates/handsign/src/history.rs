//! Finger gestures from fingertip trajectories.
//!
//! While a hand shows the pointing sign, the position of its index fingertip is recorded in a
//! [`PointHistory`]. Once the history is full, its normalized trajectory can be fed to a second
//! classifier that recognizes motions (drawing a circle, swiping, ...). Per-frame results of that
//! classifier are noisy, so [`GestureVote`] smooths them by majority vote.

use std::collections::VecDeque;

use itertools::Itertools;

use crate::{
    classifier::{ClassifyError, GestureClassifier},
    hand::LandmarkIdx,
    landmark::PixelPoint,
    normalize::FeatureVector,
};

/// Number of frames tracked by [`PointHistory`] and [`GestureVote`].
pub const HISTORY_LEN: usize = 16;

/// Hand sign that starts fingertip tracking.
pub const POINTER_SIGN: usize = 8;

/// Ring buffer of recent index fingertip positions.
#[derive(Debug, Clone)]
pub struct PointHistory {
    points: VecDeque<PixelPoint>,
    capacity: usize,
    pointer_sign: usize,
}

impl PointHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            pointer_sign: POINTER_SIGN,
        }
    }

    /// Sets the hand sign index that counts as "pointing".
    pub fn with_pointer_sign(self, sign: usize) -> Self {
        Self {
            pointer_sign: sign,
            ..self
        }
    }

    /// Appends a point, evicting the oldest one if the history is full.
    pub fn push(&mut self, point: PixelPoint) {
        if self.capacity == 0 {
            return;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Appends a placeholder for a frame without a tracked fingertip.
    pub fn push_none(&mut self) {
        self.push(PixelPoint::new(0, 0));
    }

    /// Records the index fingertip of `points` if `hand_sign` is the pointing sign, or a placeholder
    /// otherwise.
    pub fn track_hand(&mut self, hand_sign: Option<usize>, points: &[PixelPoint]) {
        let tip = points.get(LandmarkIdx::IndexFingerTip as usize);
        match (hand_sign, tip) {
            (Some(sign), Some(&tip)) if sign == self.pointer_sign => self.push(tip),
            _ => self.push_none(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.points.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Returns the recorded trajectory relative to its oldest point, with x divided by the image
    /// width and y by the image height.
    pub fn to_features(&self, image_width: u32, image_height: u32) -> FeatureVector {
        let Some(&base) = self.points.front() else {
            return FeatureVector::default();
        };
        let (w, h) = (image_width.max(1) as f32, image_height.max(1) as f32);
        self.points
            .iter()
            .flat_map(|pt| [(pt.x - base.x) as f32 / w, (pt.y - base.y) as f32 / h])
            .collect::<Vec<_>>()
            .into()
    }
}

impl Default for PointHistory {
    fn default() -> Self {
        Self::new(HISTORY_LEN)
    }
}

/// Majority vote over the most recent gesture ids.
#[derive(Debug, Clone)]
pub struct GestureVote {
    ids: VecDeque<usize>,
    capacity: usize,
}

impl GestureVote {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, id: usize) {
        if self.capacity == 0 {
            return;
        }
        if self.ids.len() == self.capacity {
            self.ids.pop_front();
        }
        self.ids.push_back(id);
    }

    /// Returns the most frequent id in the window.
    ///
    /// On ties, the id that occurs first in the window wins.
    pub fn most_common(&self) -> Option<usize> {
        let counts = self.ids.iter().counts();
        self.ids
            .iter()
            .unique()
            .fold(None, |best, id| match best {
                Some((_, n)) if counts[id] <= n => best,
                _ => Some((*id, counts[id])),
            })
            .map(|(id, _)| id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

impl Default for GestureVote {
    fn default() -> Self {
        Self::new(HISTORY_LEN)
    }
}

/// Recognizes finger gestures of one tracked hand.
///
/// Combines a [`PointHistory`], a point history classifier, and a [`GestureVote`].
pub struct FingerGestureTracker {
    history: PointHistory,
    vote: GestureVote,
    classifier: GestureClassifier,
}

impl FingerGestureTracker {
    /// Creates a tracker around a point history classifier.
    ///
    /// The classifier must take `2 * HISTORY_LEN` inputs.
    pub fn new(classifier: GestureClassifier) -> anyhow::Result<Self> {
        let expected = HISTORY_LEN * 2;
        anyhow::ensure!(
            classifier.input_len() == expected,
            "point history classifier takes {} inputs, expected {}",
            classifier.input_len(),
            expected,
        );
        Ok(Self {
            history: PointHistory::default(),
            vote: GestureVote::default(),
            classifier,
        })
    }

    pub fn history(&self) -> &PointHistory {
        &self.history
    }

    /// Processes one frame and returns the smoothed finger gesture id.
    ///
    /// `hand_sign` is the keypoint classifier's result for the hand, `points` are its landmarks in
    /// pixel space. Until the history has filled up, gesture 0 is assumed.
    pub fn update(
        &mut self,
        hand_sign: Option<usize>,
        points: &[PixelPoint],
        image_width: u32,
        image_height: u32,
    ) -> Result<Option<usize>, ClassifyError> {
        // The trajectory is taken before the current frame is recorded.
        let features = self.history.to_features(image_width, image_height);
        self.history.track_hand(hand_sign, points);

        let gesture = if features.len() == self.classifier.input_len() {
            self.classifier.classify(&features)?.unwrap_or(0)
        } else {
            0
        };
        self.vote.push(gesture);
        let smoothed = self.vote.most_common();
        log::trace!("finger gesture {} -> {:?}", gesture, smoothed);
        Ok(smoothed)
    }

    /// Forgets the tracked trajectory, for example when the hand is lost.
    pub fn reset(&mut self) {
        self.history.clear();
        self.vote.clear();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{hand::NUM_LANDMARKS, test::FixedScores};

    fn hand_with_tip(x: i32, y: i32) -> Vec<PixelPoint> {
        let mut points = vec![PixelPoint::new(0, 0); NUM_LANDMARKS];
        points[LandmarkIdx::IndexFingerTip as usize] = PixelPoint::new(x, y);
        points
    }

    #[test]
    fn history_evicts_oldest() {
        let mut history = PointHistory::new(3);
        for i in 0..5 {
            history.push(PixelPoint::new(i, i * 10));
        }
        assert_eq!(history.len(), 3);
        assert!(history.is_full());
        let features = history.to_features(100, 100);
        assert_eq!(features.len(), 6);
        assert_abs_diff_eq!(features.as_slice(), &[0.0, 0.0, 0.01, 0.1, 0.02, 0.2][..]);
    }

    #[test]
    fn history_normalizes_per_axis() {
        let mut history = PointHistory::new(2);
        history.push(PixelPoint::new(100, 100));
        history.push(PixelPoint::new(420, 340));
        let features = history.to_features(640, 480);
        assert_abs_diff_eq!(features.as_slice(), &[0.0, 0.0, 0.5, 0.5][..]);

        assert!(PointHistory::new(2).to_features(640, 480).is_empty());
    }

    #[test]
    fn tracks_only_pointer_sign() {
        let mut history = PointHistory::new(4);
        history.track_hand(Some(POINTER_SIGN), &hand_with_tip(30, 40));
        history.track_hand(Some(0), &hand_with_tip(50, 60));
        history.track_hand(None, &hand_with_tip(50, 60));
        // Not enough landmarks.
        history.track_hand(Some(POINTER_SIGN), &[PixelPoint::new(1, 1)]);
        assert_eq!(
            history.points.iter().copied().collect::<Vec<_>>(),
            [
                PixelPoint::new(30, 40),
                PixelPoint::new(0, 0),
                PixelPoint::new(0, 0),
                PixelPoint::new(0, 0),
            ]
        );

        let mut history = PointHistory::new(1).with_pointer_sign(3);
        history.track_hand(Some(3), &hand_with_tip(7, 8));
        assert_eq!(history.points[0], PixelPoint::new(7, 8));
    }

    #[test]
    fn vote_majority() {
        let mut vote = GestureVote::new(5);
        assert_eq!(vote.most_common(), None);
        for id in [2, 1, 1, 3, 1] {
            vote.push(id);
        }
        assert_eq!(vote.most_common(), Some(1));
    }

    #[test]
    fn vote_tie_goes_to_earliest() {
        let mut vote = GestureVote::new(4);
        for id in [3, 2, 2, 3] {
            vote.push(id);
        }
        assert_eq!(vote.most_common(), Some(3));

        // Pushing evicts the leading 3, so 2 now occurs first.
        vote.push(0);
        vote.push(0);
        assert_eq!(vote.ids.iter().copied().collect::<Vec<_>>(), [2, 3, 0, 0]);
        assert_eq!(vote.most_common(), Some(0));
        vote.push(2);
        assert_eq!(vote.most_common(), Some(0));
    }

    #[test]
    fn tracker_waits_for_full_history() {
        let network = FixedScores::new(HISTORY_LEN * 2, &[0.1, 0.2, 0.9, 0.3]);
        let seen = network.seen_inputs();
        let classifier = GestureClassifier::new(network).unwrap();
        let mut tracker = FingerGestureTracker::new(classifier).unwrap();

        // The classifier only runs once the history held a full trajectory before the frame.
        for i in 0..HISTORY_LEN {
            let gesture = tracker
                .update(Some(POINTER_SIGN), &hand_with_tip(i as i32, 0), 640, 480)
                .unwrap();
            assert_eq!(gesture, Some(0));
        }
        assert!(seen.lock().unwrap().is_empty());

        let mut gesture = None;
        for _ in 0..9 {
            gesture = tracker
                .update(Some(POINTER_SIGN), &hand_with_tip(0, 0), 640, 480)
                .unwrap();
        }
        assert_eq!(seen.lock().unwrap().len(), 9);
        // The window now holds 7 zeros and 9 twos.
        assert_eq!(gesture, Some(2));

        tracker.reset();
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn tracker_checks_input_len() {
        let classifier = GestureClassifier::new(FixedScores::new(42, &[1.0])).unwrap();
        assert!(FingerGestureTracker::new(classifier).is_err());
    }
}
