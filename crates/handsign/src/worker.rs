//! Background worker threads.
//!
//! A [`Worker`] owns a thread that processes messages delivered through a single-slot handoff
//! ([`crate::handoff`]). Sending never blocks; if the thread is still busy, a newer message replaces
//! the one it has not picked up yet.

use std::{
    io,
    panic::resume_unwind,
    thread::{self, JoinHandle},
};

use crate::{
    classifier::{ClassifyError, GestureClassifier},
    handoff::{slot, SlotReader, SlotWriter},
    landmark::DetectionFrame,
    normalize::normalize,
    timer::FpsCounter,
};

/// A builder object that can be used to configure and spawn a [`Worker`].
#[derive(Clone, Default)]
pub struct WorkerBuilder {
    name: Option<String>,
}

impl WorkerBuilder {
    /// Sets the name of the [`Worker`] thread.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Spawns a [`Worker`] thread that uses `handler` to process incoming messages.
    pub fn spawn<I, F>(self, mut handler: F) -> io::Result<Worker<I>>
    where
        I: Send + 'static,
        F: FnMut(I) + Send + 'static,
    {
        let (writer, reader) = slot();
        let mut builder = thread::Builder::new();
        if let Some(name) = self.name.clone() {
            builder = builder.name(name);
        }
        let name = self.name.unwrap_or_else(|| "<unnamed>".into());
        let handle = builder.spawn(move || {
            log::trace!("worker '{name}' starting");
            while let Some(message) = reader.wait() {
                handler(message);
            }
            log::trace!("worker '{name}' exiting");
        })?;

        Ok(Worker {
            writer: Some(writer),
            handle: Some(handle),
        })
    }
}

/// A handle to a worker thread that processes messages of type `I`.
///
/// When dropped, the slot feeding the thread is closed and the thread is joined. If the thread has
/// panicked, the panic will be forwarded to the thread dropping the `Worker`.
pub struct Worker<I: Send + 'static> {
    writer: Option<SlotWriter<I>>,
    handle: Option<JoinHandle<()>>,
}

impl<I: Send + 'static> Drop for Worker<I> {
    fn drop(&mut self) {
        // Close the slot to signal the thread to exit.
        drop(self.writer.take());

        self.wait_for_exit();
    }
}

impl Worker<()> {
    /// Returns a builder that can be used to configure and spawn a [`Worker`].
    #[inline]
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::default()
    }
}

impl<I: Send + 'static> Worker<I> {
    fn wait_for_exit(&mut self) {
        // Wait for it to exit and propagate its panic if it panicked.
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => {}
                Err(payload) => {
                    if !thread::panicking() {
                        resume_unwind(payload);
                    }
                }
            }
        }
    }

    /// Returns whether the worker thread has stopped, which only happens if it panicked.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Hands a message to the worker thread, replacing any message it has not started on yet.
    ///
    /// This does not block. If the worker has panicked, this will propagate the panic to the
    /// calling thread.
    pub fn send(&mut self, msg: I) {
        if self.is_finished() {
            self.wait_for_exit();
            return;
        }
        if let Some(writer) = &mut self.writer {
            writer.publish(msg);
        }
    }
}

/// A [`DetectionFrame`] together with the hand sign index of each of its hands.
#[derive(Debug)]
pub struct ClassifiedFrame {
    pub frame: DetectionFrame,
    /// One entry per hand in `frame.result`, or the error that stopped classification.
    ///
    /// An entry is [`None`] only if the model has no output classes.
    pub labels: Result<Vec<Option<usize>>, ClassifyError>,
}

/// Runs a [`GestureClassifier`] on a background thread.
///
/// Frames sent to the worker are normalized and classified hand by hand; the newest result can be
/// fetched with [`ClassifierWorker::latest`]. Frames arriving faster than they can be classified
/// are skipped.
pub struct ClassifierWorker {
    worker: Worker<DetectionFrame>,
    results: SlotReader<ClassifiedFrame>,
}

impl ClassifierWorker {
    /// Moves `classifier` onto a new worker thread.
    pub fn spawn(mut classifier: GestureClassifier) -> io::Result<Self> {
        let (mut out, results) = slot();
        let mut fps = FpsCounter::new("classifier");
        let worker = Worker::builder()
            .name("classifier")
            .spawn(move |frame: DetectionFrame| {
                let labels = classify_frame(&mut classifier, &frame);
                if let Err(e) = &labels {
                    log::warn!("failed to classify frame: {e}");
                }
                out.publish(ClassifiedFrame { frame, labels });
                fps.tick_with([classifier.timer()]);
            })?;

        Ok(Self { worker, results })
    }

    /// Submits a frame for classification.
    pub fn send(&mut self, frame: DetectionFrame) {
        self.worker.send(frame);
    }

    /// Returns the most recent classification result that has not been fetched yet.
    pub fn latest(&self) -> Option<ClassifiedFrame> {
        self.results.latest()
    }

    /// Blocks until the next classification result is available.
    ///
    /// Returns [`None`] if the worker thread has stopped.
    pub fn wait(&self) -> Option<ClassifiedFrame> {
        self.results.wait()
    }
}

/// Classifies every hand in `frame`, stopping at the first hand that fails.
pub fn classify_frame(
    classifier: &mut GestureClassifier,
    frame: &DetectionFrame,
) -> Result<Vec<Option<usize>>, ClassifyError> {
    frame
        .result
        .hands()
        .iter()
        .map(|hand| {
            let features = normalize(hand, frame.image_width, frame.image_height);
            classifier.classify(&features)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{
        panic::{catch_unwind, AssertUnwindSafe},
        sync::mpsc,
        time::Duration,
    };

    use super::*;
    use crate::{
        landmark::{CaptureMode, DetectionResult, Landmarks},
        test::FixedScores,
    };

    fn silent_panic(payload: String) {
        resume_unwind(Box::new(payload));
    }

    fn wait_until_finished<I: Send>(worker: &Worker<I>) {
        while !worker.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn processes_messages() {
        let (tx, rx) = mpsc::channel();
        let mut worker = Worker::builder()
            .name("echo")
            .spawn(move |msg: u32| tx.send(msg).unwrap())
            .unwrap();
        worker.send(7);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(7));
        drop(worker);
        // The handler (and its sender) is dropped once the thread exits.
        assert!(rx.recv().is_err());
    }

    #[test]
    fn worker_propagates_panic_on_drop() {
        let mut worker = Worker::builder()
            .spawn(|_: ()| silent_panic("worker panic".into()))
            .unwrap();
        worker.send(());
        catch_unwind(AssertUnwindSafe(|| drop(worker))).unwrap_err();
    }

    #[test]
    fn worker_propagates_panic_on_send() {
        let mut worker = Worker::builder()
            .spawn(|_| silent_panic("worker panic".into()))
            .unwrap();
        worker.send(());
        wait_until_finished(&worker);
        catch_unwind(AssertUnwindSafe(|| worker.send(()))).unwrap_err();
        catch_unwind(AssertUnwindSafe(|| drop(worker))).unwrap();
    }

    fn frame(hands: impl IntoIterator<Item = Landmarks>) -> DetectionFrame {
        DetectionFrame {
            result: hands.into_iter().collect(),
            image_width: 640,
            image_height: 480,
            mode: CaptureMode::Video,
        }
    }

    #[test]
    fn classifies_frames() {
        let classifier = GestureClassifier::new(FixedScores::new(4, &[0.1, 0.8, 0.1])).unwrap();
        let mut worker = ClassifierWorker::spawn(classifier).unwrap();

        let frame = frame([
            Landmarks::from_xy([(0.1, 0.1), (0.2, 0.3)]),
            Landmarks::from_xy([(0.5, 0.5), (0.6, 0.4)]),
        ]);
        worker.send(frame.clone());

        let classified = worker.wait().unwrap();
        assert_eq!(classified.frame, frame);
        assert_eq!(classified.labels.unwrap(), [Some(1), Some(1)]);
        assert!(worker.latest().is_none());
    }

    #[test]
    fn forwards_classify_errors() {
        let classifier = GestureClassifier::new(FixedScores::new(4, &[0.1, 0.8, 0.1])).unwrap();
        let mut worker = ClassifierWorker::spawn(classifier).unwrap();

        worker.send(frame([
            Landmarks::from_xy([(0.1, 0.1), (0.2, 0.3)]),
            // Wrong number of landmarks for the model.
            Landmarks::from_xy([(0.1, 0.1)]),
        ]));

        let classified = worker.wait().unwrap();
        assert!(matches!(
            classified.labels,
            Err(ClassifyError::InputLength {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn released_classifier_is_reported() {
        let mut classifier = GestureClassifier::new(FixedScores::new(4, &[1.0])).unwrap();
        classifier.release().unwrap();
        let hand = frame([Landmarks::from_xy([(0.1, 0.1), (0.2, 0.3)])]);
        assert!(matches!(
            classify_frame(&mut classifier, &hand),
            Err(ClassifyError::Released)
        ));
    }

    #[test]
    fn empty_frame_classifies_to_nothing() {
        let mut classifier = GestureClassifier::new(FixedScores::new(4, &[1.0])).unwrap();
        assert!(classify_frame(&mut classifier, &frame([])).unwrap().is_empty());
    }
}
