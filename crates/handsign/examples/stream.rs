//! Feeds a stream of synthetic detections through a classifier worker and renders the results.
//!
//! A producer thread publishes jittered hands at a high rate. The classifier only ever sees the
//! newest frame, and the render loop only ever draws the newest classification.

use std::{
    thread,
    time::{Duration, Instant},
};

use handsign::{
    classifier::GestureClassifier,
    hand::NUM_LANDMARKS,
    handoff::slot,
    image::{Color, Image},
    landmark::{CaptureMode, DetectionFrame, Landmarks},
    overlay::OverlayRenderer,
    timer::{FpsCounter, Timer},
    worker::ClassifierWorker,
};

const VIEW_WIDTH: u32 = 1280;
const VIEW_HEIGHT: u32 = 720;
const RUN_FOR: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    handsign::init_logger!();

    let mut worker = ClassifierWorker::spawn(GestureClassifier::from_config()?)?;

    let (mut frames, frame_reader) = slot();
    let producer = thread::Builder::new()
        .name("detector".into())
        .spawn(move || {
            let mut rng = fastrand::Rng::with_seed(0);
            let start = Instant::now();
            while start.elapsed() < RUN_FOR {
                frames.publish(synthetic_frame(&mut rng));
                thread::sleep(Duration::from_millis(2));
            }
        })?;

    let mut renderer = OverlayRenderer::new(VIEW_WIDTH, VIEW_HEIGHT);
    let mut canvas = Image::new(VIEW_WIDTH, VIEW_HEIGHT);
    let t_render = Timer::new("render");
    let mut fps = FpsCounter::new("overlay");
    while let Some(frame) = frame_reader.wait() {
        worker.send(frame);
        if let Some(classified) = worker.latest() {
            log::trace!("labels: {:?}", classified.labels);
            renderer.set_classified(classified)?;
        }

        t_render.time(|| {
            canvas.clear(Color::BLACK);
            renderer.render(&mut canvas)
        })?;
        fps.tick_with([&t_render]);
    }

    if producer.join().is_err() {
        anyhow::bail!("detector thread panicked");
    }
    canvas.save("stream.png")?;
    Ok(())
}

/// An open hand at a random position in a 640x480 frame.
fn synthetic_frame(rng: &mut fastrand::Rng) -> DetectionFrame {
    let (cx, cy) = (0.3 + rng.f32() * 0.4, 0.3 + rng.f32() * 0.4);
    let hand = Landmarks::from_xy((0..NUM_LANDMARKS).map(|i| {
        let finger = i.saturating_sub(1) / 4;
        let joint = (i.saturating_sub(1) % 4 + 1) as f32;
        let dx = (finger as f32 - 2.0) * 0.03;
        let dy = if i == 0 { 0.0 } else { -0.03 * joint };
        (cx + dx + rng.f32() * 0.005, cy + dy + rng.f32() * 0.005)
    }));
    DetectionFrame {
        result: [hand].into_iter().collect(),
        image_width: 640,
        image_height: 480,
        mode: CaptureMode::LiveStream,
    }
}
