//! Classifies the hands listed in a landmark file and draws the overlay onto an image.
//!
//! The landmark file has one hand per line: 21 comma-separated `x,y` pairs in normalized image
//! coordinates. The model and label table are taken from `HANDSIGN_MODEL` and `HANDSIGN_LABELS`.

use std::path::Path;

use anyhow::{bail, Context};
use handsign::{
    classifier::GestureClassifier,
    hand::NUM_LANDMARKS,
    image::Image,
    labels::LabelTable,
    landmark::{CaptureMode, DetectionResult, Landmarks},
    overlay::OverlayRenderer,
};

fn main() -> anyhow::Result<()> {
    handsign::init_logger!();

    let args = std::env::args_os().skip(1).collect::<Vec<_>>();
    let [image_path, landmark_path, output_path] = &args[..] else {
        eprintln!("usage: overlay <image> <landmarks.csv> <output>");
        std::process::exit(1);
    };

    let mut image = Image::load(image_path)?;
    let result = load_landmarks(Path::new(landmark_path))?;
    log::info!("{} hands in {}x{} image", result.len(), image.width(), image.height());

    let classifier = GestureClassifier::from_config()?;
    let mut renderer = OverlayRenderer::new(image.width(), image.height())
        .with_classifier(classifier)
        .with_labels(LabelTable::from_config()?);
    renderer.set_results(result, image.width(), image.height(), CaptureMode::Image);
    renderer.render(&mut image)?;

    image.save(output_path)?;
    Ok(())
}

fn load_landmarks(path: &Path) -> anyhow::Result<DetectionResult> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_hand(line).with_context(|| format!("line {}", i + 1)))
        .collect()
}

fn parse_hand(line: &str) -> anyhow::Result<Landmarks> {
    let values = line
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != NUM_LANDMARKS * 2 {
        bail!(
            "expected {} values, got {}",
            NUM_LANDMARKS * 2,
            values.len()
        );
    }
    Ok(Landmarks::from_xy(
        values.chunks_exact(2).map(|xy| (xy[0], xy[1])),
    ))
}
