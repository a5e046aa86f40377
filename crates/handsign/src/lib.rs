//! Hand sign recognition.
//!
//! Takes the hand landmarks found by an external hand landmark detector, turns them into
//! position- and size-independent feature vectors ([`normalize`]), classifies those with a small
//! neural network ([`classifier`]), and draws the results on top of the displayed frame
//! ([`overlay`]).
//!
//! # Coordinates
//!
//! Landmarks use normalized image coordinates: X points to the right, Y points *down*, and both
//! range from 0.0 to 1.0 across the analyzed image. Pixel and view coordinates use the same axes.
//!
//! # Environment Variables
//!
//! Some defaults can be overridden by setting environment variables:
//!
//! * `HANDSIGN_MODEL`: Path of the keypoint classifier model used by
//!   [`GestureClassifier::from_config`][classifier::GestureClassifier::from_config]. Defaults to
//!   `keypoint_classifier.onnx`.
//! * `HANDSIGN_LABELS`: Path of a CSV file whose first column lists the class labels, used by
//!   [`LabelTable::from_config`][labels::LabelTable::from_config]. If unset, the built-in table is
//!   used.

use log::LevelFilter;

pub mod classifier;
pub mod config;
pub mod hand;
pub mod handoff;
pub mod history;
pub mod image;
pub mod iter;
pub mod labels;
pub mod landmark;
pub mod nn;
pub mod normalize;
pub mod overlay;
pub mod timer;
pub mod worker;

#[cfg(test)]
mod test;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and this library will log at *debug* level, the ONNX loader at *warn* level.
/// `RUST_LOG` overrides both.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
