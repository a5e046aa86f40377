//! Environment variable overrides.
//!
//! Each variable is read once, on first use, and its effective value is logged at *debug* level.

use std::{
    env::{self, VarError},
    path::{Path, PathBuf},
    sync::OnceLock,
};

/// Model file used when `HANDSIGN_MODEL` is unset.
pub const DEFAULT_MODEL_PATH: &str = "keypoint_classifier.onnx";

const MODEL_VAR: &str = "HANDSIGN_MODEL";
const LABELS_VAR: &str = "HANDSIGN_LABELS";

type Setting = Result<Option<PathBuf>, String>;

static MODEL: OnceLock<Setting> = OnceLock::new();
static LABELS: OnceLock<Setting> = OnceLock::new();

fn read_path(var: &str) -> Setting {
    match env::var(var) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(PathBuf::from(value))),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(s)) => Err(format!(
            "invalid value set for `{var}` variable: {}",
            s.to_string_lossy()
        )),
    }
}

fn get(cell: &'static OnceLock<Setting>, var: &str) -> anyhow::Result<Option<&'static Path>> {
    let setting = cell.get_or_init(|| {
        let setting = read_path(var);
        log::debug!("{var}: {:?}", setting);
        setting
    });
    match setting {
        Ok(path) => Ok(path.as_deref()),
        Err(msg) => Err(anyhow::anyhow!("{msg}")),
    }
}

/// Returns the path of the keypoint classifier model.
///
/// This is the value of `HANDSIGN_MODEL`, or [`DEFAULT_MODEL_PATH`] if that is unset or empty.
pub fn model_path() -> anyhow::Result<&'static Path> {
    Ok(get(&MODEL, MODEL_VAR)?.unwrap_or(Path::new(DEFAULT_MODEL_PATH)))
}

/// Returns the path of the label CSV file set via `HANDSIGN_LABELS`, if any.
///
/// [`None`] means the built-in label table should be used.
pub fn labels_path() -> anyhow::Result<Option<&'static Path>> {
    get(&LABELS, LABELS_VAR)
}
