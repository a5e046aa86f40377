//! Hand sign labels.

use std::{fmt, path::Path};

use anyhow::Context;

/// Labels of the bundled keypoint classifier, indexed by class.
///
/// The order matches the classifier's output layout and must not be changed.
pub const DEFAULT_LABELS: [&str; 27] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "L", "M", "N", "O", "P", "R", "S", "T", "U", "V",
    "W", "Y", "J", "K", "Q", "X", "Z", "Ñ",
];

/// Positional table mapping class indices to display labels.
#[derive(Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a label list from CSV text.
    ///
    /// Each non-empty row contributes its first column as one label. A leading UTF-8 byte order
    /// mark is ignored, as are double quotes around the label.
    ///
    /// Rows are split on line breaks before quotes are considered, so a quoted label cannot
    /// contain a line break: it would be read as two rows.
    pub fn from_csv(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Self::new(
            text.lines()
                .map(|line| line.trim_end_matches('\r'))
                .filter(|line| !line.is_empty())
                .map(first_column),
        )
    }

    /// Loads a label list from a CSV file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read label file '{}'", path.display()))?;
        let table = Self::from_csv(&text);
        log::debug!("loaded {} labels from '{}'", table.len(), path.display());
        Ok(table)
    }

    /// Loads the labels configured via `HANDSIGN_LABELS`, or returns the built-in table.
    pub fn from_config() -> anyhow::Result<Self> {
        match crate::config::labels_path()? {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Returns the label for class `index`, or [`None`] if the table has no such entry.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

fn first_column(line: &str) -> String {
    if let Some(quoted) = line.strip_prefix('"') {
        // `""` is an escaped quote inside a quoted field.
        let mut label = String::new();
        let mut chars = quoted.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    label.push('"');
                }
                '"' => break,
                c => label.push(c),
            }
        }
        label
    } else {
        line.split(',').next().unwrap_or_default().to_string()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new(DEFAULT_LABELS)
    }
}

impl fmt::Debug for LabelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.labels).finish()
    }
}
