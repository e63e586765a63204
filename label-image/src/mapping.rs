use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::ClassifyError;

/// Label strings indexed by model output position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(Vec<String>);

impl Labels {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up the label for output position `index`.
    pub fn get(&self, index: usize) -> Result<&str, ClassifyError> {
        self.0
            .get(index)
            .map(String::as_str)
            .ok_or(ClassifyError::LabelIndexOutOfRange {
                index,
                len: self.0.len(),
            })
    }
}

impl From<Vec<&str>> for Labels {
    fn from(labels: Vec<&str>) -> Self {
        Self(labels.into_iter().map(str::to_string).collect())
    }
}

/// Reads one label per line, keeping order and duplicates.
pub fn load_labels(file_path: impl AsRef<Path>) -> Result<Labels, ClassifyError> {
    let file_path = file_path.as_ref();
    let resource_err = |e: std::io::Error| {
        ClassifyError::Resource(format!("{}: {}", file_path.display(), e))
    };
    let file = File::open(file_path).map_err(resource_err)?;
    let reader = BufReader::new(file);

    let labels = reader
        .lines()
        .collect::<Result<Vec<String>, _>>()
        .map_err(resource_err)?;

    Ok(Labels(labels))
}
