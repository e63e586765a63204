use std::time::Duration;

use crate::engine::{DType, EngineError};

/// Errors raised while starting the classifier or serving a request.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// A label or model file could not be opened or read.
    #[error("Resource error: {0}")]
    Resource(String),
    #[error("Model load error: {0}")]
    ModelLoad(String),
    #[error("Engine init error: {0}")]
    EngineInit(String),
    /// The request bytes are not a recognized image.
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Unsupported tensor type: {0}")]
    UnsupportedTensorType(DType),
    #[error("Invalid tensor shape: {0}")]
    InvalidTensorShape(String),
    #[error("Inference error: {0}")]
    Inference(String),
    #[error("Label index {index} out of range for {len} labels")]
    LabelIndexOutOfRange { index: usize, len: usize },
    #[error("Classifier is not initialized")]
    NotInitialized,
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl ClassifyError {
    /// Startup failures that must keep the process from serving. A missing
    /// label catalog is not one of them: `init` carries on with an empty
    /// catalog.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ModelLoad(_) | Self::EngineInit(_))
    }
}

impl From<EngineError> for ClassifyError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ModelLoad(msg) => ClassifyError::ModelLoad(msg),
            EngineError::Allocate(msg) => ClassifyError::EngineInit(msg),
            EngineError::CopyIn(msg) | EngineError::Invoke(msg) | EngineError::CopyOut(msg) => {
                ClassifyError::Inference(msg)
            }
        }
    }
}
