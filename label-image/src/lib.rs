pub mod grpc;
pub mod engine;
pub mod error;
pub mod preprocess;
pub mod model;
pub mod cli;
pub mod mapping;
pub mod postprocess;
pub mod classifier;
pub mod service;

pub use crate::model::{OrtEngine, OrtRuntime};
pub use crate::grpc::{LabelRequest, LabelReply, LabelResult};
pub use crate::engine::{
    DType, EngineError, EngineOptions, ErrorReporter, InferenceEngine, Runtime, Shape, TensorDesc,
};
pub use crate::error::ClassifyError;
pub use crate::preprocess::{InputLayout, Processor};
pub use crate::cli::{Args, ClientArgs};
pub use crate::mapping::{load_labels, Labels};
pub use crate::postprocess::{Classification, CONFIDENCE_THRESHOLD};
pub use crate::classifier::{Classifier, ClassifierConfig, State};
pub use crate::service::LabelService;
