use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Element encoding of a tensor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DType {
    U8,
    I8,
    F16,
    F32,
    I32,
    I64,
    Other(String),
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => write!(f, "u8"),
            Self::I8 => write!(f, "i8"),
            Self::F16 => write!(f, "f16"),
            Self::F32 => write!(f, "f32"),
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.to_vec())
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }
    pub fn dim(&self, i: usize) -> Option<usize> {
        self.0.get(i).copied()
    }
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }
    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>().max(1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorDesc {
    pub dtype: DType,
    pub shape: Shape,
}

impl TensorDesc {
    pub fn new(dtype: DType, dims: &[usize]) -> Self {
        Self {
            dtype,
            shape: Shape::from_slice(dims),
        }
    }
}

/// Sink for load-time engine diagnostics that do not fail the load, such as
/// an assumed batch size. Failures come back as `EngineError` instead.
/// ONNX Runtime's own log output is routed through `tracing`.
pub type ErrorReporter = Arc<dyn Fn(&str) + Send + Sync>;

pub fn log_reporter() -> ErrorReporter {
    Arc::new(|msg: &str| tracing::warn!(target: "engine", "{}", msg))
}

#[derive(Clone)]
pub struct EngineOptions {
    /// Worker threads for the forward pass.
    pub num_threads: usize,
    pub reporter: ErrorReporter,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            num_threads: 4,
            reporter: log_reporter(),
        }
    }
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("num_threads", &self.num_threads)
            .field("reporter", &"<fn>")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("failed to allocate tensors: {0}")]
    Allocate(String),
    #[error("failed to copy input: {0}")]
    CopyIn(String),
    #[error("invoke failed: {0}")]
    Invoke(String),
    #[error("failed to copy output: {0}")]
    CopyOut(String),
}

/// Loads a model file into a ready-to-run engine.
pub trait Runtime: Send + Sync + 'static {
    type Engine: InferenceEngine;

    fn name(&self) -> &'static str;

    /// Loads the model, applies `options` and allocates the engine's tensors.
    fn load(&self, model_path: &Path, options: &EngineOptions) -> Result<Self::Engine, EngineError>;
}

/// A loaded model with a single input and a single output tensor.
///
/// `invoke` mutates engine-owned buffers, so callers must not run
/// `copy_in`/`invoke`/`copy_out` for two requests at once.
/// Dropping the engine releases it.
pub trait InferenceEngine: Send + 'static {
    fn input(&self) -> &TensorDesc;
    fn output(&self) -> &TensorDesc;
    fn copy_in(&mut self, bytes: &[u8]) -> Result<(), EngineError>;
    fn invoke(&mut self) -> Result<(), EngineError>;
    /// Copies the first `buf.len()` bytes of the output tensor into `buf`.
    fn copy_out(&self, buf: &mut [u8]) -> Result<(), EngineError>;
}
