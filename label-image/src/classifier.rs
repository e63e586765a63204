use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;

use crate::engine::{DType, EngineOptions, ErrorReporter, InferenceEngine, Runtime};
use crate::error::ClassifyError;
use crate::mapping::{load_labels, Labels};
use crate::postprocess::{postprocess, Classification};
use crate::preprocess::{decode, Processor};

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    pub label_path: PathBuf,
    pub num_threads: usize,
    /// Upper bound on a single `exec`; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl ClassifierConfig {
    pub fn new(model_path: impl Into<PathBuf>, label_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            label_path: label_path.into(),
            num_threads: 4,
            request_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Ready,
}

/// Everything `init` produces. Shared by all requests afterwards.
struct Ready<E> {
    labels: Labels,
    processor: Processor,
    input_dtype: DType,
    output_size: usize,
    engine: Mutex<E>,
}

/// Classifies images with a single model loaded once per process.
pub struct Classifier<R: Runtime> {
    config: ClassifierConfig,
    runtime: R,
    reporter: Option<ErrorReporter>,
    ready: OnceCell<Arc<Ready<R::Engine>>>,
}

impl<R: Runtime> Classifier<R> {
    pub fn new(config: ClassifierConfig, runtime: R) -> Self {
        Self {
            config,
            runtime,
            reporter: None,
            ready: OnceCell::new(),
        }
    }

    /// Replaces the default log sink for engine diagnostics.
    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        if self.ready.initialized() {
            State::Ready
        } else {
            State::Uninitialized
        }
    }

    /// Loads labels and the model. Concurrent callers wait for a single
    /// initialization; once it succeeded later calls return immediately.
    /// A failed attempt leaves the classifier uninitialized.
    pub async fn init(&self) -> Result<(), ClassifyError> {
        self.ready
            .get_or_try_init(|| async { self.load().map(Arc::new) })
            .await?;
        Ok(())
    }

    fn load(&self) -> Result<Ready<R::Engine>, ClassifyError> {
        let t = Instant::now();
        let labels = match load_labels(&self.config.label_path) {
            Ok(labels) => labels,
            Err(e) => {
                tracing::warn!(error = %e, "label catalog unavailable, every lookup will fail");
                Labels::default()
            }
        };

        let mut options = EngineOptions {
            num_threads: self.config.num_threads,
            ..EngineOptions::default()
        };
        if let Some(reporter) = &self.reporter {
            options.reporter = reporter.clone();
        }
        let engine = self.runtime.load(&self.config.model_path, &options)?;

        let processor = Processor::from_desc(engine.input())?;
        let output_size = engine
            .output()
            .shape
            .last()
            .ok_or_else(|| ClassifyError::InvalidTensorShape("output tensor is a scalar".into()))?;

        if labels.len() < output_size {
            tracing::warn!(
                labels = labels.len(),
                outputs = output_size,
                "label catalog is shorter than the model output"
            );
        }
        tracing::info!(
            runtime = self.runtime.name(),
            layout = ?processor.layout,
            output_size,
            elapsed = ?t.elapsed(),
            "classifier ready"
        );

        Ok(Ready {
            labels,
            processor,
            input_dtype: engine.input().dtype.clone(),
            output_size,
            engine: Mutex::new(engine),
        })
    }

    /// Classifies one encoded image.
    pub async fn exec(&self, image_bytes: Vec<u8>) -> Result<Vec<Classification>, ClassifyError> {
        let ready = self.ready.get().ok_or(ClassifyError::NotInitialized)?.clone();

        let task = tokio::task::spawn_blocking(move || run_pipeline(&ready, &image_bytes));
        let joined = match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| ClassifyError::Timeout(limit))?,
            None => task.await,
        };
        joined.map_err(|e| ClassifyError::Inference(format!("classification task failed: {}", e)))?
    }
}

fn run_pipeline<E: InferenceEngine>(
    ready: &Ready<E>,
    image_bytes: &[u8],
) -> Result<Vec<Classification>, ClassifyError> {
    let t = Instant::now();
    let image = decode(image_bytes)?;

    let input = ready.processor.preprocess(&image, &ready.input_dtype)?;
    let preprocess_time = t.elapsed();

    let t = Instant::now();
    let mut output = vec![0u8; ready.output_size];
    {
        let mut engine = ready
            .engine
            .lock()
            .map_err(|_| ClassifyError::Inference("engine lock poisoned".into()))?;
        engine.copy_in(&input)?;
        engine.invoke()?;
        engine.copy_out(&mut output)?;
    }
    let model_time = t.elapsed();

    let t = Instant::now();
    let results = postprocess(&output, &ready.labels)?;
    tracing::debug!(
        preprocess = ?preprocess_time,
        model = ?model_time,
        postprocess = ?t.elapsed(),
        results = results.len(),
        "classified image"
    );
    Ok(results)
}
