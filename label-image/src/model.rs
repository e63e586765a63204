use std::path::Path;

use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};

use crate::engine::{
    DType, EngineError, EngineOptions, ErrorReporter, InferenceEngine, Runtime, TensorDesc,
};

/// ONNX Runtime backed model loader.
#[derive(Debug, Default)]
pub struct OrtRuntime;

impl OrtRuntime {
    pub fn new() -> Self {
        Self
    }
}

pub struct OrtEngine {
    session: Session,
    input_name: String,
    input: TensorDesc,
    output: TensorDesc,
    staged: Option<Tensor<u8>>,
    output_buf: Vec<u8>,
}

impl Runtime for OrtRuntime {
    type Engine = OrtEngine;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn load(&self, model_path: &Path, options: &EngineOptions) -> Result<OrtEngine, EngineError> {
        if !model_path.is_file() {
            return Err(EngineError::ModelLoad(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        let session = SessionBuilder::new()
            .and_then(|b| b.with_intra_threads(options.num_threads))
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| EngineError::ModelLoad(e.to_string()))?;

        if session.inputs.len() > 1 || session.outputs.len() > 1 {
            (options.reporter)(&format!(
                "model has {} inputs and {} outputs, only the first of each is used",
                session.inputs.len(),
                session.outputs.len()
            ));
        }

        let input = session
            .inputs
            .first()
            .ok_or_else(|| EngineError::Allocate("model has no inputs".into()))?;
        let input_name = input.name.clone();
        let input_desc =
            resolve_desc(&input.input_type, &options.reporter).map_err(EngineError::Allocate)?;

        let output = session
            .outputs
            .first()
            .ok_or_else(|| EngineError::Allocate("model has no outputs".into()))?;
        let output_desc =
            resolve_desc(&output.output_type, &options.reporter).map_err(EngineError::Allocate)?;

        tracing::info!(
            model = %model_path.display(),
            input = ?input_desc,
            output = ?output_desc,
            threads = options.num_threads,
            "loaded onnx model"
        );

        Ok(OrtEngine {
            session,
            input_name,
            output_buf: vec![0; output_desc.shape.numel()],
            input: input_desc,
            output: output_desc,
            staged: None,
        })
    }
}

impl InferenceEngine for OrtEngine {
    fn input(&self) -> &TensorDesc {
        &self.input
    }

    fn output(&self) -> &TensorDesc {
        &self.output
    }

    fn copy_in(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        if self.input.dtype != DType::U8 {
            return Err(EngineError::CopyIn(format!(
                "input tensor is {}, expected u8",
                self.input.dtype
            )));
        }
        let expected = self.input.shape.numel();
        if bytes.len() != expected {
            return Err(EngineError::CopyIn(format!(
                "input byte size mismatch: got {}, expected {}",
                bytes.len(),
                expected
            )));
        }
        let tensor = Tensor::from_array((self.input.shape.0.clone(), bytes.to_vec()))
            .map_err(|e| EngineError::CopyIn(e.to_string()))?;
        self.staged = Some(tensor);
        Ok(())
    }

    fn invoke(&mut self) -> Result<(), EngineError> {
        let staged = self
            .staged
            .take()
            .ok_or_else(|| EngineError::Invoke("no input staged".into()))?;

        let outputs = self
            .session
            .run(vec![(self.input_name.as_str(), staged)])
            .map_err(|e| EngineError::Invoke(e.to_string()))?;
        let (_, data) = outputs[0]
            .try_extract_raw_tensor::<u8>()
            .map_err(|e| EngineError::Invoke(e.to_string()))?;
        copy_output(&mut self.output_buf, data).map_err(EngineError::Invoke)
    }

    fn copy_out(&self, buf: &mut [u8]) -> Result<(), EngineError> {
        if self.output.dtype != DType::U8 {
            return Err(EngineError::CopyOut(format!(
                "output tensor is {}, expected u8",
                self.output.dtype
            )));
        }
        let src = self.output_buf.get(..buf.len()).ok_or_else(|| {
            EngineError::CopyOut(format!(
                "requested {} bytes from a {} byte output",
                buf.len(),
                self.output_buf.len()
            ))
        })?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

impl Drop for OrtEngine {
    fn drop(&mut self) {
        tracing::debug!(input = %self.input_name, "releasing onnx session");
    }
}

/// Fills the output staging buffer. The model must produce exactly the
/// element count its output descriptor declares.
fn copy_output(dst: &mut [u8], data: &[u8]) -> Result<(), String> {
    if data.len() != dst.len() {
        return Err(format!(
            "output has {} bytes, expected {}",
            data.len(),
            dst.len()
        ));
    }
    dst.copy_from_slice(data);
    Ok(())
}

/// Turns an ort value type into a concrete descriptor. A dynamic leading
/// batch axis becomes 1 and is reported; any other dynamic axis cannot be
/// allocated.
fn resolve_desc(value_type: &ValueType, reporter: &ErrorReporter) -> Result<TensorDesc, String> {
    let ValueType::Tensor { ty, dimensions, .. } = value_type else {
        return Err("unsupported non-tensor IO value type".into());
    };

    let dims = dimensions
        .iter()
        .enumerate()
        .map(|(axis, &d)| match (axis, d) {
            (_, d) if d > 0 => Ok(d as usize),
            (0, _) => {
                reporter("dynamic batch axis, assuming batch size 1");
                Ok(1)
            }
            (axis, _) => Err(format!("dynamic dimension on axis {}", axis)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TensorDesc::new(dtype_from_ort(*ty), &dims))
}

fn dtype_from_ort(ty: TensorElementType) -> DType {
    match ty {
        TensorElementType::Uint8 => DType::U8,
        TensorElementType::Int8 => DType::I8,
        TensorElementType::Float16 => DType::F16,
        TensorElementType::Float32 => DType::F32,
        TensorElementType::Int32 => DType::I32,
        TensorElementType::Int64 => DType::I64,
        other => DType::Other(format!("{:?}", other)),
    }
}
