use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tonic::{Request, Response, Status};

use crate::classifier::Classifier;
use crate::engine::Runtime;
use crate::error::ClassifyError;
use crate::grpc;
use crate::postprocess::Classification;

/// gRPC front end for a [`Classifier`].
pub struct LabelService<R: Runtime> {
    classifier: std::sync::Arc<Classifier<R>>,
}

impl<R: Runtime> std::fmt::Debug for LabelService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelService")
            .field("classifier", &self.classifier.state())
            .finish()
    }
}

impl<R: Runtime> LabelService<R> {
    /// Creates a service answering with the given, already initialized, classifier.
    pub fn new(classifier: std::sync::Arc<Classifier<R>>) -> Self {
        Self { classifier }
    }
}

/// Maps a pipeline failure onto the gRPC status returned to the caller.
pub fn to_status(err: ClassifyError) -> Status {
    let msg = err.to_string();
    match err {
        ClassifyError::Decode(_) => Status::invalid_argument(msg),
        ClassifyError::NotInitialized => Status::unavailable(msg),
        ClassifyError::Timeout(_) => Status::deadline_exceeded(msg),
        ClassifyError::UnsupportedTensorType(_)
        | ClassifyError::InvalidTensorShape(_)
        | ClassifyError::LabelIndexOutOfRange { .. } => Status::failed_precondition(msg),
        ClassifyError::Resource(_)
        | ClassifyError::ModelLoad(_)
        | ClassifyError::EngineInit(_)
        | ClassifyError::Inference(_) => Status::internal(msg),
    }
}

fn to_reply(results: Vec<Classification>) -> grpc::LabelReply {
    grpc::LabelReply {
        results: results
            .into_iter()
            .map(|c| grpc::LabelResult {
                label: c.label,
                confidence: c.confidence,
            })
            .collect(),
    }
}

#[tonic::async_trait]
impl<R: Runtime> grpc::algorithms_server::Algorithms for LabelService<R> {
    async fn label(
        &self,
        request: Request<grpc::LabelRequest>,
    ) -> Result<Response<grpc::LabelReply>, Status> {
        // 1. Decode transport encoding
        let image_data = STANDARD
            .decode(request.into_inner().base64_img)
            .map_err(|e| Status::invalid_argument(format!("Invalid base64 image: {}", e)))?;

        // 2. Classify
        let results = self.classifier.exec(image_data).await.map_err(|e| {
            tracing::warn!(error = %e, "label request failed");
            to_status(e)
        })?;

        // 3. Prepare response
        Ok(Response::new(to_reply(results)))
    }
}
