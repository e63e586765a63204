use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tonic::transport::Server;

use label_image::grpc::algorithms_server::AlgorithmsServer;
use label_image::{cli, Args, Classifier, LabelService, OrtRuntime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli::init_tracing(&args.log);

    let addr: SocketAddr = args
        .addr
        .parse()
        .with_context(|| format!("invalid bind address {}", args.addr))?;

    let classifier = Arc::new(Classifier::new(args.classifier_config(), OrtRuntime::new()));
    classifier
        .init()
        .await
        .with_context(|| format!("failed to initialize classifier from {}", args.model))?;

    let service = LabelService::new(Arc::clone(&classifier));
    tracing::info!(%addr, "label service listening");

    Server::builder()
        .add_service(AlgorithmsServer::new(service))
        .serve_with_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
