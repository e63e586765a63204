use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::Parser;

use label_image::grpc::algorithms_client::AlgorithmsClient;
use label_image::{ClientArgs, LabelRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ClientArgs::parse();

    let input = std::fs::read(&args.image).with_context(|| format!("reading {}", args.image))?;
    let base64_img = STANDARD.encode(input);

    let mut client = AlgorithmsClient::connect(args.addr.clone())
        .await
        .with_context(|| format!("connecting to {}", args.addr))?;
    let reply = client
        .label(LabelRequest { base64_img })
        .await
        .context("label request failed")?
        .into_inner();

    for result in reply.results {
        println!("Label: {}, Confidence: {:.2}%", result.label, result.confidence * 100.0);
    }
    Ok(())
}
