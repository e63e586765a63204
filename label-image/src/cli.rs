use clap::Parser;


#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Image labelling gRPC server", long_about = None)]
pub struct Args {
    /// ONNX model path
    #[arg(long, required = true)]
    pub model: String,

    /// label file, one label per line
    #[arg(long, required = true)]
    pub labels: String,

    /// gRPC bind address
    #[arg(long, default_value_t = String::from("0.0.0.0:12345"))]
    pub addr: String,

    /// worker threads for the forward pass
    #[arg(long, default_value_t = 4)]
    pub threads: usize,

    /// fail requests that take longer than this many milliseconds
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,

    /// default log filter when RUST_LOG is unset
    #[arg(long, default_value_t = String::from("info"))]
    pub log: String,
}

impl Args {
    pub fn classifier_config(&self) -> crate::ClassifierConfig {
        let mut config = crate::ClassifierConfig::new(&self.model, &self.labels);
        config.num_threads = self.threads;
        config.request_timeout = self.request_timeout_ms.map(std::time::Duration::from_millis);
        config
    }
}

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Sends one image to the labelling server", long_about = None)]
pub struct ClientArgs {
    /// server endpoint
    #[arg(long, default_value_t = String::from("http://127.0.0.1:12345"))]
    pub addr: String,

    /// image path
    #[arg(long, required = true)]
    pub image: String,
}

/// Installs the global tracing subscriber. `RUST_LOG` wins over `default`.
pub fn init_tracing(default: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
