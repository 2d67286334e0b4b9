//! Fetch and decode shells from the command line.
//!
//! Each positional argument is `kind:url`, e.g. `batch:cube/batch_0.json`.
//! Every worker event is printed to stdout as one JSON line.

use std::collections::VecDeque;
use std::sync::Arc;

use clap::Parser;
use shell_loader::{Coordinator, DEFAULT_WORKER_COUNT, Error, HttpFetcher, LoaderConfig, RequestKind};

#[derive(Parser, Debug)]
#[command(name = "shell-fetch", about = "Fetch and decode CAD shells")]
struct Args {
    /// Number of concurrent workers.
    #[arg(short, long, default_value_t = DEFAULT_WORKER_COUNT)]
    workers: u32,

    /// Base URL that relative request URLs are resolved against.
    #[arg(short, long)]
    base_url: Option<String>,

    /// Requests as `kind:url`, where kind is assembly, annotation, shell or batch.
    #[arg(required = true)]
    requests: Vec<String>,
}

fn parse_request(arg: &str) -> Result<(RequestKind, String), shell_loader::Error> {
    let (kind, url) = arg
        .split_once(':')
        .ok_or_else(|| shell_loader::Error::InvalidRequestKind(arg.to_string()))?;
    Ok((kind.parse()?, url.to_string()))
}

#[tokio::main]
async fn main() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut queue = VecDeque::new();
    for arg in &args.requests {
        match parse_request(arg) {
            Ok(request) => queue.push_back(request),
            Err(e) => {
                tracing::error!("{}", e);
                std::process::exit(2);
            }
        }
    }

    let mut fetcher = HttpFetcher::new();
    if let Some(base_url) = args.base_url {
        fetcher = fetcher.with_base_url(base_url);
    }

    let config = LoaderConfig::default().with_worker_count(args.workers);
    let mut coordinator = Coordinator::spawn(Arc::new(fetcher), &config);

    loop {
        while let Some((kind, url)) = queue.front() {
            match coordinator.dispatch_next(url.clone(), *kind) {
                Ok(Some(worker_id)) => {
                    tracing::debug!(worker = worker_id, %url, "dispatched");
                    queue.pop_front();
                }
                Ok(None) => break,
                Err(Error::WorkerStopped(worker_id)) => {
                    tracing::warn!(worker = worker_id, "worker stopped, retrying on another");
                }
                Err(e) => {
                    tracing::error!("failed to dispatch {}: {}", url, e);
                    queue.pop_front();
                }
            }
        }

        let Some((_, event)) = coordinator.next_any().await else {
            if queue.is_empty() {
                break;
            }
            if coordinator.live_count() == 0 {
                tracing::error!(remaining = queue.len(), "every worker has stopped");
                break;
            }
            continue;
        };

        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!("failed to serialize {} event: {}", event.kind(), e),
        }
    }

    coordinator.shutdown().await;
    tracing::info!("all requests complete");
}
