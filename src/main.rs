use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docgate::config::GuardConfig;
use docgate::document::{Description, Document, Product};
use docgate::{DocumentClient, GuardError, Policy, TimeWindow};

/// Submit documents from concurrent workers through one shared rate limiter.
#[derive(Parser, Debug)]
#[command(name = "docgate", version)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum requests per window
    #[arg(long)]
    limit: Option<u64>,

    /// Window length as a time unit
    #[arg(long, value_enum, conflicts_with = "window_ms")]
    unit: Option<UnitArg>,

    /// Window length in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,

    /// Behaviour when the window is saturated
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Upper bound on a blocking wait in milliseconds
    #[arg(long)]
    max_wait_ms: Option<u64>,

    /// Override the document creation endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 5)]
    workers: usize,

    /// Requests sent by each worker
    #[arg(short, long, default_value_t = 10)]
    requests: usize,

    /// JSON file with the document to submit (a sample is used otherwise)
    #[arg(long)]
    document: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnitArg {
    Second,
    Minute,
    Hour,
    Day,
}

impl From<UnitArg> for TimeWindow {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Second => TimeWindow::Second,
            UnitArg::Minute => TimeWindow::Minute,
            UnitArg::Hour => TimeWindow::Hour,
            UnitArg::Day => TimeWindow::Day,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Blocking,
    Rejecting,
}

impl From<PolicyArg> for Policy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Blocking => Policy::Blocking,
            PolicyArg::Rejecting => Policy::Rejecting,
        }
    }
}

impl Args {
    /// Layer command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut GuardConfig) {
        if let Some(limit) = self.limit {
            config.limiter.request_limit = limit;
        }
        if let Some(unit) = self.unit {
            config.limiter.unit = Some(unit.into());
            config.limiter.window_ms = None;
        }
        if let Some(window_ms) = self.window_ms {
            config.limiter.window_ms = Some(window_ms);
            config.limiter.unit = None;
        }
        if let Some(policy) = self.policy {
            config.limiter.policy = policy.into();
        }
        if let Some(max_wait_ms) = self.max_wait_ms {
            config.limiter.max_wait_ms = Some(max_wait_ms);
        }
        if let Some(endpoint) = &self.endpoint {
            config.transport.endpoint = endpoint.clone();
        }
    }
}

/// Per-worker outcome counts.
#[derive(Debug, Default)]
struct WorkerReport {
    accepted: usize,
    rejected: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    info!("Starting docgate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => GuardConfig::from_file(path)?,
        None => GuardConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    info!(endpoint = %config.transport.endpoint, "Configuration loaded");

    let client = DocumentClient::from_config(&config)?;
    let limiter = client.limiter().config();
    info!(
        limit = limiter.request_limit(),
        window = ?limiter.window(),
        policy = ?limiter.policy(),
        max_wait = ?limiter.max_wait(),
        "Client ready"
    );

    let document = match &args.document {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => sample_document(),
    };
    let payload = Arc::new(document.to_payload()?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let handles: Vec<_> = (0..args.workers)
        .map(|worker| {
            tokio::spawn(run_worker(
                worker,
                args.requests,
                client.clone(),
                Arc::clone(&payload),
                shutdown_rx.clone(),
            ))
        })
        .collect();

    let mut total = WorkerReport::default();
    for result in futures::future::join_all(handles).await {
        let report = result?;
        total.accepted += report.accepted;
        total.rejected += report.rejected;
        total.failed += report.failed;
    }

    info!(
        accepted = total.accepted,
        rejected = total.rejected,
        failed = total.failed,
        "docgate finished"
    );
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_worker(
    worker: usize,
    requests: usize,
    client: DocumentClient<docgate::transport::HttpTransport>,
    payload: Arc<Vec<u8>>,
    shutdown: watch::Receiver<bool>,
) -> WorkerReport {
    let mut report = WorkerReport::default();

    for request in 0..requests {
        if *shutdown.borrow() {
            break;
        }

        let outcome = client
            .submit_with_cancel(payload.to_vec(), wait_for_shutdown(shutdown.clone()))
            .await;

        match outcome {
            Ok(response) => {
                info!(
                    worker,
                    request,
                    status = response.status,
                    body = %response.body,
                    "Document accepted"
                );
                report.accepted += 1;
            }
            Err(GuardError::Cancelled) => break,
            Err(e) => {
                warn!(worker, request, error = %e, "Request failed");
                report.record_failure(&e);
            }
        }
    }

    report
}

impl WorkerReport {
    /// Count a failed request; admission refusals are tallied apart from send failures.
    fn record_failure(&mut self, error: &GuardError) {
        if error.is_retryable() {
            self.rejected += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Resolve once shutdown has been requested.
///
/// A vanished sender means the signal listener died, not that shutdown was
/// asked for, so the wait then never resolves.
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            warn!("Shutdown listener stopped, workers can no longer be interrupted");
            std::future::pending::<()>().await;
        }
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping workers");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping workers");
        }
    }
}

fn sample_document() -> Document {
    let today = chrono::Local::now().date_naive();

    Document {
        description: Some(Description {
            participant_inn: "7700000000".to_string(),
        }),
        doc_id: "sample".to_string(),
        doc_status: "NEW".to_string(),
        doc_type: "LP_INTRODUCE_GOODS".to_string(),
        import_request: false,
        owner_inn: "7700000000".to_string(),
        participant_inn: "7700000000".to_string(),
        producer_inn: "7700000000".to_string(),
        production_date: Some(today),
        production_type: "OWN_PRODUCTION".to_string(),
        products: vec![Product {
            owner_inn: "7700000000".to_string(),
            producer_inn: "7700000000".to_string(),
            production_date: Some(today),
            ..Product::default()
        }],
        reg_date: Some(today),
        reg_number: String::new(),
    }
}
