//! # appstudio-import
//!
//! Runs one import request against the cluster in the current kube context.
//!
//! ```bash
//! appstudio-import --file request.yaml --namespace my-tenant
//! appstudio-import --file request.yaml --dry-run
//! ```
//!
//! The outcome is printed to stdout as JSON. Ctrl-C cancels the run; resources
//! created up to that point are left in place.

use anyhow::{Context, Result};
use appstudio_import::client::KubeResourceClient;
use appstudio_import::{observability, ImportConfig, ImportRequest, Importer};
use clap::Parser;
use kube::Client;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "appstudio-import")]
#[command(about = "Import git repositories into an AppStudio application", long_about = None)]
struct Cli {
    /// Import request (YAML or JSON)
    #[arg(short, long)]
    file: PathBuf,

    /// Namespace to import into, overriding the request
    #[arg(short, long)]
    namespace: Option<String>,

    /// Validate Application and Component bodies without persisting them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before the kube client opens any TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = ImportConfig::from_env();
    observability::init_tracing(&config)?;

    let cli = Cli::parse();
    let request = load_request(&cli)?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;
    let importer = Importer::new(
        KubeResourceClient::new(client, config.field_manager.clone()),
        config,
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling import");
            on_signal.cancel();
        }
    });

    match importer.run(&request, &cancel).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(failure) => {
            error!(stage = %failure.stage(), error = %failure, "import failed");
            Err(anyhow::Error::new(failure).context(format!(
                "Import of '{}' failed",
                request.application.resource_name()
            )))
        }
    }
}

fn load_request(cli: &Cli) -> Result<ImportRequest> {
    let raw = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;
    // JSON is a subset of YAML, so one parser covers both
    let mut request: ImportRequest = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse import request {}", cli.file.display()))?;

    if let Some(namespace) = &cli.namespace {
        request.namespace.clone_from(namespace);
    }
    request.dry_run |= cli.dry_run;
    info!(
        file = %cli.file.display(),
        namespace = %request.namespace,
        components = request.components.len(),
        "loaded import request"
    );
    Ok(request)
}
