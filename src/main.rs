use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use hybrid_ops::{
    cli::host_args_from_env,
    config::{ConfigStore, LoggingConfig},
    heuristics::HeuristicCompiler,
    logging::init_tracing,
    mind::{MindLoader, MindLoaderOptions},
    observability::{ObservabilitySink, TracingObservability},
    session::SessionManager,
};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    let args = host_args_from_env()?;

    let store = ConfigStore::new(&args.config_path);
    let logging = LoggingConfig::from_document(store.get().as_deref().map(|doc| &doc.value));
    let logging_guard = init_tracing(&logging).context("failed to initialize logging")?;

    let observability: Arc<dyn ObservabilitySink> = Arc::new(TracingObservability::new());
    let compiler = Arc::new(HeuristicCompiler::new(Arc::clone(&observability)));
    let mind = MindLoader::new(
        Arc::clone(&store),
        compiler,
        observability,
        MindLoaderOptions::new(&args.mind_root).with_mind_id(&args.mind_id),
    );
    mind.load()
        .await
        .with_context(|| format!("failed to load mind '{}'", args.mind_id))?;

    let sessions = SessionManager::new(Arc::clone(&mind));
    let cancel = CancellationToken::new();
    let sweeper = sessions.spawn_sweeper(SESSION_SWEEP_INTERVAL, cancel.clone());

    let metadata = mind.metadata();
    tracing::info!(
        target: "host",
        run_id = %logging_guard.run_id(),
        mind_id = %metadata.mind_id,
        config_source = %metadata.config_source,
        config_path = %args.config_path.display(),
        heuristics = ?metadata.heuristics,
        "host_ready"
    );

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let signal_name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };

    tracing::info!(target: "host", signal = signal_name, "host_shutdown_requested");
    cancel.cancel();
    sweeper.await.context("session sweeper join failed")?;
    store.unwatch();
    sessions.destroy_all();

    tracing::info!(target: "host", signal = signal_name, "host_stopped");
    Ok(())
}
