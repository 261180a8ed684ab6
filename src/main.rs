use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use honeylog::build_router;
use honeylog::config::{Args, Config};
use honeylog::ingest::Ingester;
use honeylog::sampler::{EmaSampler, run_adjuster};
use honeylog::sink::{EventSink, HttpSink};
use honeylog::state::AppState;

// how long the sink gets to flush on shutdown
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // parse cli arguments
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return Err(e.into());
        }
    };

    // sampler and its background recomputation
    let sampler = Arc::new(EmaSampler::new(config.sampler.clone()));
    let (stop_adjuster, adjuster_stopped) = tokio::sync::oneshot::channel::<()>();
    let adjuster = tokio::spawn(run_adjuster(sampler.clone(), config.adjustment_interval, async move {
        let _ = adjuster_stopped.await;
    }));

    // outbound batching worker
    let (sink, worker) = HttpSink::spawn(config.sink.clone(), reqwest::Client::new());
    let sink: Arc<dyn EventSink> = Arc::new(sink);

    let state = Arc::new(AppState::new(Ingester::new(&config, sampler, sink)));
    let app = build_router(state.clone(), config.max_body_size);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("honeylog listening on http://{}", addr);
    info!(
        sampling_fields = ?config.sampling_fields,
        url_fields = ?config.url_fields,
        goal_sample_rate = config.sampler.goal_sample_rate,
        "sampling every {}s",
        config.adjustment_interval.as_secs()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // the last sink handle lives in the state; dropping it lets the worker drain
    let _ = stop_adjuster.send(());
    if let Err(e) = adjuster.await {
        error!(error = %e, "sample rate adjuster failed");
    }
    drop(state);
    match tokio::time::timeout(FLUSH_TIMEOUT, worker).await {
        Ok(Ok(())) => info!("pending events flushed"),
        Ok(Err(e)) => error!(error = %e, "batch worker failed"),
        Err(_) => warn!("timed out flushing pending events"),
    }

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler installation failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler installation failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
