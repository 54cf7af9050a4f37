use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tapedeck::{
    create_router, AppState, BroadcastEventSink, Config, EventSink, ExecutionGuard, NatsEventSink,
    NullExecutionGuard, RecorderBackendFactory, RecordingSession,
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "tapedeck", about = "Background audio recording service")]
struct Args {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/tapedeck")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Recordings directory: {}", cfg.recording.output_dir);

    let backend = RecorderBackendFactory::create(&cfg.recording.backend)?;
    let guard: Arc<dyn ExecutionGuard> = Arc::new(NullExecutionGuard::new());

    let events = Arc::new(BroadcastEventSink::new(64));
    let mut sinks: Vec<Arc<dyn EventSink>> = vec![events.clone()];

    if let Some(url) = &cfg.events.nats_url {
        match NatsEventSink::connect(url, &cfg.service.name).await {
            Ok(sink) => sinks.push(Arc::new(sink)),
            Err(e) => warn!("NATS event sink disabled: {:#}", e),
        }
    }

    let session = Arc::new(RecordingSession::new(
        backend,
        guard,
        sinks,
        PathBuf::from(&cfg.recording.output_dir),
    )?);

    let state = AppState::new(session, events, cfg.recording.default_options());
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}
