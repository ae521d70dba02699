use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use safesewa_api::{app, state::AppState};
use safesewa_common::Config;
use safesewa_hub::BroadcastHub;
use safesewa_ingest::notify::{NoopNotify, NotifyBackend, PushGateway};
use safesewa_ingest::sources::{GdacsSource, HydrologySource, SeismicSource};
use safesewa_ingest::{Ingestor, PollScheduler};
use safesewa_sos::SosManager;
use safesewa_store::{Directory, MemoryDirectory, MemoryStore, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("safesewa=info".parse()?))
        .init();

    let config = Config::from_env();

    // The record store is an external collaborator; the in-memory
    // implementation backs local development. Production wiring swaps in a
    // real RecordStore here.
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let directory: Arc<dyn Directory> = Arc::new(MemoryDirectory::new());

    let hub = Arc::new(BroadcastHub::new(
        config.hub_ping_interval,
        config.hub_pong_timeout,
    ));
    let _sweeper = hub.spawn_liveness_sweep();

    let notify: Arc<dyn NotifyBackend> = match &config.push_gateway_url {
        Some(url) => Arc::new(PushGateway::new(
            url.clone(),
            config.push_gateway_key.clone(),
        )),
        None => Arc::new(NoopNotify),
    };

    let ingestor = Arc::new(Ingestor::new(
        Arc::clone(&store),
        Arc::clone(&hub),
        notify,
    ));

    let mut scheduler = PollScheduler::new(ingestor, config.poll_floor);
    scheduler.register(
        Arc::new(SeismicSource::new(
            &config.seismic_url,
            config.quake_min_magnitude,
            config.fetch_timeout,
        )),
        config.seismic_poll,
    );
    scheduler.register(
        Arc::new(HydrologySource::new(
            &config.hydrology_url,
            HydrologySource::default_stations(),
            config.flood_watermark_default,
            config.fetch_timeout,
        )),
        config.hydrology_poll,
    );
    scheduler.register(
        Arc::new(GdacsSource::new(&config.gdacs_url, config.fetch_timeout)),
        config.gdacs_poll,
    );
    info!(sources = scheduler.source_count(), "Pollers running");

    let sos = SosManager::new(Arc::clone(&store), directory, Arc::clone(&hub));
    let state = Arc::new(AppState { store, hub, sos });

    let addr = format!("{}:{}", config.web_host, config.web_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "SafeSewa core listening");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
