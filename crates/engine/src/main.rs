//! Streamrec Service - HTTP front end for the recommendation engine
//!
//! Loads the CSV dataset, builds the initial snapshot and serves
//! recommendations until shut down. `POST /api/v1/admin/refresh` rebuilds the
//! snapshot from disk without interrupting queries.

use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use streamrec_core::{init_logging, load_dotenv, ConfigLoader, DatasetConfig, LogConfig, ServiceConfig};
use streamrec_engine::server::{self, AppState};
use streamrec_engine::{EngineConfig, SnapshotStore};
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let service = ServiceConfig::from_env()?;
    service.validate()?;
    init_logging(&LogConfig::new(service.log_level.clone(), service.log_format))?;

    let engine = EngineConfig::load()?;
    let dataset = DatasetConfig::from_env()?;
    dataset.validate()?;

    info!(
        data_dir = %dataset.data_dir.display(),
        popularity = ?engine.popularity,
        "Building initial snapshot"
    );

    let snapshot = {
        let engine = engine.clone();
        let dataset = dataset.clone();
        tokio::task::spawn_blocking(move || AppState::build_snapshot(&engine, &dataset)).await??
    };
    let store = Arc::new(SnapshotStore::new(snapshot));

    let bind_addr = service.bind_addr();
    info!(
        bind_addr = %bind_addr,
        workers = service.workers,
        generation = store.generation(),
        "Starting Streamrec Service"
    );

    let app_state = web::Data::new(AppState::new(store, engine, dataset));

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(server::configure_routes)
    })
    .workers(service.workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
