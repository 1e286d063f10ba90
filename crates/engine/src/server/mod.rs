pub mod handlers;

pub use handlers::{
    explain, get_popular, get_recommendations, get_user_history, health, refresh_snapshot,
};

use actix_web::web;
use std::sync::Arc;
use streamrec_core::DatasetConfig;

use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::snapshot::{BuildSnapshot, Snapshot};
use crate::store::SnapshotStore;

/// Application state shared across all handlers
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub engine: Arc<EngineConfig>,
    pub dataset: Arc<DatasetConfig>,
}

impl AppState {
    pub fn new(store: Arc<SnapshotStore>, engine: EngineConfig, dataset: DatasetConfig) -> Self {
        Self {
            store,
            engine: Arc::new(engine),
            dataset: Arc::new(dataset),
        }
    }

    /// Load the dataset and build a fresh snapshot; blocking
    pub fn build_snapshot(engine: &EngineConfig, dataset: &DatasetConfig) -> Result<Snapshot> {
        let data = Dataset::load(dataset)?;
        BuildSnapshot::execute(&data.events, &data.users, &data.items, engine)
    }
}

/// Configure application routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health))
            .route("/popular", web::get().to(handlers::get_popular))
            .route(
                "/recommendations",
                web::get().to(handlers::get_recommendations),
            )
            .route("/explain", web::get().to(handlers::explain))
            .route("/user_history", web::get().to(handlers::get_user_history))
            .service(
                web::scope("/admin")
                    .route("/refresh", web::post().to(handlers::refresh_snapshot)),
            ),
    );
}
