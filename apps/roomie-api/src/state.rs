use std::sync::Arc;

use color_eyre::eyre;

use roomie_config::{Config, StorageBackend};
use roomie_service::RoomieService;
use roomie_storage::{Store, db::Db, memory::MemoryStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<RoomieService>,
}
impl AppState {
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let store: Arc<dyn Store> = match config.storage.backend {
			StorageBackend::Postgres => {
				let pg = config.storage.postgres.as_ref().ok_or_else(|| {
					eyre::eyre!("storage.postgres is required when storage.backend is postgres.")
				})?;
				let db = Db::connect(pg).await?;

				db.ensure_schema().await?;

				Arc::new(db)
			},
			StorageBackend::Memory => {
				tracing::warn!("Using the in-memory store. Data is lost on restart.");

				Arc::new(MemoryStore::new())
			},
		};
		let identity = roomie_identity::from_config(&config.identity)?;

		Ok(Self::from_service(RoomieService::new(config, store, identity)))
	}

	pub fn from_service(service: RoomieService) -> Self {
		Self { service: Arc::new(service) }
	}
}
