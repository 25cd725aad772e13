pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("ROOMIE_PG_DSN is not a valid Postgres DSN.")]
	InvalidDsn(#[source] sqlx::Error),
	#[error("No maintenance database is reachable ({0}).")]
	NoMaintenanceDatabase(String),
	#[error("Failed to create scratch database {name}.")]
	Create { name: String, source: sqlx::Error },
	#[error("Failed to drop scratch database {name}.")]
	Drop { name: String, source: sqlx::Error },
	#[error("Failed to start a cleanup runtime.")]
	Runtime(#[source] std::io::Error),
}
