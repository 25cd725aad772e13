//! Throwaway Postgres databases for the ignored storage tests.
//!
//! Point `ROOMIE_PG_DSN` at any server the test user may create databases on. Each
//! [`ScratchDb`] lives in its own `roomie_scratch_*` database and is force-dropped when released.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

pub const DSN_VAR: &str = "ROOMIE_PG_DSN";

/// Databases tried, in order, for issuing `CREATE DATABASE` and `DROP DATABASE`.
const MAINTENANCE_DATABASES: [&str; 2] = ["postgres", "template1"];

pub struct ScratchDb {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
	dropped: bool,
}
impl ScratchDb {
	/// Creates a scratch database next to the one `ROOMIE_PG_DSN` names.
	///
	/// Returns `None` when the variable is unset so callers can skip.
	pub async fn from_env() -> Option<Result<Self>> {
		let base_dsn = env::var(DSN_VAR).ok()?;

		Some(Self::create(&base_dsn).await)
	}

	pub async fn create(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn).map_err(Error::InvalidDsn)?;
		let (maintenance, mut conn) = open_maintenance(&base).await?;
		let name = format!("roomie_scratch_{}", Uuid::new_v4().simple());

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|source| Error::Create { name: name.clone(), source })?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance, dropped: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Drops the database now and reports failures, instead of leaving it to `Drop`.
	pub async fn release(mut self) -> Result<()> {
		self.dropped = true;

		force_drop(&self.name, &self.maintenance).await
	}
}
impl Drop for ScratchDb {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = self.name.clone();
		let maintenance = self.maintenance.clone();
		// The owning runtime may already be shutting down, so drop from a private one.
		let handle = thread::spawn(move || {
			let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build();
			let outcome = match runtime {
				Ok(runtime) => runtime.block_on(force_drop(&name, &maintenance)),
				Err(err) => Err(Error::Runtime(err)),
			};

			if let Err(err) = outcome {
				eprintln!("Leaked scratch database {name}: {err}.");
			}
		});

		let _ = handle.join();
	}
}

async fn open_maintenance(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut failures = Vec::new();

	for database in MAINTENANCE_DATABASES {
		let options = base.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => failures.push(format!("{database}: {err}")),
		}
	}

	Err(Error::NoMaintenanceDatabase(failures.join("; ")))
}

async fn force_drop(name: &str, maintenance: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(maintenance)
		.await
		.map_err(|source| Error::Drop { name: name.to_string(), source })?;

	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}" WITH (FORCE)"#).as_str())
		.await
		.map_err(|source| Error::Drop { name: name.to_string(), source })?;

	Ok(())
}
