mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Identity, IdentityProvider, Postgres, Security, Service, Storage, StorageBackend,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|source| Error::Read { path: path.to_path_buf(), source })?;

	parse(&raw).map_err(|err| match err {
		Error::Parse(source) => Error::ParseFile { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw).map_err(Error::Parse)?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	let service = &cfg.service;

	for (key, value) in [
		("service.http_bind", &service.http_bind),
		("service.admin_bind", &service.admin_bind),
		("service.log_level", &service.log_level),
	] {
		if value.trim().is_empty() {
			return Err(Error::invalid(key, "must be non-empty"));
		}
	}

	if service.request_timeout_ms == 0 {
		return Err(Error::invalid("service.request_timeout_ms", "must be greater than zero"));
	}
	if service.feed_default_limit == 0 {
		return Err(Error::invalid("service.feed_default_limit", "must be greater than zero"));
	}
	if service.feed_max_limit < service.feed_default_limit {
		return Err(Error::invalid(
			"service.feed_max_limit",
			"must be at least service.feed_default_limit",
		));
	}

	validate_storage(&cfg.storage)?;
	validate_identity(&cfg.identity)
}

fn validate_storage(storage: &Storage) -> Result<()> {
	let pg = match (storage.backend, storage.postgres.as_ref()) {
		(StorageBackend::Memory, _) => return Ok(()),
		(StorageBackend::Postgres, None) =>
			return Err(Error::invalid(
				"storage.postgres",
				"is required when storage.backend is postgres",
			)),
		(StorageBackend::Postgres, Some(pg)) => pg,
	};

	if pg.dsn.trim().is_empty() {
		return Err(Error::invalid("storage.postgres.dsn", "must be non-empty"));
	}
	if pg.pool_max_conns == 0 {
		return Err(Error::invalid("storage.postgres.pool_max_conns", "must be greater than zero"));
	}

	Ok(())
}

fn validate_identity(identity: &Identity) -> Result<()> {
	match identity.provider {
		IdentityProvider::Http => {
			if identity.verify_url.is_none() {
				return Err(Error::invalid(
					"identity.verify_url",
					"is required when identity.provider is http",
				));
			}
			if identity.timeout_ms == 0 {
				return Err(Error::invalid("identity.timeout_ms", "must be greater than zero"));
			}
		},
		IdentityProvider::Static => {
			if identity.static_tokens.is_empty() {
				return Err(Error::invalid(
					"identity.static_tokens",
					"must be non-empty when identity.provider is static",
				));
			}
			if identity
				.static_tokens
				.iter()
				.any(|(token, subject)| token.trim().is_empty() || subject.trim().is_empty())
			{
				return Err(Error::invalid("identity.static_tokens", "entries must be non-empty"));
			}
		},
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.identity.verify_url.as_deref().map(|url| url.trim().is_empty()).unwrap_or(false) {
		cfg.identity.verify_url = None;
	}
	if cfg.identity.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.identity.api_key = None;
	}
}
