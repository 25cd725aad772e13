use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub identity: Identity,
	#[serde(default)]
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
	/// Upper bound applied to every storage round trip of a request.
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
	#[serde(default = "default_feed_limit")]
	pub feed_default_limit: u32,
	#[serde(default = "default_feed_max_limit")]
	pub feed_max_limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
	Postgres,
	Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub backend: StorageBackend,
	pub postgres: Option<Postgres>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityProvider {
	Http,
	Static,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
	pub provider: IdentityProvider,
	pub verify_url: Option<String>,
	pub api_key: Option<String>,
	#[serde(default = "default_identity_timeout_ms")]
	pub timeout_ms: u64,
	/// Token to subject table. Only consulted by the static provider.
	#[serde(default)]
	pub static_tokens: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Security {
	pub bind_localhost_only: bool,
}
impl Default for Security {
	fn default() -> Self {
		Self { bind_localhost_only: true }
	}
}

fn default_request_timeout_ms() -> u64 {
	5_000
}

fn default_feed_limit() -> u32 {
	20
}

fn default_feed_max_limit() -> u32 {
	100
}

fn default_identity_timeout_ms() -> u64 {
	3_000
}
