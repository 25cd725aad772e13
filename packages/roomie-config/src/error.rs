use std::{io, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read config file at {path:?}.")]
	Read { path: PathBuf, source: io::Error },
	#[error("Config file at {path:?} does not match the config schema.")]
	ParseFile { path: PathBuf, source: toml::de::Error },
	#[error("Config does not match the config schema.")]
	Parse(#[source] toml::de::Error),
	/// A setting parsed but breaks a rule. `key` is the dotted TOML path.
	#[error("{key} {reason}.")]
	Invalid { key: &'static str, reason: String },
}
impl Error {
	pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
		Self::Invalid { key, reason: reason.into() }
	}
}
