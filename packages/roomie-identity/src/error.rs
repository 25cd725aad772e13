pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Transport(#[from] reqwest::Error),
	#[error(transparent)]
	Decode(#[from] serde_json::Error),
	#[error("Token rejected: {0}")]
	Rejected(String),
	#[error("Invalid verifier response: {0}")]
	InvalidResponse(String),
	#[error("Invalid identity configuration: {0}")]
	InvalidConfig(String),
}
impl Error {
	/// True when the provider could not be reached or answered garbage, as opposed to a clean
	/// rejection of the token.
	pub fn is_provider_failure(&self) -> bool {
		matches!(self, Self::Transport(_) | Self::Decode(_) | Self::InvalidResponse(_))
	}
}
