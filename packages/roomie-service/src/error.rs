pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by service operations. Each kind has a stable machine-readable code.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unauthenticated: {message}")]
	Unauthenticated { message: String },
	#[error("Invalid credential: {message}")]
	InvalidCredential { message: String },
	#[error("Forbidden: {message}")]
	Forbidden { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Feed unavailable: {message}")]
	FeedUnavailable { message: String },
	#[error("Swipe failed: {message}")]
	SwipeFailed { message: String },
	#[error("Match query failed: {message}")]
	MatchQueryFailed { message: String },
	#[error("Storage unavailable: {message}")]
	StorageUnavailable { message: String },
	#[error("Timeout: {message}")]
	Timeout { message: String },
}
impl Error {
	pub fn code(&self) -> &'static str {
		match self {
			Self::Unauthenticated { .. } => "UNAUTHENTICATED",
			Self::InvalidCredential { .. } => "INVALID_CREDENTIAL",
			Self::Forbidden { .. } => "FORBIDDEN",
			Self::InvalidRequest { .. } => "INVALID_REQUEST",
			Self::NotFound { .. } => "NOT_FOUND",
			Self::Conflict { .. } => "CONFLICT",
			Self::FeedUnavailable { .. } => "FEED_UNAVAILABLE",
			Self::SwipeFailed { .. } => "SWIPE_FAILED",
			Self::MatchQueryFailed { .. } => "MATCH_QUERY_FAILED",
			Self::StorageUnavailable { .. } => "STORAGE_UNAVAILABLE",
			Self::Timeout { .. } => "TIMEOUT",
		}
	}

	/// The caller-facing message without the kind prefix.
	pub fn message(&self) -> &str {
		match self {
			Self::Unauthenticated { message }
			| Self::InvalidCredential { message }
			| Self::Forbidden { message }
			| Self::InvalidRequest { message }
			| Self::NotFound { message }
			| Self::Conflict { message }
			| Self::FeedUnavailable { message }
			| Self::SwipeFailed { message }
			| Self::MatchQueryFailed { message }
			| Self::StorageUnavailable { message }
			| Self::Timeout { message } => message,
		}
	}

	pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}

	pub(crate) fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into() }
	}
}
