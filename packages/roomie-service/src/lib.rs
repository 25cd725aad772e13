pub mod admin;
pub mod feed;
pub mod identity;
pub mod matches;
pub mod messages;
pub mod swipe;
pub mod users;

mod error;

pub use admin::{AdminMatch, AdminMatchesResponse};
pub use error::{Error, Result};
pub use feed::FeedResponse;
pub use matches::{MatchSummary, MatchesResponse};
pub use messages::{
	MessageView, MessagesResponse, SendMessageRequest, SendMessageResponse, Subscription,
};
pub use swipe::{SwipeAction, SwipeRequest, SwipeResponse};
pub use users::{
	BioRequest, OwnProfile, Profile, QuestionnaireDefinition, QuestionnaireSubmission,
	RegisterRequest, TraitVector,
};

use std::{future::Future, sync::Arc, time::Duration};

use roomie_config::Config;
use roomie_identity::IdentityVerifier;
use roomie_storage::Store;

use crate::messages::ThreadHub;

/// Which boundary operation a storage call belongs to. Decides the error kind reported when the
/// store fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Boundary {
	Feed,
	Swipe,
	MatchQuery,
	Other,
}
impl Boundary {
	fn failure(self) -> Error {
		match self {
			Self::Feed =>
				Error::FeedUnavailable { message: "Failed to generate feed.".to_string() },
			Self::Swipe => Error::SwipeFailed { message: "Failed to process swipe.".to_string() },
			Self::MatchQuery =>
				Error::MatchQueryFailed { message: "Failed to fetch matches.".to_string() },
			Self::Other =>
				Error::StorageUnavailable { message: "Storage is unavailable.".to_string() },
		}
	}
}

pub struct RoomieService {
	pub cfg: Config,
	pub store: Arc<dyn Store>,
	pub identity: Arc<dyn IdentityVerifier>,
	hub: Arc<ThreadHub>,
}
impl RoomieService {
	pub fn new(cfg: Config, store: Arc<dyn Store>, identity: Arc<dyn IdentityVerifier>) -> Self {
		Self { cfg, store, identity, hub: Arc::new(ThreadHub::default()) }
	}

	pub(crate) fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.cfg.service.request_timeout_ms)
	}

	/// Runs one storage call under the request timeout and maps its failure to `boundary`.
	///
	/// `NotFound`, `Conflict`, and `InvalidArgument` keep their meaning. Every other storage
	/// error is logged here and replaced by the boundary's error kind.
	pub(crate) async fn guarded<T, F>(
		&self,
		boundary: Boundary,
		operation: &'static str,
		fut: F,
	) -> Result<T>
	where
		F: Future<Output = roomie_storage::Result<T>>,
	{
		guarded(self.request_timeout(), boundary, operation, fut).await
	}
}

pub(crate) async fn guarded<T, F>(
	timeout: Duration,
	boundary: Boundary,
	operation: &'static str,
	fut: F,
) -> Result<T>
where
	F: Future<Output = roomie_storage::Result<T>>,
{
	let result = match tokio::time::timeout(timeout, fut).await {
		Ok(result) => result,
		Err(_) => {
			tracing::warn!(
				operation,
				timeout_ms = timeout.as_millis() as u64,
				"Storage call timed out."
			);

			return Err(Error::Timeout { message: format!("{operation} timed out.") });
		},
	};

	result.map_err(|err| match err {
		roomie_storage::Error::NotFound(message) => Error::NotFound { message },
		roomie_storage::Error::Conflict(message) => Error::Conflict { message },
		roomie_storage::Error::InvalidArgument(message) => Error::InvalidRequest { message },
		other => {
			tracing::error!(operation, error = %other, "Storage call failed.");

			boundary.failure()
		},
	})
}
