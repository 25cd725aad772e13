//! Swipe/Match Engine.
//!
//! A swipe always marks the target as shown. An accept then goes through
//! [`roomie_storage::Store::record_accept`], which serializes the read-modify-write of the pair's
//! Match record so two accepts racing from both sides still converge on one `matched` record and
//! one message thread.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use roomie_domain::{match_key, match_state::AcceptOutcome};

use crate::{Boundary, Error, Result, RoomieService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
	Accept,
	Reject,
}
impl SwipeAction {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"accept" => Some(Self::Accept),
			"reject" => Some(Self::Reject),
			_ => None,
		}
	}
}

/// Fields are optional so that missing values surface as `INVALID_REQUEST` rather than a decode
/// failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
	#[serde(default)]
	pub target_user_id: Option<String>,
	#[serde(default)]
	pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeResponse {
	pub success: bool,
	pub matched: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub match_id: Option<String>,
}

impl RoomieService {
	pub async fn swipe(&self, user_id: &str, req: SwipeRequest) -> Result<SwipeResponse> {
		let target_id = req
			.target_user_id
			.as_deref()
			.map(str::trim)
			.filter(|target| !target.is_empty())
			.ok_or_else(|| Error::invalid_request("targetUserId is required."))?;
		let action = req
			.action
			.as_deref()
			.and_then(SwipeAction::parse)
			.ok_or_else(|| Error::invalid_request("action must be \"accept\" or \"reject\"."))?;

		match_key::validate_user_id(target_id)
			.map_err(|err| Error::invalid_request(err.to_string()))?;

		if target_id == user_id {
			return Err(Error::invalid_request("Cannot swipe on yourself."));
		}

		let target = self
			.guarded(Boundary::Swipe, "get_user", self.store.get_user(target_id))
			.await?;

		if target.is_none() {
			return Err(Error::not_found(format!("User {target_id} is not registered.")));
		}

		let now = OffsetDateTime::now_utc();

		match action {
			SwipeAction::Reject => {
				self.guarded(
					Boundary::Swipe,
					"mark_shown",
					self.store.mark_shown(user_id, target_id, now),
				)
				.await?;

				tracing::debug!(user_id, target_user_id = target_id, "Swipe rejected.");

				Ok(SwipeResponse { success: true, matched: false, match_id: None })
			},
			SwipeAction::Accept => self.accept(user_id, target_id, now).await,
		}
	}

	async fn accept(
		&self,
		user_id: &str,
		target_id: &str,
		now: OffsetDateTime,
	) -> Result<SwipeResponse> {
		// Shown marking is best effort for accepts; the match record is the primary effect.
		if let Err(err) = self
			.guarded(Boundary::Swipe, "mark_shown", self.store.mark_shown(user_id, target_id, now))
			.await
		{
			tracing::warn!(
				user_id,
				target_user_id = target_id,
				error = %err,
				"Failed to mark swipe target as shown. Continuing with accept."
			);
		}

		let match_id = match_key::match_key(user_id, target_id)
			.map_err(|err| Error::invalid_request(err.to_string()))?;
		let result = self
			.guarded(
				Boundary::Swipe,
				"record_accept",
				self.store.record_accept(&match_id, user_id, target_id, now),
			)
			.await?;

		match result.outcome {
			AcceptOutcome::Matched => tracing::info!(
				user_id,
				target_user_id = target_id,
				match_id = %match_id,
				"Match formed."
			),
			AcceptOutcome::AlreadyMatched =>
				tracing::debug!(user_id, match_id = %match_id, "Accept on an existing match."),
			AcceptOutcome::Pending => tracing::debug!(
				user_id,
				target_user_id = target_id,
				match_id = %match_id,
				"Accept recorded."
			),
		}

		if result.outcome.is_matched() {
			Ok(SwipeResponse { success: true, matched: true, match_id: Some(match_id) })
		} else {
			Ok(SwipeResponse { success: true, matched: false, match_id: None })
		}
	}
}
