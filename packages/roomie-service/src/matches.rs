//! Match Query: a user's completed matches joined with the counterparty's public profile.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use roomie_domain::match_key;

use crate::{Boundary, Profile, Result, RoomieService};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
	pub match_id: String,
	pub user: Profile,
	#[serde(with = "time::serde::rfc3339")]
	pub matched_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResponse {
	pub matches: Vec<MatchSummary>,
}

impl RoomieService {
	/// Matches whose key names `user_id` as one of its two components, oldest match first.
	///
	/// Records whose counterparty cannot be resolved are logged and left out; they never fail
	/// the call.
	pub async fn list_matches(&self, user_id: &str) -> Result<MatchesResponse> {
		let records = self
			.guarded(Boundary::MatchQuery, "list_matched_for", self.store.list_matched_for(user_id))
			.await?;
		let mut matches = Vec::with_capacity(records.len());

		for record in records {
			let Some(counterparty) = match_key::counterparty(&record.match_id, user_id) else {
				tracing::warn!(
					user_id,
					match_id = %record.match_id,
					"Skipping match with an unparsable key."
				);

				continue;
			};
			let Some(matched_at) = record.state.matched_at else {
				tracing::warn!(
					user_id,
					match_id = %record.match_id,
					"Skipping matched record without a match time."
				);

				continue;
			};
			let Some(user) = self
				.guarded(Boundary::MatchQuery, "get_user", self.store.get_user(counterparty))
				.await?
			else {
				tracing::warn!(
					user_id,
					match_id = %record.match_id,
					counterparty,
					"Skipping match whose counterparty profile is missing."
				);

				continue;
			};

			matches.push(MatchSummary {
				match_id: record.match_id.clone(),
				user: Profile::from(&user),
				matched_at,
			});
		}

		Ok(MatchesResponse { matches })
	}
}
