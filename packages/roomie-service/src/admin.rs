use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use roomie_domain::match_key;

use crate::{Boundary, Error, Result, RoomieService};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMatch {
	pub match_id: String,
	pub users: Vec<String>,
	pub status: String,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339::option")]
	pub matched_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminMatchesResponse {
	pub matches: Vec<AdminMatch>,
}

impl RoomieService {
	/// Every match record involving `user_id`, pending or matched, oldest first.
	pub async fn admin_list_matches(&self, user_id: &str) -> Result<AdminMatchesResponse> {
		match_key::validate_user_id(user_id)
			.map_err(|err| Error::invalid_request(err.to_string()))?;

		let records = self
			.guarded(
				Boundary::MatchQuery,
				"list_matches_involving",
				self.store.list_matches_involving(user_id),
			)
			.await?;
		let matches = records
			.into_iter()
			.map(|record| AdminMatch {
				users: record.state.users.into_iter().collect(),
				status: record.state.status.as_str().to_string(),
				created_at: record.state.created_at,
				matched_at: record.state.matched_at,
				match_id: record.match_id,
			})
			.collect();

		Ok(AdminMatchesResponse { matches })
	}
}
