//! Feed Selector: unseen candidates for a user, in natural storage order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Boundary, Profile, Result, RoomieService};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
	pub feed: Vec<Profile>,
	/// True when the page came back full. A heuristic: it is also true when exactly `limit`
	/// candidates remained.
	pub has_more: bool,
}

impl RoomieService {
	/// Candidates for `user_id`, excluding the user and everyone already swiped on.
	///
	/// Read-only. The shown set only grows through [`RoomieService::swipe`].
	pub async fn feed(&self, user_id: &str, limit: Option<u32>) -> Result<FeedResponse> {
		let limit = self.effective_limit(limit);
		let shown: BTreeSet<String> = self
			.guarded(Boundary::Feed, "get_feed_state", self.store.get_feed_state(user_id))
			.await?
			.map(|state| state.shown_users)
			.unwrap_or_default();
		let users = self.guarded(Boundary::Feed, "list_users", self.store.list_users()).await?;
		let feed: Vec<Profile> = users
			.iter()
			.filter(|user| user.user_id != user_id && !shown.contains(&user.user_id))
			.take(limit)
			.map(Profile::from)
			.collect();
		let has_more = feed.len() == limit;

		tracing::debug!(user_id, limit, returned = feed.len(), has_more, "Feed generated.");

		Ok(FeedResponse { feed, has_more })
	}

	/// Absent or zero falls back to the default; anything else is capped at the maximum.
	pub fn effective_limit(&self, requested: Option<u32>) -> usize {
		let service = &self.cfg.service;
		let limit = match requested {
			None | Some(0) => service.feed_default_limit,
			Some(limit) => limit.min(service.feed_max_limit),
		};

		limit.max(1) as usize
	}
}
