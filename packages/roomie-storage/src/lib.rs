pub mod db;
pub mod memory;
pub mod models;
pub mod schema;

mod error;
mod postgres;

pub use error::Error;

use std::{collections::BTreeSet, future::Future, pin::Pin};

use time::OffsetDateTime;

use crate::models::{
	AcceptResult, FeedState, MatchRecord, Message, MessageThread, NewMessage, NewUser,
	ProfileUpdate, TraitRecord, User,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistence for users, feed state, matches, and message threads.
///
/// Every method is a single logical operation. Methods that touch more than one record
/// (`complete_onboarding`, `record_accept`, `append_message`) are atomic.
pub trait Store
where
	Self: Send + Sync,
{
	/// Fails with [`Error::Conflict`] when the id is already registered.
	fn insert_user<'a>(&'a self, user: NewUser) -> BoxFuture<'a, Result<User>>;

	fn get_user<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<User>>>;

	/// All users in natural storage order (creation time, then id).
	fn list_users<'a>(&'a self) -> BoxFuture<'a, Result<Vec<User>>>;

	/// Writes the bio fields and marks the profile complete.
	fn update_profile<'a>(
		&'a self,
		user_id: &'a str,
		update: ProfileUpdate,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<User>>;

	/// Stores the live trait vector and marks onboarding complete in one step.
	fn complete_onboarding<'a>(&'a self, traits: TraitRecord) -> BoxFuture<'a, Result<()>>;

	fn get_traits<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<TraitRecord>>>;

	fn get_feed_state<'a>(&'a self, user_id: &'a str)
	-> BoxFuture<'a, Result<Option<FeedState>>>;

	/// Set union of `target_id` into the user's shown set.
	fn mark_shown<'a>(
		&'a self,
		user_id: &'a str,
		target_id: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<FeedState>>;

	/// Serialized read-modify-write of the Match record for `match_id`.
	///
	/// Applies [`roomie_domain::match_state::apply_accept`] to the current record and, when the
	/// transition completes the pair, creates the message thread in the same transaction.
	fn record_accept<'a>(
		&'a self,
		match_id: &'a str,
		source_id: &'a str,
		target_id: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<AcceptResult>>;

	fn get_match<'a>(&'a self, match_id: &'a str) -> BoxFuture<'a, Result<Option<MatchRecord>>>;

	/// Matched records whose key has `user_id` as one of its two components.
	fn list_matched_for<'a>(&'a self, user_id: &'a str)
	-> BoxFuture<'a, Result<Vec<MatchRecord>>>;

	/// Every record, pending or matched, whose key has `user_id` as a component.
	fn list_matches_involving<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<MatchRecord>>>;

	fn get_thread<'a>(&'a self, match_id: &'a str)
	-> BoxFuture<'a, Result<Option<MessageThread>>>;

	/// Appends a message and updates the thread's last-message header atomically.
	///
	/// Fails with [`Error::NotFound`] when the thread does not exist.
	fn append_message<'a>(
		&'a self,
		match_id: &'a str,
		message: NewMessage,
	) -> BoxFuture<'a, Result<Message>>;

	/// Messages in ascending order.
	fn list_messages<'a>(&'a self, match_id: &'a str) -> BoxFuture<'a, Result<Vec<Message>>>;

	/// Messages with `seq > after_seq`, ascending.
	fn list_messages_after<'a>(
		&'a self,
		match_id: &'a str,
		after_seq: i64,
	) -> BoxFuture<'a, Result<Vec<Message>>>;
}

pub(crate) fn participants(users: &BTreeSet<String>) -> Vec<String> {
	users.iter().cloned().collect()
}
