//! In-process [`Store`] used for local development and tests.
//!
//! All collections sit behind one mutex, so every operation (including the multi-record ones)
//! is trivially atomic.

use std::{
	collections::{BTreeSet, HashMap, HashSet},
	sync::Mutex,
	time::Duration,
};

use time::OffsetDateTime;
use uuid::Uuid;

use roomie_domain::{
	match_key,
	match_state::{self, AcceptOutcome, MatchState, MatchStatus},
};

use crate::{
	BoxFuture, Error, Result, Store,
	models::{
		AcceptResult, FeedState, MatchRecord, Message, MessageThread, NewMessage, NewUser,
		ProfileUpdate, TraitRecord, User,
	},
};

#[derive(Default)]
pub struct MemoryStore {
	inner: Mutex<Inner>,
	failures: Mutex<HashSet<&'static str>>,
	stalls: Mutex<HashMap<&'static str, Duration>>,
}

#[derive(Default)]
struct Inner {
	user_order: Vec<String>,
	users: HashMap<String, User>,
	traits: HashMap<String, TraitRecord>,
	feeds: HashMap<String, FeedState>,
	matches: HashMap<String, MatchState>,
	threads: HashMap<String, ThreadEntry>,
}

struct ThreadEntry {
	thread: MessageThread,
	messages: Vec<Message>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every later call of `operation` (a [`Store`] method name) fail as unavailable.
	pub fn fail_operation(&self, operation: &'static str) {
		self.failures.lock().unwrap_or_else(|err| err.into_inner()).insert(operation);
	}

	/// Makes every later call of `operation` wait `delay` before returning its result.
	pub fn stall_operation(&self, operation: &'static str, delay: Duration) {
		self.stalls.lock().unwrap_or_else(|err| err.into_inner()).insert(operation, delay);
	}

	/// Clears both injected failures and stalls for `operation`.
	pub fn restore_operation(&self, operation: &'static str) {
		self.failures.lock().unwrap_or_else(|err| err.into_inner()).remove(&operation);
		self.stalls.lock().unwrap_or_else(|err| err.into_inner()).remove(&operation);
	}

	/// Number of stored messages in a thread, or `None` when the thread does not exist.
	pub fn message_count(&self, match_id: &str) -> Option<usize> {
		self.inner
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.threads
			.get(match_id)
			.map(|entry| entry.messages.len())
	}

	pub fn thread_count(&self) -> usize {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).threads.len()
	}

	fn run<T, F>(&self, operation: &'static str, f: F) -> Result<T>
	where
		F: FnOnce(&mut Inner) -> Result<T>,
	{
		if self.failures.lock().unwrap_or_else(|err| err.into_inner()).contains(&operation) {
			return Err(Error::Unavailable(format!("{operation} is unavailable.")));
		}

		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		f(&mut inner)
	}

	fn ready<'a, T>(&self, operation: &'static str, result: Result<T>) -> BoxFuture<'a, Result<T>>
	where
		T: Send + 'a,
	{
		let stall =
			self.stalls.lock().unwrap_or_else(|err| err.into_inner()).get(operation).copied();

		Box::pin(async move {
			if let Some(delay) = stall {
				tokio::time::sleep(delay).await;
			}

			result
		})
	}
}

impl Store for MemoryStore {
	fn insert_user<'a>(&'a self, user: NewUser) -> BoxFuture<'a, Result<User>> {
		let result = self.run("insert_user", |inner| {
			if inner.users.contains_key(&user.user_id) {
				return Err(Error::Conflict(format!(
					"User {} is already registered.",
					user.user_id
				)));
			}

			let user = user.into_user();

			inner.user_order.push(user.user_id.clone());
			inner.users.insert(user.user_id.clone(), user.clone());

			Ok(user)
		});

		self.ready("insert_user", result)
	}

	fn get_user<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<User>>> {
		let result = self.run("get_user", |inner| Ok(inner.users.get(user_id).cloned()));

		self.ready("get_user", result)
	}

	fn list_users<'a>(&'a self) -> BoxFuture<'a, Result<Vec<User>>> {
		let result = self.run("list_users", |inner| {
			Ok(inner.user_order.iter().filter_map(|id| inner.users.get(id).cloned()).collect())
		});

		self.ready("list_users", result)
	}

	fn update_profile<'a>(
		&'a self,
		user_id: &'a str,
		update: ProfileUpdate,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<User>> {
		let result = self.run("update_profile", |inner| {
			let user = inner
				.users
				.get_mut(user_id)
				.ok_or_else(|| Error::NotFound(format!("User {user_id} is not registered.")))?;

			user.name = Some(update.name);
			user.age = Some(update.age);
			user.bio = update.bio;
			user.profile_image = update.profile_image;
			user.profile_complete = true;
			user.updated_at = now;

			Ok(user.clone())
		});

		self.ready("update_profile", result)
	}

	fn complete_onboarding<'a>(&'a self, traits: TraitRecord) -> BoxFuture<'a, Result<()>> {
		let result = self.run("complete_onboarding", |inner| {
			let user = inner.users.get_mut(&traits.user_id).ok_or_else(|| {
				Error::NotFound(format!("User {} is not registered.", traits.user_id))
			})?;

			user.onboarding_complete = true;
			user.updated_at = traits.completed_at;

			inner.traits.insert(traits.user_id.clone(), traits);

			Ok(())
		});

		self.ready("complete_onboarding", result)
	}

	fn get_traits<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<TraitRecord>>> {
		let result = self.run("get_traits", |inner| Ok(inner.traits.get(user_id).cloned()));

		self.ready("get_traits", result)
	}

	fn get_feed_state<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, Result<Option<FeedState>>> {
		let result = self.run("get_feed_state", |inner| Ok(inner.feeds.get(user_id).cloned()));

		self.ready("get_feed_state", result)
	}

	fn mark_shown<'a>(
		&'a self,
		user_id: &'a str,
		target_id: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<FeedState>> {
		let result = self.run("mark_shown", |inner| {
			let state = inner.feeds.entry(user_id.to_string()).or_insert_with(|| FeedState {
				user_id: user_id.to_string(),
				shown_users: BTreeSet::new(),
				updated_at: now,
			});

			state.shown_users.insert(target_id.to_string());
			state.updated_at = now;

			Ok(state.clone())
		});

		self.ready("mark_shown", result)
	}

	fn record_accept<'a>(
		&'a self,
		match_id: &'a str,
		source_id: &'a str,
		target_id: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<AcceptResult>> {
		let result = self.run("record_accept", |inner| {
			let existing = inner.matches.get(match_id).cloned();
			let transition = match_state::apply_accept(existing, source_id, target_id, now);

			inner.matches.insert(match_id.to_string(), transition.state.clone());

			if transition.outcome == AcceptOutcome::Matched {
				inner.threads.entry(match_id.to_string()).or_insert_with(|| ThreadEntry {
					thread: MessageThread {
						match_id: match_id.to_string(),
						participants: crate::participants(&transition.state.users),
						last_message: None,
						last_message_at: None,
						last_message_sender: None,
						created_at: now,
					},
					messages: Vec::new(),
				});
			}

			Ok(AcceptResult {
				record: MatchRecord { match_id: match_id.to_string(), state: transition.state },
				outcome: transition.outcome,
			})
		});

		self.ready("record_accept", result)
	}

	fn get_match<'a>(&'a self, match_id: &'a str) -> BoxFuture<'a, Result<Option<MatchRecord>>> {
		let result = self.run("get_match", |inner| {
			Ok(inner
				.matches
				.get(match_id)
				.map(|state| MatchRecord { match_id: match_id.to_string(), state: state.clone() }))
		});

		self.ready("get_match", result)
	}

	fn list_matched_for<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<MatchRecord>>> {
		let result = self.run("list_matched_for", |inner| {
			let mut records = records_involving(inner, user_id);

			records.retain(|record| record.state.status == MatchStatus::Matched);
			records.sort_by(|a, b| {
				(a.state.matched_at, &a.match_id).cmp(&(b.state.matched_at, &b.match_id))
			});

			Ok(records)
		});

		self.ready("list_matched_for", result)
	}

	fn list_matches_involving<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<MatchRecord>>> {
		let result = self.run("list_matches_involving", |inner| {
			let mut records = records_involving(inner, user_id);

			records.sort_by(|a, b| {
				(a.state.created_at, &a.match_id).cmp(&(b.state.created_at, &b.match_id))
			});

			Ok(records)
		});

		self.ready("list_matches_involving", result)
	}

	fn get_thread<'a>(
		&'a self,
		match_id: &'a str,
	) -> BoxFuture<'a, Result<Option<MessageThread>>> {
		let result = self.run("get_thread", |inner| {
			Ok(inner.threads.get(match_id).map(|entry| entry.thread.clone()))
		});

		self.ready("get_thread", result)
	}

	fn append_message<'a>(
		&'a self,
		match_id: &'a str,
		message: NewMessage,
	) -> BoxFuture<'a, Result<Message>> {
		let result = self.run("append_message", |inner| {
			let entry = inner
				.threads
				.get_mut(match_id)
				.ok_or_else(|| Error::NotFound(format!("Thread {match_id} does not exist.")))?;
			let created_at = match entry.thread.last_message_at {
				Some(last) if last > message.sent_at => last,
				_ => message.sent_at,
			};
			let stored = Message {
				message_id: Uuid::new_v4(),
				match_id: match_id.to_string(),
				seq: entry.messages.last().map(|last| last.seq + 1).unwrap_or(1),
				sender_id: message.sender_id,
				text: message.text,
				kind: message.kind,
				created_at,
				read: false,
			};

			entry.thread.last_message = Some(stored.text.clone());
			entry.thread.last_message_at = Some(created_at);
			entry.thread.last_message_sender = Some(stored.sender_id.clone());
			entry.messages.push(stored.clone());

			Ok(stored)
		});

		self.ready("append_message", result)
	}

	fn list_messages<'a>(&'a self, match_id: &'a str) -> BoxFuture<'a, Result<Vec<Message>>> {
		self.list_messages_after(match_id, 0)
	}

	fn list_messages_after<'a>(
		&'a self,
		match_id: &'a str,
		after_seq: i64,
	) -> BoxFuture<'a, Result<Vec<Message>>> {
		let result = self.run("list_messages", |inner| {
			Ok(inner
				.threads
				.get(match_id)
				.map(|entry| {
					entry
						.messages
						.iter()
						.filter(|message| message.seq > after_seq)
						.cloned()
						.collect()
				})
				.unwrap_or_default())
		});

		self.ready("list_messages", result)
	}
}

fn records_involving(inner: &Inner, user_id: &str) -> Vec<MatchRecord> {
	inner
		.matches
		.iter()
		.filter(|(match_id, _)| match_key::involves(match_id, user_id))
		.map(|(match_id, state)| MatchRecord { match_id: match_id.clone(), state: state.clone() })
		.collect()
}
