//! Message Thread: listing, sending, and live subscriptions on a match's thread.
//!
//! Appends go through the store, which assigns each message its per-thread `seq`. After a
//! successful append the message is broadcast to in-process subscribers of that thread.
//! Subscribers never trust the broadcast for ordering: a batch that does not continue
//! exactly from the last delivered `seq` is re-read from the store.

use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
	time::Duration,
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast::{self, Receiver, Sender, error::RecvError, error::TryRecvError};

use roomie_storage::{
	Store,
	models::{Message, MessageKind, MessageThread, NewMessage},
};

use crate::{Boundary, Error, Result, RoomieService};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
	pub message_id: String,
	pub seq: i64,
	pub sender_id: String,
	pub text: String,
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	pub read: bool,
}
impl From<&Message> for MessageView {
	fn from(message: &Message) -> Self {
		Self {
			message_id: message.message_id.to_string(),
			seq: message.seq,
			sender_id: message.sender_id.clone(),
			text: message.text.clone(),
			kind: message.kind.as_str().to_string(),
			created_at: message.created_at,
			read: message.read,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
	pub messages: Vec<MessageView>,
}
impl MessagesResponse {
	pub fn from_messages(messages: &[Message]) -> Self {
		Self { messages: messages.iter().map(MessageView::from).collect() }
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageRequest {
	#[serde(default)]
	pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageResponse {
	pub success: bool,
}

/// In-process fan-out of appended messages, one broadcast channel per thread.
#[derive(Default)]
pub(crate) struct ThreadHub {
	channels: Mutex<HashMap<String, Sender<Message>>>,
}
impl ThreadHub {
	fn subscribe(&self, match_id: &str) -> Receiver<Message> {
		let mut channels = self.channels.lock().unwrap_or_else(|err| err.into_inner());

		channels
			.entry(match_id.to_string())
			.or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
			.subscribe()
	}

	fn publish(&self, message: &Message) {
		let mut channels = self.channels.lock().unwrap_or_else(|err| err.into_inner());
		let Some(sender) = channels.get(&message.match_id) else {
			return;
		};

		// Fails only when nobody is listening anymore.
		if sender.send(message.clone()).is_err() {
			channels.remove(&message.match_id);
		}
	}

	/// Drops the thread's channel when the caller's receiver is the last one left.
	///
	/// Called while that receiver is still alive, so a count of one means nobody else listens.
	fn release(&self, match_id: &str) {
		let mut channels = self.channels.lock().unwrap_or_else(|err| err.into_inner());

		if channels.get(match_id).is_some_and(|sender| sender.receiver_count() <= 1) {
			channels.remove(match_id);
		}
	}

	#[cfg(test)]
	fn channel_count(&self) -> usize {
		self.channels.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}

/// A live view of one thread: an initial snapshot followed by batches of new messages.
///
/// Dropping the subscription cancels it.
pub struct Subscription {
	match_id: String,
	store: Arc<dyn Store>,
	hub: Arc<ThreadHub>,
	timeout: Duration,
	receiver: Receiver<Message>,
	snapshot: Vec<Message>,
	last_seq: i64,
}
impl Subscription {
	pub fn match_id(&self) -> &str {
		&self.match_id
	}

	/// The ordered messages present when the subscription opened. Empty after the first call.
	pub fn take_snapshot(&mut self) -> Vec<Message> {
		std::mem::take(&mut self.snapshot)
	}

	/// Waits for the next batch of messages, ascending by `seq`.
	///
	/// Returns `None` when the thread can no longer be followed.
	pub async fn next_batch(&mut self) -> Option<Vec<Message>> {
		loop {
			let (mut batch, mut resync) = match self.receiver.recv().await {
				Ok(message) => (vec![message], false),
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(
						match_id = %self.match_id,
						skipped,
						"Subscriber lagged behind. Re-reading from storage."
					);

					(Vec::new(), true)
				},
				Err(RecvError::Closed) => return None,
			};

			loop {
				match self.receiver.try_recv() {
					Ok(message) => batch.push(message),
					Err(TryRecvError::Lagged(_)) => resync = true,
					Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
				}
			}

			batch.retain(|message| message.seq > self.last_seq);
			batch.sort_by_key(|message| message.seq);
			batch.dedup_by_key(|message| message.seq);

			if resync || !continues_from(&batch, self.last_seq) {
				batch = match self.reload().await {
					Ok(batch) => batch,
					Err(err) => {
						tracing::warn!(
							match_id = %self.match_id,
							error = %err,
							"Failed to re-read thread. Ending subscription."
						);

						return None;
					},
				};
			}

			if let Some(last) = batch.last() {
				self.last_seq = last.seq;

				return Some(batch);
			}
		}
	}

	async fn reload(&self) -> Result<Vec<Message>> {
		crate::guarded(
			self.timeout,
			Boundary::Other,
			"list_messages_after",
			self.store.list_messages_after(&self.match_id, self.last_seq),
		)
		.await
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.hub.release(&self.match_id);
	}
}

impl RoomieService {
	/// Loads the thread and checks that `user_id` participates in it.
	pub async fn authorize_thread(&self, user_id: &str, match_id: &str) -> Result<MessageThread> {
		let thread = self
			.guarded(Boundary::Other, "get_thread", self.store.get_thread(match_id))
			.await?
			.ok_or_else(|| Error::not_found(format!("Thread {match_id} does not exist.")))?;

		if !thread.has_participant(user_id) {
			return Err(Error::Forbidden {
				message: "Only match participants may access this thread.".to_string(),
			});
		}

		Ok(thread)
	}

	/// The current messages of a thread, ascending.
	pub async fn list_messages(&self, user_id: &str, match_id: &str) -> Result<Vec<Message>> {
		self.authorize_thread(user_id, match_id).await?;
		self.guarded(Boundary::Other, "list_messages", self.store.list_messages(match_id)).await
	}

	/// Opens a live subscription on a thread.
	///
	/// The broadcast receiver is registered before the snapshot is read, so a message appended
	/// in between is either in the snapshot or delivered as the first batch.
	pub async fn subscribe(&self, user_id: &str, match_id: &str) -> Result<Subscription> {
		self.authorize_thread(user_id, match_id).await?;

		let receiver = self.hub.subscribe(match_id);
		let snapshot = self
			.guarded(Boundary::Other, "list_messages", self.store.list_messages(match_id))
			.await?;
		let last_seq = snapshot.last().map(|message| message.seq).unwrap_or(0);

		tracing::debug!(
			user_id,
			match_id,
			snapshot = snapshot.len(),
			"Thread subscription opened."
		);

		Ok(Subscription {
			match_id: match_id.to_string(),
			store: self.store.clone(),
			hub: self.hub.clone(),
			timeout: self.request_timeout(),
			receiver,
			snapshot,
			last_seq,
		})
	}

	/// Sends a text message and reports whether it was stored.
	///
	/// Never fails: every failure is logged and reported as `false`.
	pub async fn send_message(&self, match_id: &str, sender_id: &str, text: &str) -> bool {
		match self.try_send_message(match_id, sender_id, text).await {
			Ok(_) => true,
			Err(err) => {
				tracing::warn!(
					match_id,
					user_id = sender_id,
					error_code = err.code(),
					error = %err,
					"Failed to send message."
				);

				false
			},
		}
	}

	pub async fn try_send_message(
		&self,
		match_id: &str,
		sender_id: &str,
		text: &str,
	) -> Result<Message> {
		let text = text.trim();

		if text.is_empty() {
			return Err(Error::invalid_request("Message text must not be empty."));
		}

		self.authorize_thread(sender_id, match_id).await?;

		let message = NewMessage {
			sender_id: sender_id.to_string(),
			text: text.to_string(),
			kind: MessageKind::Text,
			sent_at: OffsetDateTime::now_utc(),
		};
		let append = self.store.append_message(match_id, message);
		let stored = self.guarded(Boundary::Other, "append_message", append).await?;

		self.hub.publish(&stored);

		Ok(stored)
	}
}

fn continues_from(batch: &[Message], last_seq: i64) -> bool {
	batch.iter().zip(last_seq + 1..).all(|(message, expected)| message.seq == expected)
}
