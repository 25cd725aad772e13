use sqlx::{PgConnection, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use roomie_domain::match_state::{self, AcceptOutcome};

use crate::{
	BoxFuture, Error, Result, Store,
	db::Db,
	models::{
		AcceptResult, FeedState, FeedStateRow, MatchRecord, MatchRow, Message, MessageRow,
		MessageThread, NewMessage, NewUser, ProfileUpdate, ThreadRow, TraitRecord, TraitRow,
		User,
	},
};

const USER_COLUMNS: &str = "\
user_id, email, student_email, student_number, full_name, name, age, bio, profile_image, \
profile_complete, onboarding_complete, created_at, updated_at";
const MATCH_COLUMNS: &str = "match_id, users, status, created_at, matched_at";
const THREAD_COLUMNS: &str = "\
match_id, participants, last_message, last_message_at, last_message_sender, next_seq, created_at";
const MESSAGE_COLUMNS: &str = "message_id, match_id, seq, sender_id, text, kind, created_at, read";

impl Store for Db {
	fn insert_user<'a>(&'a self, user: NewUser) -> BoxFuture<'a, Result<User>> {
		Box::pin(async move {
			let sql = format!(
				"\
INSERT INTO users (
	user_id,
	email,
	student_email,
	student_number,
	full_name,
	created_at,
	updated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$6)
ON CONFLICT (user_id) DO NOTHING
RETURNING {USER_COLUMNS}"
			);
			let inserted: Option<User> = sqlx::query_as(&sql)
				.bind(user.user_id.as_str())
				.bind(user.email.as_deref())
				.bind(user.student_email.as_deref())
				.bind(user.student_number.as_deref())
				.bind(user.full_name.as_str())
				.bind(user.created_at)
				.fetch_optional(&self.pool)
				.await?;

			inserted.ok_or_else(|| {
				Error::Conflict(format!("User {} is already registered.", user.user_id))
			})
		})
	}

	fn get_user<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<User>>> {
		Box::pin(async move {
			let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");

			Ok(sqlx::query_as(&sql).bind(user_id).fetch_optional(&self.pool).await?)
		})
	}

	fn list_users<'a>(&'a self) -> BoxFuture<'a, Result<Vec<User>>> {
		Box::pin(async move {
			let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, user_id");

			Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
		})
	}

	fn update_profile<'a>(
		&'a self,
		user_id: &'a str,
		update: ProfileUpdate,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<User>> {
		Box::pin(async move {
			let sql = format!(
				"\
UPDATE users
SET
	name = $2,
	age = $3,
	bio = $4,
	profile_image = $5,
	profile_complete = true,
	updated_at = $6
WHERE user_id = $1
RETURNING {USER_COLUMNS}"
			);
			let updated: Option<User> = sqlx::query_as(&sql)
				.bind(user_id)
				.bind(update.name.as_str())
				.bind(update.age)
				.bind(update.bio.as_str())
				.bind(update.profile_image.as_str())
				.bind(now)
				.fetch_optional(&self.pool)
				.await?;

			updated.ok_or_else(|| Error::NotFound(format!("User {user_id} is not registered.")))
		})
	}

	fn complete_onboarding<'a>(&'a self, traits: TraitRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut tx = self.pool.begin().await?;
			let updated = sqlx::query(
				"UPDATE users SET onboarding_complete = true, updated_at = $2 WHERE user_id = $1",
			)
			.bind(traits.user_id.as_str())
			.bind(traits.completed_at)
			.execute(&mut *tx)
			.await?;

			if updated.rows_affected() == 0 {
				return Err(Error::NotFound(format!("User {} is not registered.", traits.user_id)));
			}

			let scores = traits.scores;

			sqlx::query(
				"\
INSERT INTO user_traits (
	user_id,
	cleanliness,
	loudness,
	niceness,
	socialness,
	organizedness,
	bedtimeness,
	budgetness,
	completed_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
ON CONFLICT (user_id) DO UPDATE
SET
	cleanliness = EXCLUDED.cleanliness,
	loudness = EXCLUDED.loudness,
	niceness = EXCLUDED.niceness,
	socialness = EXCLUDED.socialness,
	organizedness = EXCLUDED.organizedness,
	bedtimeness = EXCLUDED.bedtimeness,
	budgetness = EXCLUDED.budgetness,
	completed_at = EXCLUDED.completed_at",
			)
			.bind(traits.user_id.as_str())
			.bind(scores.cleanliness)
			.bind(scores.loudness)
			.bind(scores.niceness)
			.bind(scores.socialness)
			.bind(scores.organizedness)
			.bind(scores.bedtimeness)
			.bind(scores.budgetness)
			.bind(traits.completed_at)
			.execute(&mut *tx)
			.await?;

			tx.commit().await?;

			Ok(())
		})
	}

	fn get_traits<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<TraitRecord>>> {
		Box::pin(async move {
			let row: Option<TraitRow> = sqlx::query_as(
				"\
SELECT
	user_id,
	cleanliness,
	loudness,
	niceness,
	socialness,
	organizedness,
	bedtimeness,
	budgetness,
	completed_at
FROM user_traits
WHERE user_id = $1",
			)
			.bind(user_id)
			.fetch_optional(&self.pool)
			.await?;

			Ok(row.map(TraitRecord::from))
		})
	}

	fn get_feed_state<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, Result<Option<FeedState>>> {
		Box::pin(async move {
			let row: Option<FeedStateRow> = sqlx::query_as(
				"SELECT user_id, shown_users, updated_at FROM feed_states WHERE user_id = $1",
			)
			.bind(user_id)
			.fetch_optional(&self.pool)
			.await?;

			Ok(row.map(FeedState::from))
		})
	}

	fn mark_shown<'a>(
		&'a self,
		user_id: &'a str,
		target_id: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<FeedState>> {
		Box::pin(async move {
			let row: FeedStateRow = sqlx::query_as(
				"\
INSERT INTO feed_states (user_id, shown_users, updated_at)
VALUES ($1, ARRAY[$2::text], $3)
ON CONFLICT (user_id) DO UPDATE
SET
	shown_users = CASE
		WHEN $2::text = ANY(feed_states.shown_users) THEN feed_states.shown_users
		ELSE array_append(feed_states.shown_users, $2::text)
	END,
	updated_at = EXCLUDED.updated_at
RETURNING user_id, shown_users, updated_at",
			)
			.bind(user_id)
			.bind(target_id)
			.bind(now)
			.fetch_one(&self.pool)
			.await?;

			Ok(row.into())
		})
	}

	fn record_accept<'a>(
		&'a self,
		match_id: &'a str,
		source_id: &'a str,
		target_id: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<AcceptResult>> {
		Box::pin(async move {
			let mut tx = self.pool.begin().await?;
			let existing = lock_match(&mut tx, match_id, now).await?;
			let transition = match_state::apply_accept(existing, source_id, target_id, now);

			if transition.outcome != AcceptOutcome::AlreadyMatched {
				let users = crate::participants(&transition.state.users);

				sqlx::query(
					"\
UPDATE matches
SET users = $2, status = $3, created_at = $4, matched_at = $5
WHERE match_id = $1",
				)
				.bind(match_id)
				.bind(users.as_slice())
				.bind(transition.state.status.as_str())
				.bind(transition.state.created_at)
				.bind(transition.state.matched_at)
				.execute(&mut *tx)
				.await?;
			}
			if transition.outcome == AcceptOutcome::Matched {
				let participants = crate::participants(&transition.state.users);

				sqlx::query(
					"\
INSERT INTO message_threads (
	match_id,
	participants,
	last_message,
	last_message_at,
	last_message_sender,
	created_at
)
VALUES ($1, $2, NULL, NULL, NULL, $3)
ON CONFLICT (match_id) DO NOTHING",
				)
				.bind(match_id)
				.bind(participants.as_slice())
				.bind(now)
				.execute(&mut *tx)
				.await?;
			}

			tx.commit().await?;

			Ok(AcceptResult {
				record: MatchRecord { match_id: match_id.to_string(), state: transition.state },
				outcome: transition.outcome,
			})
		})
	}

	fn get_match<'a>(&'a self, match_id: &'a str) -> BoxFuture<'a, Result<Option<MatchRecord>>> {
		Box::pin(async move {
			let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE match_id = $1");
			let row: Option<MatchRow> =
				sqlx::query_as(&sql).bind(match_id).fetch_optional(&self.pool).await?;

			row.map(MatchRecord::try_from).transpose()
		})
	}

	fn list_matched_for<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<MatchRecord>>> {
		Box::pin(async move {
			let sql = format!(
				"\
SELECT {MATCH_COLUMNS}
FROM matches
WHERE status = 'matched'
	AND (split_part(match_id, '_', 1) = $1 OR split_part(match_id, '_', 2) = $1)
ORDER BY matched_at, match_id"
			);
			let rows: Vec<MatchRow> =
				sqlx::query_as(&sql).bind(user_id).fetch_all(&self.pool).await?;

			rows.into_iter().map(MatchRecord::try_from).collect()
		})
	}

	fn list_matches_involving<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<MatchRecord>>> {
		Box::pin(async move {
			let sql = format!(
				"\
SELECT {MATCH_COLUMNS}
FROM matches
WHERE cardinality(users) > 0
	AND (split_part(match_id, '_', 1) = $1 OR split_part(match_id, '_', 2) = $1)
ORDER BY created_at, match_id"
			);
			let rows: Vec<MatchRow> =
				sqlx::query_as(&sql).bind(user_id).fetch_all(&self.pool).await?;

			rows.into_iter().map(MatchRecord::try_from).collect()
		})
	}

	fn get_thread<'a>(
		&'a self,
		match_id: &'a str,
	) -> BoxFuture<'a, Result<Option<MessageThread>>> {
		Box::pin(async move {
			let sql = format!("SELECT {THREAD_COLUMNS} FROM message_threads WHERE match_id = $1");
			let row: Option<ThreadRow> =
				sqlx::query_as(&sql).bind(match_id).fetch_optional(&self.pool).await?;

			Ok(row.map(MessageThread::from))
		})
	}

	fn append_message<'a>(
		&'a self,
		match_id: &'a str,
		message: NewMessage,
	) -> BoxFuture<'a, Result<Message>> {
		Box::pin(async move {
			let mut tx = self.pool.begin().await?;
			let sql =
				format!("SELECT {THREAD_COLUMNS} FROM message_threads WHERE match_id = $1 FOR UPDATE");
			let thread: ThreadRow = sqlx::query_as(&sql)
				.bind(match_id)
				.fetch_optional(&mut *tx)
				.await?
				.ok_or_else(|| Error::NotFound(format!("Thread {match_id} does not exist.")))?;
			let created_at = match thread.last_message_at {
				Some(last) if last > message.sent_at => last,
				_ => message.sent_at,
			};
			let sql = format!(
				"\
INSERT INTO messages (message_id, match_id, seq, sender_id, text, kind, created_at, read)
VALUES ($1,$2,$3,$4,$5,$6,$7,false)
RETURNING {MESSAGE_COLUMNS}"
			);
			let row: MessageRow = sqlx::query_as(&sql)
				.bind(Uuid::new_v4())
				.bind(match_id)
				.bind(thread.next_seq)
				.bind(message.sender_id.as_str())
				.bind(message.text.as_str())
				.bind(message.kind.as_str())
				.bind(created_at)
				.fetch_one(&mut *tx)
				.await?;

			sqlx::query(
				"\
UPDATE message_threads
SET
	last_message = $2,
	last_message_at = $3,
	last_message_sender = $4,
	next_seq = next_seq + 1
WHERE match_id = $1",
			)
			.bind(match_id)
			.bind(message.text.as_str())
			.bind(created_at)
			.bind(message.sender_id.as_str())
			.execute(&mut *tx)
			.await?;

			tx.commit().await?;

			Message::try_from(row)
		})
	}

	fn list_messages<'a>(&'a self, match_id: &'a str) -> BoxFuture<'a, Result<Vec<Message>>> {
		self.list_messages_after(match_id, 0)
	}

	fn list_messages_after<'a>(
		&'a self,
		match_id: &'a str,
		after_seq: i64,
	) -> BoxFuture<'a, Result<Vec<Message>>> {
		Box::pin(async move {
			let sql = format!(
				"SELECT {MESSAGE_COLUMNS} FROM messages WHERE match_id = $1 AND seq > $2 ORDER BY seq"
			);
			let rows: Vec<MessageRow> =
				sqlx::query_as(&sql).bind(match_id).bind(after_seq).fetch_all(&self.pool).await?;

			rows.into_iter().map(Message::try_from).collect()
		})
	}
}

/// Ensures a row exists for `match_id` and locks it for the rest of the transaction.
///
/// A freshly inserted placeholder has no users and is reported as absent. Concurrent callers
/// block on the primary key until the first transaction commits, then observe its result.
async fn lock_match(
	tx: &mut Transaction<'_, Postgres>,
	match_id: &str,
	now: OffsetDateTime,
) -> Result<Option<match_state::MatchState>> {
	let conn: &mut PgConnection = &mut *tx;

	sqlx::query(
		"\
INSERT INTO matches (match_id, users, status, created_at)
VALUES ($1, '{}', 'pending', $2)
ON CONFLICT (match_id) DO NOTHING",
	)
	.bind(match_id)
	.bind(now)
	.execute(&mut *conn)
	.await?;

	let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE match_id = $1 FOR UPDATE");
	let row: MatchRow = sqlx::query_as(&sql).bind(match_id).fetch_one(&mut *conn).await?;

	if row.users.is_empty() {
		return Ok(None);
	}

	Ok(Some(MatchRecord::try_from(row)?.state))
}
