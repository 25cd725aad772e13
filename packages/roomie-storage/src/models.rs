use std::collections::BTreeSet;

use time::OffsetDateTime;
use uuid::Uuid;

use roomie_domain::{
	match_state::{AcceptOutcome, MatchState, MatchStatus},
	questionnaire::TraitScores,
};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
	pub user_id: String,
	pub email: Option<String>,
	pub student_email: Option<String>,
	pub student_number: Option<String>,
	pub full_name: String,
	pub name: Option<String>,
	pub age: Option<i32>,
	pub bio: String,
	pub profile_image: String,
	pub profile_complete: bool,
	pub onboarding_complete: bool,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
	pub user_id: String,
	pub email: Option<String>,
	pub student_email: Option<String>,
	pub student_number: Option<String>,
	pub full_name: String,
	pub created_at: OffsetDateTime,
}
impl NewUser {
	pub fn into_user(self) -> User {
		User {
			user_id: self.user_id,
			email: self.email,
			student_email: self.student_email,
			student_number: self.student_number,
			full_name: self.full_name,
			name: None,
			age: None,
			bio: String::new(),
			profile_image: String::new(),
			profile_complete: false,
			onboarding_complete: false,
			created_at: self.created_at,
			updated_at: self.created_at,
		}
	}
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
	pub name: String,
	pub age: i32,
	pub bio: String,
	pub profile_image: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitRecord {
	pub user_id: String,
	pub scores: TraitScores,
	pub completed_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
	pub user_id: String,
	pub shown_users: BTreeSet<String>,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
	pub match_id: String,
	pub state: MatchState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcceptResult {
	pub record: MatchRecord,
	pub outcome: AcceptOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageThread {
	pub match_id: String,
	pub participants: Vec<String>,
	pub last_message: Option<String>,
	pub last_message_at: Option<OffsetDateTime>,
	pub last_message_sender: Option<String>,
	pub created_at: OffsetDateTime,
}
impl MessageThread {
	pub fn has_participant(&self, user_id: &str) -> bool {
		self.participants.iter().any(|participant| participant == user_id)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
	Text,
}
impl MessageKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Text => "text",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"text" => Some(Self::Text),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
	pub message_id: Uuid,
	pub match_id: String,
	/// Per-thread position, assigned in append order starting at 1.
	pub seq: i64,
	pub sender_id: String,
	pub text: String,
	pub kind: MessageKind,
	pub created_at: OffsetDateTime,
	pub read: bool,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
	pub sender_id: String,
	pub text: String,
	pub kind: MessageKind,
	pub sent_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TraitRow {
	pub user_id: String,
	pub cleanliness: f64,
	pub loudness: f64,
	pub niceness: f64,
	pub socialness: f64,
	pub organizedness: f64,
	pub bedtimeness: f64,
	pub budgetness: f64,
	pub completed_at: OffsetDateTime,
}
impl From<TraitRow> for TraitRecord {
	fn from(row: TraitRow) -> Self {
		Self {
			user_id: row.user_id,
			scores: TraitScores {
				cleanliness: row.cleanliness,
				loudness: row.loudness,
				niceness: row.niceness,
				socialness: row.socialness,
				organizedness: row.organizedness,
				bedtimeness: row.bedtimeness,
				budgetness: row.budgetness,
			},
			completed_at: row.completed_at,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedStateRow {
	pub user_id: String,
	pub shown_users: Vec<String>,
	pub updated_at: OffsetDateTime,
}
impl From<FeedStateRow> for FeedState {
	fn from(row: FeedStateRow) -> Self {
		Self {
			user_id: row.user_id,
			shown_users: row.shown_users.into_iter().collect(),
			updated_at: row.updated_at,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MatchRow {
	pub match_id: String,
	pub users: Vec<String>,
	pub status: String,
	pub created_at: OffsetDateTime,
	pub matched_at: Option<OffsetDateTime>,
}
impl TryFrom<MatchRow> for MatchRecord {
	type Error = Error;

	fn try_from(row: MatchRow) -> Result<Self> {
		let status = MatchStatus::parse(&row.status).ok_or_else(|| {
			let MatchRow { match_id, status, .. } = &row;

			Error::InvalidRecord(format!("Match {match_id} has unknown status {status:?}."))
		})?;

		Ok(Self {
			match_id: row.match_id,
			state: MatchState {
				users: row.users.into_iter().collect(),
				status,
				created_at: row.created_at,
				matched_at: row.matched_at,
			},
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ThreadRow {
	pub match_id: String,
	pub participants: Vec<String>,
	pub last_message: Option<String>,
	pub last_message_at: Option<OffsetDateTime>,
	pub last_message_sender: Option<String>,
	pub next_seq: i64,
	pub created_at: OffsetDateTime,
}
impl From<ThreadRow> for MessageThread {
	fn from(row: ThreadRow) -> Self {
		Self {
			match_id: row.match_id,
			participants: row.participants,
			last_message: row.last_message,
			last_message_at: row.last_message_at,
			last_message_sender: row.last_message_sender,
			created_at: row.created_at,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MessageRow {
	pub message_id: Uuid,
	pub match_id: String,
	pub seq: i64,
	pub sender_id: String,
	pub text: String,
	pub kind: String,
	pub created_at: OffsetDateTime,
	pub read: bool,
}
impl TryFrom<MessageRow> for Message {
	type Error = Error;

	fn try_from(row: MessageRow) -> Result<Self> {
		let kind = MessageKind::parse(&row.kind).ok_or_else(|| {
			let MessageRow { message_id, kind, .. } = &row;

			Error::InvalidRecord(format!("Message {message_id} has unknown kind {kind:?}."))
		})?;

		Ok(Self {
			message_id: row.message_id,
			match_id: row.match_id,
			seq: row.seq,
			sender_id: row.sender_id,
			text: row.text,
			kind,
			created_at: row.created_at,
			read: row.read,
		})
	}
}
