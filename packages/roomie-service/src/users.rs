//! Signup, bio submission, the trait questionnaire, and profile views.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use roomie_domain::{
	match_key, profile,
	questionnaire::{
		self, AnswerError, Answers, QUESTIONS, SCALE_LABELS, SCALE_MAX, SCALE_MIN, Trait,
		TraitScores,
	},
};
use roomie_storage::models::{NewUser, ProfileUpdate, TraitRecord, User};

use crate::{Boundary, Error, Result, RoomieService};

/// A user's profile as seen by anyone other than its owner. Contact fields are never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
	pub user_id: String,
	pub full_name: String,
	pub name: Option<String>,
	pub age: Option<i32>,
	pub bio: String,
	pub profile_image: String,
	pub profile_complete: bool,
	pub onboarding_complete: bool,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl From<&User> for Profile {
	fn from(user: &User) -> Self {
		Self {
			user_id: user.user_id.clone(),
			full_name: user.full_name.clone(),
			name: user.name.clone(),
			age: user.age,
			bio: user.bio.clone(),
			profile_image: user.profile_image.clone(),
			profile_complete: user.profile_complete,
			onboarding_complete: user.onboarding_complete,
			created_at: user.created_at,
		}
	}
}

/// The owner's own view, including contact fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnProfile {
	#[serde(flatten)]
	pub profile: Profile,
	pub email: Option<String>,
	pub student_email: Option<String>,
	pub student_number: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl From<&User> for OwnProfile {
	fn from(user: &User) -> Self {
		Self {
			profile: Profile::from(user),
			email: user.email.clone(),
			student_email: user.student_email.clone(),
			student_number: user.student_number.clone(),
			updated_at: user.updated_at,
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub student_email: Option<String>,
	#[serde(default)]
	pub full_name: String,
	#[serde(default)]
	pub student_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BioRequest {
	pub name: String,
	pub age: i32,
	#[serde(default)]
	pub bio: String,
	#[serde(default)]
	pub profile_image: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionnaireSubmission {
	pub answers: Answers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitVector {
	pub user_id: String,
	pub traits: TraitScores,
	#[serde(with = "time::serde::rfc3339")]
	pub completed_at: OffsetDateTime,
}
impl From<TraitRecord> for TraitVector {
	fn from(record: TraitRecord) -> Self {
		Self { user_id: record.user_id, traits: record.scores, completed_at: record.completed_at }
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct ScaleLabel {
	pub value: u8,
	pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionDefinition {
	pub id: &'static str,
	pub text: &'static str,
	pub traits: BTreeMap<&'static str, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionnaireDefinition {
	pub min: u8,
	pub max: u8,
	pub labels: Vec<ScaleLabel>,
	pub traits: Vec<&'static str>,
	pub questions: Vec<QuestionDefinition>,
}
impl QuestionnaireDefinition {
	fn build() -> Self {
		Self {
			min: SCALE_MIN,
			max: SCALE_MAX,
			labels: SCALE_LABELS
				.iter()
				.map(|(value, label)| ScaleLabel { value: *value, label: *label })
				.collect(),
			traits: Trait::ALL.iter().map(|t| t.as_str()).collect(),
			questions: QUESTIONS
				.iter()
				.map(|question| QuestionDefinition {
					id: question.id,
					text: question.text,
					traits: question.weights.iter().map(|(t, w)| (t.as_str(), *w)).collect(),
				})
				.collect(),
		}
	}
}

impl RoomieService {
	pub fn questionnaire(&self) -> QuestionnaireDefinition {
		QuestionnaireDefinition::build()
	}

	pub async fn register(&self, user_id: &str, req: RegisterRequest) -> Result<OwnProfile> {
		match_key::validate_user_id(user_id)
			.map_err(|err| Error::invalid_request(err.to_string()))?;

		let full_name = req.full_name.trim();

		if full_name.is_empty() {
			return Err(Error::invalid_request("fullName is required."));
		}

		let new_user = NewUser {
			user_id: user_id.to_string(),
			email: non_blank(req.email),
			student_email: non_blank(req.student_email),
			student_number: non_blank(req.student_number),
			full_name: full_name.to_string(),
			created_at: OffsetDateTime::now_utc(),
		};
		let user =
			self.guarded(Boundary::Other, "insert_user", self.store.insert_user(new_user)).await?;

		tracing::info!(user_id, "User registered.");

		Ok(OwnProfile::from(&user))
	}

	pub async fn me(&self, user_id: &str) -> Result<OwnProfile> {
		let user = self.require_user(user_id).await?;

		Ok(OwnProfile::from(&user))
	}

	pub async fn submit_bio(&self, user_id: &str, req: BioRequest) -> Result<OwnProfile> {
		profile::validate_bio(&req.name, req.age, &req.bio)
			.map_err(|err| Error::invalid_request(err.message()))?;

		let update = ProfileUpdate {
			name: req.name.trim().to_string(),
			age: req.age,
			bio: req.bio.trim().to_string(),
			profile_image: req.profile_image.trim().to_string(),
		};
		let user = self
			.guarded(
				Boundary::Other,
				"update_profile",
				self.store.update_profile(user_id, update, OffsetDateTime::now_utc()),
			)
			.await?;

		Ok(OwnProfile::from(&user))
	}

	/// Scores the answers, stores the live trait vector, and marks onboarding complete.
	pub async fn submit_questionnaire(
		&self,
		user_id: &str,
		req: QuestionnaireSubmission,
	) -> Result<TraitVector> {
		questionnaire::validate_answers(&req.answers).map_err(|err| match err {
			AnswerError::UnknownQuestion(id) =>
				Error::invalid_request(format!("Unknown question {id}.")),
			AnswerError::OutOfScale { question, rating } => Error::invalid_request(format!(
				"Answer {rating} for {question} is outside {SCALE_MIN}..={SCALE_MAX}."
			)),
		})?;

		let record = TraitRecord {
			user_id: user_id.to_string(),
			scores: questionnaire::score(&req.answers),
			completed_at: OffsetDateTime::now_utc(),
		};

		self.guarded(
			Boundary::Other,
			"complete_onboarding",
			self.store.complete_onboarding(record.clone()),
		)
		.await?;

		tracing::info!(user_id, answered = req.answers.len(), "Onboarding completed.");

		Ok(TraitVector::from(record))
	}

	pub(crate) async fn require_user(&self, user_id: &str) -> Result<User> {
		self.guarded(Boundary::Other, "get_user", self.store.get_user(user_id))
			.await?
			.ok_or_else(|| Error::not_found(format!("User {user_id} is not registered.")))
	}
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}
