//! Trait questionnaire definition and the additive scoring that turns answers into a
//! [`TraitScores`] vector.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const SCALE_MIN: u8 = 1;
pub const SCALE_MAX: u8 = 5;

pub const SCALE_LABELS: [(u8, &str); 5] = [
	(1, "Very Unlikely"),
	(2, "Unlikely"),
	(3, "Neutral"),
	(4, "Likely"),
	(5, "Very Likely"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trait {
	Cleanliness,
	Loudness,
	Niceness,
	Socialness,
	Organizedness,
	Bedtimeness,
	Budgetness,
}
impl Trait {
	pub const ALL: [Trait; 7] = [
		Trait::Cleanliness,
		Trait::Loudness,
		Trait::Niceness,
		Trait::Socialness,
		Trait::Organizedness,
		Trait::Bedtimeness,
		Trait::Budgetness,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Cleanliness => "cleanliness",
			Self::Loudness => "loudness",
			Self::Niceness => "niceness",
			Self::Socialness => "socialness",
			Self::Organizedness => "organizedness",
			Self::Bedtimeness => "bedtimeness",
			Self::Budgetness => "budgetness",
		}
	}
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Question {
	pub id: &'static str,
	pub text: &'static str,
	pub weights: &'static [(Trait, f64)],
}

pub const QUESTIONS: [Question; 7] = [
	Question {
		id: "Q1",
		text: "You notice shared spaces getting messy and no one has said anything. How likely are you to clean and suggest a simple system to keep it tidy?",
		weights: &[(Trait::Cleanliness, 0.9), (Trait::Organizedness, 0.7), (Trait::Niceness, 0.4)],
	},
	Question {
		id: "Q2",
		text: "It's late and your roommate is sleeping. How likely are you to keep noise to a minimum (headphones, low volume, quiet movement)?",
		weights: &[(Trait::Loudness, 1.0), (Trait::Bedtimeness, 0.7), (Trait::Niceness, 0.4)],
	},
	Question {
		id: "Q3",
		text: "Your roommate wants to have friends over. How likely are you to be okay with it while calmly setting any boundaries you have?",
		weights: &[(Trait::Socialness, 0.9), (Trait::Loudness, 0.5), (Trait::Niceness, 0.5)],
	},
	Question {
		id: "Q4",
		text: "You and your roommate are managing rent, bills, and shared purchases. How likely are you to track expenses and stick to agreed budgets?",
		weights: &[(Trait::Budgetness, 1.0), (Trait::Organizedness, 0.6), (Trait::Niceness, 0.4)],
	},
	Question {
		id: "Q5",
		text: "You tend to be awake late. How likely are you to adjust your routine so it doesn't disturb your roommate?",
		weights: &[(Trait::Bedtimeness, 0.8), (Trait::Loudness, 0.6), (Trait::Socialness, 0.4)],
	},
	Question {
		id: "Q6",
		text: "Shared supplies are running low (toilet paper, cleaning products). How likely are you to replace them without being reminded?",
		weights: &[
			(Trait::Cleanliness, 0.6),
			(Trait::Budgetness, 0.6),
			(Trait::Organizedness, 0.6),
		],
	},
	Question {
		id: "Q7",
		text: "A disagreement comes up about how the apartment should be run. How likely are you to compromise and find a middle ground?",
		weights: &[(Trait::Niceness, 1.0), (Trait::Socialness, 0.6), (Trait::Organizedness, 0.3)],
	},
];

pub type Answers = BTreeMap<String, u8>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitScores {
	pub cleanliness: f64,
	pub loudness: f64,
	pub niceness: f64,
	pub socialness: f64,
	pub organizedness: f64,
	pub bedtimeness: f64,
	pub budgetness: f64,
}
impl TraitScores {
	pub fn get(&self, t: Trait) -> f64 {
		match t {
			Trait::Cleanliness => self.cleanliness,
			Trait::Loudness => self.loudness,
			Trait::Niceness => self.niceness,
			Trait::Socialness => self.socialness,
			Trait::Organizedness => self.organizedness,
			Trait::Bedtimeness => self.bedtimeness,
			Trait::Budgetness => self.budgetness,
		}
	}

	fn slot(&mut self, t: Trait) -> &mut f64 {
		match t {
			Trait::Cleanliness => &mut self.cleanliness,
			Trait::Loudness => &mut self.loudness,
			Trait::Niceness => &mut self.niceness,
			Trait::Socialness => &mut self.socialness,
			Trait::Organizedness => &mut self.organizedness,
			Trait::Bedtimeness => &mut self.bedtimeness,
			Trait::Budgetness => &mut self.budgetness,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerError {
	UnknownQuestion(String),
	OutOfScale { question: String, rating: u8 },
}

pub fn question(id: &str) -> Option<&'static Question> {
	QUESTIONS.iter().find(|question| question.id == id)
}

/// Sums `rating * weight` per trait across all questions.
///
/// A question without an answer contributes a rating of 0, so a partial questionnaire
/// under-scores instead of failing. Scores are raw sums; nothing is normalized or clamped.
pub fn score(answers: &Answers) -> TraitScores {
	let mut scores = TraitScores::default();

	for question in &QUESTIONS {
		let rating = f64::from(answers.get(question.id).copied().unwrap_or(0));

		for (t, weight) in question.weights {
			*scores.slot(*t) += rating * weight;
		}
	}

	scores
}

pub fn validate_answers(answers: &Answers) -> Result<(), AnswerError> {
	for (id, rating) in answers {
		if question(id).is_none() {
			return Err(AnswerError::UnknownQuestion(id.clone()));
		}
		if !(SCALE_MIN..=SCALE_MAX).contains(rating) {
			return Err(AnswerError::OutOfScale { question: id.clone(), rating: *rating });
		}
	}

	Ok(())
}
