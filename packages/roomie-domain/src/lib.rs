pub mod match_key;
pub mod match_state;
pub mod profile;
pub mod questionnaire;
