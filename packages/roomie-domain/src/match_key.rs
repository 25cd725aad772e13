//! Deterministic identifiers for an unordered pair of users.
//!
//! The persisted format is `"{min}_{max}"` with the two ids in lexicographic order. Ids may not
//! contain the separator, which keeps every key parseable back into its two components.

pub const SEPARATOR: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
	EmptyId,
	ContainsSeparator,
	SamePair,
}
impl std::fmt::Display for KeyError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::EmptyId => write!(f, "User id must be non-empty."),
			Self::ContainsSeparator => write!(f, "User id must not contain '{SEPARATOR}'."),
			Self::SamePair => write!(f, "A match needs two distinct users."),
		}
	}
}

impl std::error::Error for KeyError {}

pub fn validate_user_id(id: &str) -> Result<(), KeyError> {
	if id.trim().is_empty() {
		return Err(KeyError::EmptyId);
	}
	if id.contains(SEPARATOR) {
		return Err(KeyError::ContainsSeparator);
	}

	Ok(())
}

pub fn match_key(a: &str, b: &str) -> Result<String, KeyError> {
	validate_user_id(a)?;
	validate_user_id(b)?;

	if a == b {
		return Err(KeyError::SamePair);
	}

	let (low, high) = if a <= b { (a, b) } else { (b, a) };

	Ok(format!("{low}{SEPARATOR}{high}"))
}

/// Splits a key into its two components, or `None` when it is not a well-formed pair key.
pub fn split(key: &str) -> Option<(&str, &str)> {
	let (low, high) = key.split_once(SEPARATOR)?;

	if low.is_empty() || high.is_empty() || high.contains(SEPARATOR) || low >= high {
		return None;
	}

	Some((low, high))
}

pub fn involves(key: &str, user_id: &str) -> bool {
	split(key).map(|(low, high)| low == user_id || high == user_id).unwrap_or(false)
}

/// Returns the other participant of `key` from `user_id`'s point of view.
pub fn counterparty<'a>(key: &'a str, user_id: &str) -> Option<&'a str> {
	let (low, high) = split(key)?;

	if low == user_id {
		Some(high)
	} else if high == user_id {
		Some(low)
	} else {
		None
	}
}
