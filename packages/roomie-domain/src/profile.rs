use std::ops::RangeInclusive;

pub const AGE_RANGE: RangeInclusive<i32> = 18..=120;
pub const MAX_NAME_CHARS: usize = 80;
pub const MAX_BIO_CHARS: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
	EmptyName,
	NameTooLong,
	AgeOutOfRange,
	BioTooLong,
}
impl ProfileError {
	pub fn message(self) -> &'static str {
		match self {
			Self::EmptyName => "name must be non-empty.",
			Self::NameTooLong => "name is too long.",
			Self::AgeOutOfRange => "age must be between 18 and 120.",
			Self::BioTooLong => "bio is too long.",
		}
	}
}

pub fn validate_bio(name: &str, age: i32, bio: &str) -> Result<(), ProfileError> {
	let name = name.trim();

	if name.is_empty() {
		return Err(ProfileError::EmptyName);
	}
	if name.chars().count() > MAX_NAME_CHARS {
		return Err(ProfileError::NameTooLong);
	}
	if !AGE_RANGE.contains(&age) {
		return Err(ProfileError::AgeOutOfRange);
	}
	if bio.chars().count() > MAX_BIO_CHARS {
		return Err(ProfileError::BioTooLong);
	}

	Ok(())
}
