//! Identity Gate: turns an `Authorization` header into the caller's user id.

use roomie_domain::match_key;

use crate::{Error, Result, RoomieService};

const BEARER_PREFIX: &str = "Bearer ";

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str> {
	let header = header.ok_or_else(|| Error::Unauthenticated {
		message: "Missing Authorization header.".to_string(),
	})?;
	let token = header
		.strip_prefix(BEARER_PREFIX)
		.map(str::trim)
		.filter(|token| !token.is_empty())
		.ok_or_else(|| Error::Unauthenticated {
			message: "Authorization header must be a Bearer token.".to_string(),
		})?;

	Ok(token)
}

impl RoomieService {
	pub async fn authenticate(&self, authorization: Option<&str>) -> Result<String> {
		let token = bearer_token(authorization)?;
		let subject = self.identity.verify(token).await.map_err(|err| {
			if err.is_provider_failure() {
				tracing::warn!(error = %err, "Identity provider failed to verify a token.");
			}

			Error::InvalidCredential { message: "Invalid or expired token.".to_string() }
		})?;

		// Subjects that cannot form a match key would make the user unmatchable.
		if let Err(err) = match_key::validate_user_id(&subject) {
			tracing::warn!(error = %err, "Identity provider returned an unusable subject.");

			return Err(Error::InvalidCredential {
				message: "Token subject is not a usable user id.".to_string(),
			});
		}

		Ok(subject)
	}
}
