//! Verification of bearer tokens against an external identity provider.
//!
//! The service never checks token signatures itself. It hands the raw token to an
//! [`IdentityVerifier`] and gets back the stable subject id used as the user id.

mod error;

pub use error::{Error, Result};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc, time::Duration};

use reqwest::{Client, header::AUTHORIZATION};
use serde_json::Value;

use roomie_config::{Identity, IdentityProvider};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait IdentityVerifier
where
	Self: Send + Sync,
{
	/// Resolves `token` to its subject. Fails with [`Error::Rejected`] when the token is invalid.
	fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Verifies tokens by posting them to a provider endpoint.
pub struct HttpVerifier {
	client: Client,
	verify_url: String,
	api_key: Option<String>,
}
impl HttpVerifier {
	pub fn new(cfg: &Identity) -> Result<Self> {
		let verify_url = cfg
			.verify_url
			.clone()
			.ok_or_else(|| Error::InvalidConfig("identity.verify_url is not set.".to_string()))?;
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { client, verify_url, api_key: cfg.api_key.clone() })
	}

	async fn verify_remote(&self, token: &str) -> Result<String> {
		let body = serde_json::json!({ "token": token });
		let mut req = self.client.post(&self.verify_url).json(&body);

		if let Some(api_key) = self.api_key.as_deref() {
			req = req.header(AUTHORIZATION, format!("Bearer {api_key}"));
		}

		let res = req.send().await?;
		let status = res.status();

		if !status.is_success() {
			return Err(Error::Rejected(format!("Provider answered {status}.")));
		}

		let body = res.bytes().await?;
		let json: Value = serde_json::from_slice(&body)?;

		parse_subject(&json)
	}
}
impl IdentityVerifier for HttpVerifier {
	fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<String>> {
		Box::pin(self.verify_remote(token))
	}
}

/// Fixed token table, for local development and tests.
pub struct StaticVerifier {
	tokens: HashMap<String, String>,
}
impl StaticVerifier {
	pub fn new(tokens: HashMap<String, String>) -> Self {
		Self { tokens }
	}
}
impl IdentityVerifier for StaticVerifier {
	fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<String>> {
		let result = self
			.tokens
			.get(token)
			.cloned()
			.ok_or_else(|| Error::Rejected("Unknown token.".to_string()));

		Box::pin(async move { result })
	}
}

pub fn from_config(cfg: &Identity) -> Result<Arc<dyn IdentityVerifier>> {
	match cfg.provider {
		IdentityProvider::Http => Ok(Arc::new(HttpVerifier::new(cfg)?)),
		IdentityProvider::Static => {
			if cfg.static_tokens.is_empty() {
				return Err(Error::InvalidConfig("identity.static_tokens is empty.".to_string()));
			}

			Ok(Arc::new(StaticVerifier::new(cfg.static_tokens.clone())))
		},
	}
}

fn parse_subject(json: &Value) -> Result<String> {
	let subject = ["uid", "sub"]
		.iter()
		.find_map(|field| json.get(*field).and_then(Value::as_str))
		.map(str::trim)
		.filter(|subject| !subject.is_empty())
		.ok_or_else(|| {
			Error::InvalidResponse("Verifier response is missing a uid or sub string.".to_string())
		})?;

	Ok(subject.to_string())
}
