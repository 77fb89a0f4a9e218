pub mod completion;
pub mod embedding;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client, Response,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) fn http_client(timeout_ms: u64) -> Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?)
}

/// Turns a non-success response into [`Error::Status`] carrying the provider's message.
pub(crate) async fn ensure_success(res: Response) -> Result<Response> {
	let status = res.status();

	if status.is_success() {
		return Ok(res);
	}

	let body = res.text().await.unwrap_or_default();
	let message = error_message(&body)
		.unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

	Err(Error::Status { status: status.as_u16(), message })
}

fn error_message(body: &str) -> Option<String> {
	let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
		json.pointer("/error/message")
			.or_else(|| json.get("message"))
			.and_then(Value::as_str)
			.map(str::to_string)
	});

	from_json.or_else(|| {
		let trimmed = body.trim();

		(!trimmed.is_empty()).then(|| trimmed.to_string())
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn error_message_prefers_structured_fields() {
		assert_eq!(
			error_message(r#"{"error":{"message":"Invalid API-key provided."}}"#).as_deref(),
			Some("Invalid API-key provided.")
		);
		assert_eq!(
			error_message(r#"{"code":"Throttling","message":"Requests rate limit exceeded."}"#)
				.as_deref(),
			Some("Requests rate limit exceeded.")
		);
		assert_eq!(error_message(" upstream timeout \n").as_deref(), Some("upstream timeout"));
		assert_eq!(error_message(""), None);
	}

	#[test]
	fn rejects_non_string_default_headers() {
		let mut headers = Map::new();

		headers.insert("X-Retry".to_string(), Value::from(3));

		let err = auth_headers("secret", &headers).expect_err("Expected header error.");

		assert!(matches!(err, Error::InvalidConfig { .. }));
	}
}
