use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

/// Decoding parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionOptions {
	pub temperature: f32,
	pub max_tokens: u32,
	pub stop: Vec<String>,
}
impl CompletionOptions {
	pub fn from_config(cfg: &ragbot_config::CompletionProviderConfig) -> Self {
		Self { temperature: cfg.temperature, max_tokens: cfg.max_tokens, stop: cfg.stop.clone() }
	}
}

pub async fn complete(
	cfg: &ragbot_config::CompletionProviderConfig,
	prompt: &str,
	options: &CompletionOptions,
) -> Result<String> {
	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"messages": [{ "role": "user", "content": prompt }],
		"temperature": options.temperature,
		"max_tokens": options.max_tokens,
	});

	if !options.stop.is_empty() {
		body["stop"] = serde_json::json!(options.stop);
	}

	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = crate::ensure_success(res).await?.json().await?;

	parse_completion_response(json)
}

fn parse_completion_response(json: Value) -> Result<String> {
	let text = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		// Application-style endpoints wrap the reply as `output.text`.
		.or_else(|| json.pointer("/output/text").and_then(|t| t.as_str()))
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing message content.".to_string(),
		})?;

	Ok(text.trim().to_string())
}
