use std::time::Duration;

use reqwest::{Client, header::HeaderMap};
use serde_json::Value;
use tokio::time;

use crate::{Error, Result};

const MAX_BACKOFF_MS: u64 = 30_000;

/// Embeds a batch of texts, retrying transient failures with exponential backoff.
pub async fn embed(
	cfg: &ragbot_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let client = crate::http_client(cfg.timeout_ms)?;
	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let mut attempt = 0_u32;

	loop {
		attempt += 1;

		let err = match request_once(&client, &url, &headers, &body).await {
			Ok(json) => return parse_embedding_response(json, texts.len()),
			Err(err) => err,
		};

		if !err.is_retryable() {
			return Err(err);
		}
		if attempt > cfg.max_retries {
			if attempt == 1 {
				return Err(err);
			}

			return Err(Error::RetriesExhausted { attempts: attempt, source: Box::new(err) });
		}

		let delay = backoff_delay(cfg.retry_backoff_ms, attempt);

		tracing::warn!(
			error = %err,
			attempt,
			delay_ms = delay.as_millis() as u64,
			"Embedding request failed. Retrying."
		);

		time::sleep(delay).await;
	}
}

pub async fn embed_one(
	cfg: &ragbot_config::EmbeddingProviderConfig,
	text: &str,
) -> Result<Vec<f32>> {
	embed(cfg, &[text.to_string()]).await?.into_iter().next().ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response contained no vectors.".to_string() }
	})
}

async fn request_once(client: &Client, url: &str, headers: &HeaderMap, body: &Value) -> Result<Value> {
	let res = client.post(url).headers(headers.clone()).json(body).send().await?;
	let json: Value = crate::ensure_success(res).await?.json().await?;

	Ok(json)
}

fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
	let exponent = attempt.saturating_sub(1).min(16);
	let delay_ms = base_ms.saturating_mul(1_u64 << exponent).min(MAX_BACKOFF_MS);

	Duration::from_millis(delay_ms)
}

fn parse_embedding_response(json: Value, expected: usize) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| Error::InvalidResponse {
		message: "Embedding response is missing data array.".to_string(),
	})?;

	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse { message: "Embedding item missing embedding array.".to_string() }
		})?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	if indexed.len() != expected {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding response returned {} vectors for {expected} inputs.",
				indexed.len()
			),
		});
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json, 2).expect("parse failed");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[0], vec![0.5, 1.5]);
		assert_eq!(parsed[1], vec![2.0, 3.0]);
	}

	#[test]
	fn rejects_count_mismatch_and_non_numeric_values() {
		let short = serde_json::json!({ "data": [{ "index": 0, "embedding": [1.0] }] });

		assert!(matches!(parse_embedding_response(short, 2), Err(Error::InvalidResponse { .. })));

		let bad = serde_json::json!({ "data": [{ "index": 0, "embedding": ["x"] }] });

		assert!(matches!(parse_embedding_response(bad, 1), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn backoff_doubles_and_caps() {
		assert_eq!(backoff_delay(500, 1), Duration::from_millis(500));
		assert_eq!(backoff_delay(500, 2), Duration::from_millis(1_000));
		assert_eq!(backoff_delay(500, 3), Duration::from_millis(2_000));
		assert_eq!(backoff_delay(500, 40), Duration::from_millis(MAX_BACKOFF_MS));
	}
}
