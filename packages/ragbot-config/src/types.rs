use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub chat: Chat,
	pub exit: Exit,
	#[serde(default)]
	pub ingest: Ingest,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	/// Upper bound on concurrently tracked HTTP conversations.
	#[serde(default = "default_max_sessions")]
	pub max_sessions: u32,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub index: Index,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Index {
	pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub completion: CompletionProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	/// Retries after the first attempt; transport errors, 429 and 5xx only.
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	#[serde(default = "default_retry_backoff_ms")]
	pub retry_backoff_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	#[serde(default)]
	pub temperature: f32,
	#[serde(default = "default_max_tokens")]
	pub max_tokens: u32,
	/// Turn markers; keeps the model from writing the next user turn itself.
	#[serde(default = "default_stop")]
	pub stop: Vec<String>,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Chat {
	pub top_k: u32,
	pub max_history_rounds: u32,
	pub stream_delay_ms: u64,
}
impl Default for Chat {
	fn default() -> Self {
		Self { top_k: 5, max_history_rounds: 10, stream_delay_ms: 20 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Exit {
	pub keywords_path: PathBuf,
	#[serde(default)]
	pub semantic: ExitSemantic,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExitSemantic {
	pub enabled: bool,
	pub threshold: f32,
}
impl Default for ExitSemantic {
	fn default() -> Self {
		Self { enabled: false, threshold: 0.65 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ingest {
	pub batch_size: u32,
}
impl Default for Ingest {
	fn default() -> Self {
		Self { batch_size: 5 }
	}
}

fn default_max_sessions() -> u32 {
	1_024
}

fn default_timeout_ms() -> u64 {
	30_000
}

fn default_max_retries() -> u32 {
	3
}

fn default_retry_backoff_ms() -> u64 {
	500
}

fn default_max_tokens() -> u32 {
	150
}

fn default_stop() -> Vec<String> {
	vec!["用户：".to_string(), "助手：".to_string()]
}
