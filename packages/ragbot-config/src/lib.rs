mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chat, CompletionProviderConfig, Config, EmbeddingProviderConfig, Exit, ExitSemantic, Index,
	Ingest, Postgres, Providers, Service, Storage,
};

use std::{env, fs, path::Path};

pub const ENV_EMBEDDING_API_KEY: &str = "RAGBOT_EMBEDDING_API_KEY";
pub const ENV_COMPLETION_API_KEY: &str = "RAGBOT_COMPLETION_API_KEY";
pub const ENV_PG_DSN: &str = "RAGBOT_PG_DSN";
pub const ENV_INDEX_PATH: &str = "RAGBOT_INDEX_PATH";

pub fn load(path: &Path) -> Result<Config> {
	load_with_env(path, |key| env::var(key).ok())
}

/// Like [`load`], with environment lookups routed through `lookup`.
pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Config>
where
	F: Fn(&str) -> Option<String>,
{
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	apply_env_overrides(&mut cfg, lookup);

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.max_sessions == 0 {
		return Err(Error::Validation {
			message: "service.max_sessions must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.index.path.as_os_str().is_empty() {
		return Err(Error::Validation {
			message: "storage.index.path must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, timeout_ms) in [
		("embedding", cfg.providers.embedding.timeout_ms),
		("completion", cfg.providers.completion.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("providers.{label}.timeout_ms must be greater than zero."),
			});
		}
	}
	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("completion", &cfg.providers.completion.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	let temperature = cfg.providers.completion.temperature;

	if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
		return Err(Error::Validation {
			message: "providers.completion.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if cfg.providers.completion.max_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.completion.max_tokens must be greater than zero.".to_string(),
		});
	}
	if cfg.chat.top_k == 0 {
		return Err(Error::Validation {
			message: "chat.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.chat.max_history_rounds == 0 {
		return Err(Error::Validation {
			message: "chat.max_history_rounds must be greater than zero.".to_string(),
		});
	}
	if cfg.exit.keywords_path.as_os_str().is_empty() {
		return Err(Error::Validation {
			message: "exit.keywords_path must be non-empty.".to_string(),
		});
	}

	let threshold = cfg.exit.semantic.threshold;

	if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
		return Err(Error::Validation {
			message: "exit.semantic.threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.ingest.batch_size == 0 {
		return Err(Error::Validation {
			message: "ingest.batch_size must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn apply_env_overrides<F>(cfg: &mut Config, lookup: F)
where
	F: Fn(&str) -> Option<String>,
{
	let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

	if let Some(key) = non_blank(ENV_EMBEDDING_API_KEY) {
		cfg.providers.embedding.api_key = key;
	}
	if let Some(key) = non_blank(ENV_COMPLETION_API_KEY) {
		cfg.providers.completion.api_key = key;
	}
	if let Some(dsn) = non_blank(ENV_PG_DSN) {
		cfg.storage.postgres.dsn = dsn;
	}
	if let Some(path) = non_blank(ENV_INDEX_PATH) {
		cfg.storage.index.path = path.into();
	}
}

fn normalize(cfg: &mut Config) {
	for base in
		[&mut cfg.providers.embedding.api_base, &mut cfg.providers.completion.api_base]
	{
		let trimmed = base.trim_end_matches('/').len();

		base.truncate(trimmed);
	}

	cfg.providers.completion.stop.retain(|stop| !stop.is_empty());
}
