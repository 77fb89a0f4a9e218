use std::{
	path::PathBuf,
	sync::{Arc, RwLock},
};

use ragbot_config::{Config, EmbeddingProviderConfig};
use ragbot_domain::{exit::ExitKeywords, similarity};

use crate::{EmbeddingProvider, Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum ExitIntent {
	None,
	/// The utterance contains a known trigger phrase.
	Exact,
	/// The utterance is semantically close to `keyword` but contains no trigger phrase.
	Similar { keyword: String, score: f32 },
}

struct ExitState {
	keywords: ExitKeywords,
	/// Keyword embeddings; only populated when semantic matching is enabled.
	vectors: Vec<(String, Vec<f32>)>,
}

/// Process-wide exit detection shared by all sessions.
pub struct ExitIntentDetector {
	path: PathBuf,
	semantic_enabled: bool,
	threshold: f32,
	batch_size: usize,
	embedding_cfg: EmbeddingProviderConfig,
	embedding: Arc<dyn EmbeddingProvider>,
	state: RwLock<ExitState>,
}
impl ExitIntentDetector {
	/// Loads (or initializes) the keyword file and, with semantic matching on, embeds every keyword.
	pub async fn new(cfg: &Config, embedding: Arc<dyn EmbeddingProvider>) -> Result<Self> {
		let path = cfg.exit.keywords_path.clone();
		let keywords = ExitKeywords::load_or_init(&path)?;
		let mut detector = Self {
			path,
			semantic_enabled: cfg.exit.semantic.enabled,
			threshold: cfg.exit.semantic.threshold,
			batch_size: (cfg.ingest.batch_size as usize).max(1),
			embedding_cfg: cfg.providers.embedding.clone(),
			embedding,
			state: RwLock::new(ExitState { keywords, vectors: Vec::new() }),
		};

		if detector.semantic_enabled {
			let texts: Vec<String> =
				detector.read_state(|state| state.keywords.iter().map(str::to_string).collect());
			let vectors = detector.embed_all(texts).await?;

			detector.state.get_mut().unwrap_or_else(|err| err.into_inner()).vectors = vectors;
		}

		tracing::info!(
			keywords = detector.read_state(|state| state.keywords.len()),
			semantic = detector.semantic_enabled,
			"Loaded exit keywords."
		);

		Ok(detector)
	}

	/// Case-insensitive substring match against the trigger phrases.
	pub fn is_exit(&self, utterance: &str) -> bool {
		self.read_state(|state| state.keywords.matches(utterance))
	}

	pub async fn classify(&self, utterance: &str) -> ExitIntent {
		if self.is_exit(utterance) {
			return ExitIntent::Exact;
		}
		if !self.semantic_enabled {
			return ExitIntent::None;
		}

		let query = match self.embed_one(utterance).await {
			Ok(query) => query,
			Err(err) => {
				tracing::warn!(error = %err, "Exit intent embedding failed. Treating as not an exit.");

				return ExitIntent::None;
			},
		};
		let best = self.read_state(|state| {
			state
				.vectors
				.iter()
				.map(|(keyword, vector)| {
					(keyword.clone(), similarity::cosine_similarity(&query, vector))
				})
				.max_by(|(_, left), (_, right)| left.total_cmp(right))
		});

		match best {
			Some((keyword, score)) if score >= self.threshold => {
				tracing::debug!(keyword = %keyword, score, "Utterance resembles an exit keyword.");

				ExitIntent::Similar { keyword, score }
			},
			_ => ExitIntent::None,
		}
	}

	/// Adds `utterance` as a trigger phrase and rewrites the keyword file.
	///
	/// Returns `false` when the phrase is blank or already known. The in-memory set only
	/// changes once the file has been written.
	pub async fn learn(&self, utterance: &str) -> Result<bool> {
		let keyword = utterance.trim();

		if keyword.is_empty() || self.read_state(|state| state.keywords.contains(keyword)) {
			return Ok(false);
		}

		let vector = if self.semantic_enabled {
			match self.embed_one(keyword).await {
				Ok(vector) => Some(vector),
				Err(err) => {
					tracing::warn!(error = %err, "Failed to embed learned exit keyword.");

					None
				},
			}
		} else {
			None
		};
		let mut state = self.state.write().unwrap_or_else(|err| err.into_inner());
		let mut next = state.keywords.clone();

		if !next.insert(keyword)? {
			return Ok(false);
		}

		next.save(&self.path)?;

		state.keywords = next;

		if let Some(vector) = vector {
			state.vectors.push((keyword.to_string(), vector));
		}

		tracing::info!(keyword, "Learned exit keyword.");

		Ok(true)
	}

	pub fn semantic_enabled(&self) -> bool {
		self.semantic_enabled
	}

	fn read_state<T>(&self, f: impl FnOnce(&ExitState) -> T) -> T {
		let state = self.state.read().unwrap_or_else(|err| err.into_inner());

		f(&state)
	}

	async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let vectors = self
			.embedding
			.embed(&self.embedding_cfg, &[text.to_string()])
			.await
			.map_err(Error::embedding)?;

		vectors.into_iter().next().ok_or_else(|| Error::Embedding {
			message: "Embedding provider returned no vectors.".to_string(),
		})
	}

	async fn embed_all(&self, texts: Vec<String>) -> Result<Vec<(String, Vec<f32>)>> {
		let mut out = Vec::with_capacity(texts.len());

		for batch in texts.chunks(self.batch_size) {
			let vectors =
				self.embedding.embed(&self.embedding_cfg, batch).await.map_err(Error::embedding)?;

			if vectors.len() != batch.len() {
				return Err(Error::Embedding {
					message: format!(
						"Embedding provider returned {} vectors for {} keywords.",
						vectors.len(),
						batch.len()
					),
				});
			}

			out.extend(batch.iter().cloned().zip(vectors));
		}

		Ok(out)
	}
}
