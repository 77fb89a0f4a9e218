pub mod chat;
pub mod exit;

mod error;

pub use chat::{ChatReply, ChatService};
pub use error::{Error, Result};
pub use exit::{ExitIntent, ExitIntentDetector};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use ragbot_config::{CompletionProviderConfig, Config, EmbeddingProviderConfig};
use ragbot_domain::knowledge::KnowledgeRecord;
use ragbot_providers::{
	completion::{self, CompletionOptions},
	embedding,
};
use ragbot_storage::{
	db::Db,
	index::{FlatIndex, SearchResult},
	knowledge,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, ragbot_providers::Result<Vec<Vec<f32>>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		prompt: &'a str,
		options: &'a CompletionOptions,
	) -> BoxFuture<'a, ragbot_providers::Result<String>>;
}

/// Read-only nearest-neighbour lookup over the embedded knowledge base.
pub trait VectorSearch
where
	Self: Send + Sync,
{
	fn search(&self, query: &[f32], k: usize) -> ragbot_storage::Result<SearchResult>;

	/// Record id stored at an index slot, if the slot is valid.
	fn record_id(&self, position: i64) -> Option<i64>;
}

pub trait KnowledgeStore
where
	Self: Send + Sync,
{
	fn fetch_by_ids<'a>(
		&'a self,
		ids: &'a [i64],
	) -> BoxFuture<'a, ragbot_storage::Result<HashMap<i64, KnowledgeRecord>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
	) -> Self {
		Self { embedding, completion }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), completion: provider }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, ragbot_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		prompt: &'a str,
		options: &'a CompletionOptions,
	) -> BoxFuture<'a, ragbot_providers::Result<String>> {
		Box::pin(completion::complete(cfg, prompt, options))
	}
}

impl VectorSearch for FlatIndex {
	fn search(&self, query: &[f32], k: usize) -> ragbot_storage::Result<SearchResult> {
		FlatIndex::search(self, query, k)
	}

	fn record_id(&self, position: i64) -> Option<i64> {
		FlatIndex::record_id(self, position)
	}
}

impl KnowledgeStore for Db {
	fn fetch_by_ids<'a>(
		&'a self,
		ids: &'a [i64],
	) -> BoxFuture<'a, ragbot_storage::Result<HashMap<i64, KnowledgeRecord>>> {
		Box::pin(knowledge::fetch_by_ids(self, ids))
	}
}

/// Loads the persisted index and connects to the knowledge store.
///
/// A missing or corrupt index, an index built for another embedding dimension, or an
/// unreachable database are all startup failures.
pub async fn open(cfg: Config) -> Result<ChatService> {
	let index = FlatIndex::load(&cfg.storage.index.path)
		.map_err(|err| Error::Config { message: err.to_string() })?;
	let expected = cfg.providers.embedding.dimensions as usize;

	if index.dimensions() != expected {
		return Err(Error::Config {
			message: format!(
				"Index at {:?} has {} dimensions but providers.embedding.dimensions is {expected}.",
				cfg.storage.index.path,
				index.dimensions()
			),
		});
	}

	let db = Db::connect(&cfg.storage.postgres)
		.await
		.map_err(|err| Error::Config { message: err.to_string() })?;

	tracing::info!(
		path = %cfg.storage.index.path.display(),
		vectors = index.len(),
		"Loaded vector index."
	);

	Ok(ChatService::new(cfg, Arc::new(index), Arc::new(db)))
}
