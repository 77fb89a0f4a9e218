use std::{
	fs,
	path::{Path, PathBuf},
};

use ragbot_config::{Config, EmbeddingProviderConfig};
use ragbot_domain::knowledge::{self as entries, KnowledgeRecord};
use ragbot_service::EmbeddingProvider;
use ragbot_storage::{db::Db, index::FlatIndex, knowledge};

use crate::{Error, Result};

#[derive(Debug)]
pub struct IngestReport {
	pub inserted: usize,
	pub indexed: usize,
	pub path: PathBuf,
}

/// Loads the optional knowledge file into the store, then rebuilds and verifies the index file
/// from every stored record.
pub async fn run_ingest(
	cfg: &Config,
	db: &Db,
	source: Option<&Path>,
	output: &Path,
	embedding: &dyn EmbeddingProvider,
) -> Result<IngestReport> {
	let inserted = match source {
		Some(path) => {
			let text = fs::read_to_string(path)
				.map_err(|err| Error::ReadSource { path: path.to_path_buf(), source: err })?;
			let parsed = entries::parse_entries(&text);

			if parsed.is_empty() {
				tracing::warn!(path = %path.display(), "Knowledge file contained no entries.");
			}

			knowledge::insert_entries(db, &parsed).await?.len()
		},
		None => 0,
	};
	let records = knowledge::fetch_all(db).await?;

	if records.is_empty() {
		return Err(Error::Validation(
			"Knowledge table is empty. Provide --source to load entries first.".to_string(),
		));
	}

	let index = build_index(
		&cfg.providers.embedding,
		embedding,
		&records,
		cfg.ingest.batch_size as usize,
	)
	.await?;

	index.save(output)?;
	verify_index(output, records.len())?;

	Ok(IngestReport { inserted, indexed: records.len(), path: output.to_path_buf() })
}

/// Embeds record values in batches. Slot `i` of the index holds `records[i]`.
pub async fn build_index(
	cfg: &EmbeddingProviderConfig,
	embedding: &dyn EmbeddingProvider,
	records: &[KnowledgeRecord],
	batch_size: usize,
) -> Result<FlatIndex> {
	let mut entries = Vec::with_capacity(records.len());

	for (batch_no, batch) in records.chunks(batch_size.max(1)).enumerate() {
		let texts = batch.iter().map(|record| record.value.clone()).collect::<Vec<_>>();
		let vectors = embedding.embed(cfg, &texts).await?;

		if vectors.len() != batch.len() {
			return Err(Error::Validation(format!(
				"Embedding batch {batch_no} returned {} vectors for {} records.",
				vectors.len(),
				batch.len()
			)));
		}

		entries.extend(batch.iter().map(|record| record.id).zip(vectors));

		tracing::debug!(batch = batch_no, embedded = entries.len(), "Embedded batch.");
	}

	Ok(FlatIndex::build(cfg.dimensions as usize, entries)?)
}

/// Reloads the written file and checks its size and that the first vector finds itself.
pub fn verify_index(path: &Path, expected: usize) -> Result<()> {
	let index = FlatIndex::load(path)?;

	if index.len() != expected {
		return Err(Error::Validation(format!(
			"Index at {path:?} holds {} vectors, expected {expected}.",
			index.len()
		)));
	}

	let Some(first) = index.vector(0) else {
		return Ok(());
	};
	let hits = index.search(first, 1)?;

	if hits.positions.first() != Some(&0) {
		return Err(Error::Validation(format!(
			"Index at {path:?} failed the self-lookup check: nearest slot was {:?}.",
			hits.positions.first()
		)));
	}

	tracing::info!(path = %path.display(), vectors = index.len(), "Verified vector index.");

	Ok(())
}
