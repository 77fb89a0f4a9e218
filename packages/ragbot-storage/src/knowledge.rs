use std::collections::HashMap;

use ragbot_domain::knowledge::{KnowledgeEntry, KnowledgeRecord};

use crate::{Result, db::Db, models::KnowledgeRow};

/// Loads the rows whose ids are in `ids`. Unknown ids are omitted.
pub async fn fetch_by_ids(db: &Db, ids: &[i64]) -> Result<HashMap<i64, KnowledgeRecord>> {
	if ids.is_empty() {
		return Ok(HashMap::new());
	}

	let rows: Vec<KnowledgeRow> = sqlx::query_as(
		"\
SELECT id, key_name, value_text
FROM store_knowledge
WHERE id = ANY($1)",
	)
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows.into_iter().map(|row| (row.id, KnowledgeRecord::from(row))).collect())
}

pub async fn fetch_all(db: &Db) -> Result<Vec<KnowledgeRecord>> {
	let rows: Vec<KnowledgeRow> = sqlx::query_as(
		"\
SELECT id, key_name, value_text
FROM store_knowledge
ORDER BY id",
	)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows.into_iter().map(KnowledgeRecord::from).collect())
}

/// Inserts all entries in one transaction and returns their ids in input order.
pub async fn insert_entries(db: &Db, entries: &[KnowledgeEntry]) -> Result<Vec<i64>> {
	let mut tx = db.pool.begin().await?;
	let mut ids = Vec::with_capacity(entries.len());

	for entry in entries {
		let id: i64 = sqlx::query_scalar(
			"\
INSERT INTO store_knowledge (key_name, value_text)
VALUES ($1, $2)
RETURNING id",
		)
		.bind(entry.key.as_str())
		.bind(entry.value.as_str())
		.fetch_one(&mut *tx)
		.await?;

		ids.push(id);
	}

	tx.commit().await?;

	tracing::info!(records = ids.len(), "Inserted knowledge entries.");

	Ok(ids)
}

pub async fn count(db: &Db) -> Result<i64> {
	let count: i64 =
		sqlx::query_scalar("SELECT count(*) FROM store_knowledge").fetch_one(&db.pool).await?;

	Ok(count)
}
