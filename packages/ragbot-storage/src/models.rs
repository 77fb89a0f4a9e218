use ragbot_domain::knowledge::KnowledgeRecord;

#[derive(Debug, sqlx::FromRow)]
pub struct KnowledgeRow {
	pub id: i64,
	pub key_name: String,
	pub value_text: String,
}
impl From<KnowledgeRow> for KnowledgeRecord {
	fn from(row: KnowledgeRow) -> Self {
		Self { id: row.id, key: row.key_name, value: row.value_text }
	}
}
