use serde::{Deserialize, Serialize};

/// Separator between key and value in the knowledge text file.
pub const ENTRY_SEPARATOR: &str = ": ";

/// A stored knowledge row. `id` joins index slots to store rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
	pub id: i64,
	pub key: String,
	pub value: String,
}
impl KnowledgeRecord {
	/// Context line as it appears in prompts, joined by a full-width colon.
	pub fn render(&self) -> String {
		format!("{}：{}", self.key, self.value)
	}
}

/// A parsed but not yet persisted knowledge row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeEntry {
	pub key: String,
	pub value: String,
}

/// Parses `key: value` lines. Blank lines and lines without the separator are skipped.
pub fn parse_entries(text: &str) -> Vec<KnowledgeEntry> {
	text.lines()
		.filter_map(|line| {
			let line = line.trim();

			if line.is_empty() {
				return None;
			}

			let (key, value) = line.split_once(ENTRY_SEPARATOR)?;

			Some(KnowledgeEntry { key: key.to_string(), value: value.to_string() })
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_first_separator_only() {
		let entries = parse_entries("材质: 头层牛皮: 进口\n\n无分隔符的行\n尺码: 均码 36-40\n");

		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].key, "材质");
		assert_eq!(entries[0].value, "头层牛皮: 进口");
		assert_eq!(entries[1], KnowledgeEntry {
			key: "尺码".to_string(),
			value: "均码 36-40".to_string()
		});
	}

	#[test]
	fn renders_with_full_width_colon() {
		let record =
			KnowledgeRecord { id: 1, key: "尺码".to_string(), value: "均码 36-40".to_string() };

		assert_eq!(record.render(), "尺码：均码 36-40");
	}
}
