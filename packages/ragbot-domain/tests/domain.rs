use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use ragbot_domain::{
	conversation::{Conversation, Speaker},
	exit::{DEFAULT_EXIT_KEYWORDS, ExitKeywords},
	knowledge,
};

fn temp_path(label: &str) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();

	env::temp_dir().join(format!("ragbot_domain_{label}_{nanos}_{pid}_{ordinal}"))
}

#[test]
fn conversation_never_exceeds_window() {
	for max_rounds in [1_usize, 2, 10] {
		let mut conversation = Conversation::new(max_rounds);

		for round in 0..(max_rounds * 3 + 1) {
			conversation.record_exchange(&format!("q{round}"), &format!("a{round}"));

			assert!(conversation.len() <= max_rounds * 2);
		}

		let turns = conversation.turns();
		let newest = format!("a{}", max_rounds * 3);

		assert_eq!(turns.len(), max_rounds * 2);
		assert_eq!(turns[0].speaker, Speaker::User);
		assert_eq!(turns.last().map(|turn| turn.text.as_str()), Some(newest.as_str()));
	}
}

#[test]
fn conversation_renders_markers() {
	let mut conversation = Conversation::new(10);

	conversation.record_exchange("有什么颜色", "黑色和白色。");

	assert_eq!(conversation.render(), "用户：有什么颜色\n助手：黑色和白色。");

	let json = serde_json::to_value(&conversation.turns()[0]).expect("turn must serialize");

	assert_eq!(json["speaker"], "user");
}

#[test]
fn missing_keyword_file_is_initialized_with_defaults() {
	let dir = temp_path("exit_init");
	let path = dir.join("exit_keywords.txt");
	let keywords = ExitKeywords::load_or_init(&path).expect("Failed to init keywords.");

	assert_eq!(keywords.len(), DEFAULT_EXIT_KEYWORDS.len());

	let written = fs::read_to_string(&path).expect("Keyword file must be written.");
	let lines = written.lines().collect::<Vec<_>>();
	let mut sorted = lines.clone();

	sorted.sort();

	assert_eq!(lines, sorted);
	assert_eq!(lines.len(), DEFAULT_EXIT_KEYWORDS.len());

	fs::remove_dir_all(&dir).expect("Failed to remove temp dir.");
}

#[test]
fn existing_keyword_file_is_loaded_verbatim() {
	let path = temp_path("exit_load");

	fs::write(&path, "stop\n\n  再会  \n").expect("Failed to write keyword file.");

	let keywords = ExitKeywords::load_or_init(&path).expect("Failed to load keywords.");

	assert_eq!(keywords.iter().collect::<Vec<_>>(), vec!["stop", "再会"]);
	assert!(keywords.matches("STOP please"));
	assert!(!keywords.matches("再见"));

	fs::remove_file(&path).expect("Failed to remove keyword file.");
}

#[test]
fn saved_keywords_round_trip() {
	let path = temp_path("exit_save");
	let mut keywords = ExitKeywords::defaults().expect("defaults must compile");

	keywords.insert("我先下线了").expect("insert must compile");
	keywords.save(&path).expect("Failed to save keywords.");

	let reloaded = ExitKeywords::load_or_init(&path).expect("Failed to reload keywords.");

	assert_eq!(reloaded.render(), keywords.render());
	assert!(reloaded.contains("我先下线了"));

	fs::remove_file(&path).expect("Failed to remove keyword file.");
}

#[test]
fn knowledge_file_parsing_skips_noise() {
	let entries = knowledge::parse_entries("尺码: 均码 36-40\n# comment\n\n价格: 299 元\n");

	assert_eq!(entries.len(), 2);
	assert_eq!(entries[1].key, "价格");
	assert_eq!(entries[1].value, "299 元");
}
