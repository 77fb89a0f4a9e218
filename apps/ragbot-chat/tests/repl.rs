use std::{
	collections::HashMap,
	env, fs,
	path::{Path, PathBuf},
	sync::{
		Arc,
		atomic::{AtomicU64, AtomicUsize, Ordering},
	},
	time::{SystemTime, UNIX_EPOCH},
};

use ragbot_chat::Repl;
use ragbot_config::{CompletionProviderConfig, Config, EmbeddingProviderConfig};
use ragbot_domain::knowledge::KnowledgeRecord;
use ragbot_providers::completion::CompletionOptions;
use ragbot_service::{
	BoxFuture, ChatService, CompletionProvider, EmbeddingProvider, ExitIntentDetector,
	KnowledgeStore, Providers,
};
use ragbot_storage::index::FlatIndex;

struct TopicEmbedding;
impl EmbeddingProvider for TopicEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, ragbot_providers::Result<Vec<Vec<f32>>>> {
		let vectors = texts
			.iter()
			.map(|text| {
				if text.contains("再见") || text.contains("回头聊") {
					vec![0.0, 1.0]
				} else {
					vec![1.0, 0.0]
				}
			})
			.collect();

		Box::pin(async move { Ok(vectors) })
	}
}

struct FixedCompletion {
	calls: AtomicUsize,
}
impl CompletionProvider for FixedCompletion {
	fn complete<'a>(
		&'a self,
		_cfg: &'a CompletionProviderConfig,
		_prompt: &'a str,
		_options: &'a CompletionOptions,
	) -> BoxFuture<'a, ragbot_providers::Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move { Ok("均码 36-40。".to_string()) })
	}
}

struct MemoryStore(HashMap<i64, KnowledgeRecord>);
impl KnowledgeStore for MemoryStore {
	fn fetch_by_ids<'a>(
		&'a self,
		ids: &'a [i64],
	) -> BoxFuture<'a, ragbot_storage::Result<HashMap<i64, KnowledgeRecord>>> {
		let found = ids
			.iter()
			.filter_map(|id| self.0.get(id).map(|record| (*id, record.clone())))
			.collect();

		Box::pin(async move { Ok(found) })
	}
}

fn temp_dir(label: &str) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let dir = env::temp_dir().join(format!(
		"ragbot_chat_{label}_{nanos}_{}_{ordinal}",
		std::process::id()
	));

	fs::create_dir_all(&dir).expect("Failed to create temp dir.");

	dir
}

fn load_config(dir: &Path, semantic: bool) -> Config {
	let path = dir.join("ragbot.toml");
	let keywords_path = dir.join("exit_keywords.txt");
	let toml = format!(
		r#"
[service]
http_bind = "127.0.0.1:0"
log_level = "info"

[storage.postgres]
dsn            = "postgres://unused"
pool_max_conns = 1

[storage.index]
path = "unused.ragbot"

[providers.embedding]
provider_id = "test"
api_base    = "http://127.0.0.1:1"
api_key     = "test-key"
path        = "/embeddings"
model       = "test-embed"
dimensions  = 2

[providers.completion]
provider_id = "test"
api_base    = "http://127.0.0.1:1"
api_key     = "test-key"
path        = "/chat/completions"
model       = "test-chat"

[chat]
stream_delay_ms = 0

[exit]
keywords_path = "{}"

[exit.semantic]
enabled = {semantic}
"#,
		keywords_path.display()
	);

	fs::write(&path, toml).expect("Failed to write config.");
	fs::write(&keywords_path, "再见\n").expect("Failed to write keyword file.");

	ragbot_config::load_with_env(&path, |_| None).expect("Failed to load config.")
}

async fn session(
	dir: &Path,
	semantic: bool,
	records: &[(i64, &str, &str)],
	input: &str,
) -> (String, usize) {
	session_after_startup(dir, semantic, records, input, |_| {}).await
}

/// Like [`session`], running `after_startup` once the detector has loaded its keywords.
async fn session_after_startup(
	dir: &Path,
	semantic: bool,
	records: &[(i64, &str, &str)],
	input: &str,
	after_startup: impl FnOnce(&Path),
) -> (String, usize) {
	let config = load_config(dir, semantic);
	let embedding: Arc<dyn EmbeddingProvider> = Arc::new(TopicEmbedding);
	let completion = Arc::new(FixedCompletion { calls: AtomicUsize::new(0) });
	let detector =
		ExitIntentDetector::new(&config, embedding.clone()).await.expect("Failed to build detector.");

	after_startup(dir);
	let index = FlatIndex::build(2, vec![(1, vec![1.0, 0.0])]).expect("Failed to build index.");
	let store = MemoryStore(
		records
			.iter()
			.map(|(id, key, value)| {
				(*id, KnowledgeRecord { id: *id, key: key.to_string(), value: value.to_string() })
			})
			.collect(),
	);
	let service = ChatService::with_providers(
		config,
		Arc::new(index),
		Arc::new(store),
		Providers::new(embedding, completion.clone()),
	);
	let mut output = Vec::new();

	Repl::new(&service, &detector)
		.run(input.as_bytes(), &mut output)
		.await
		.expect("REPL failed.");

	(String::from_utf8(output).expect("Output must be UTF-8."), completion.calls.load(Ordering::SeqCst))
}

#[tokio::test]
async fn answers_then_exits_on_keyword() {
	let dir = temp_dir("exact");
	let (output, calls) =
		session(&dir, false, &[(1, "尺码", "均码 36-40")], "\n有什么尺码\n好的再见\n不会被读到\n").await;

	assert!(output.starts_with(ragbot_chat::WELCOME_BANNER));
	assert!(output.contains("你：助手：均码 36-40。\n"));
	assert!(output.ends_with("助手：感谢您的咨询，再见！\n"));
	assert_eq!(calls, 1);

	fs::remove_dir_all(&dir).expect("Failed to remove temp dir.");
}

#[tokio::test]
async fn missing_knowledge_is_reported() {
	let dir = temp_dir("no_info");
	let (output, calls) = session(&dir, false, &[], "有什么尺码\n").await;

	assert!(output.contains("助手：未找到相关信息。\n"));
	assert_eq!(calls, 0);

	fs::remove_dir_all(&dir).expect("Failed to remove temp dir.");
}

#[tokio::test]
async fn confirmed_similar_phrase_is_learned() {
	let dir = temp_dir("learn");
	let (output, calls) = session(&dir, true, &[], "回头聊\ny\n").await;

	assert!(output.contains("检测到退出命令意图，是否将 \"回头聊\" 添加到退出关键词中？ (y/n): "));
	assert!(output.contains("新增退出关键词: 回头聊\n"));
	assert!(output.ends_with("助手：感谢您的咨询，再见！\n"));
	assert_eq!(calls, 0);

	let keywords = fs::read_to_string(dir.join("exit_keywords.txt")).expect("Failed to read file.");

	assert!(keywords.lines().any(|line| line == "回头聊"));

	fs::remove_dir_all(&dir).expect("Failed to remove temp dir.");
}

#[tokio::test]
async fn declined_similar_phrase_still_exits() {
	let dir = temp_dir("decline");
	let (output, _) = session(&dir, true, &[], "回头聊\nn\n").await;

	assert!(!output.contains("新增退出关键词"));
	assert!(output.ends_with("助手：感谢您的咨询，再见！\n"));
	assert_eq!(
		fs::read_to_string(dir.join("exit_keywords.txt")).expect("Failed to read file."),
		"再见\n"
	);

	fs::remove_dir_all(&dir).expect("Failed to remove temp dir.");
}

#[tokio::test]
async fn unwritable_keyword_file_still_ends_the_session() {
	let dir = temp_dir("unwritable");
	let (output, _) = session_after_startup(&dir, true, &[], "回头聊\ny\n", |dir| {
		let path = dir.join("exit_keywords.txt");

		fs::remove_file(&path).expect("Failed to remove keyword file.");
		fs::create_dir(&path).expect("Failed to replace keyword file with a directory.");
	})
	.await;

	assert!(output.contains("(y/n): "));
	assert!(output.contains("退出关键词保存失败: 回头聊\n"));
	assert!(!output.contains("新增退出关键词"));
	assert!(output.ends_with("助手：感谢您的咨询，再见！\n"));

	fs::remove_dir_all(&dir).expect("Failed to remove temp dir.");
}
