use std::{collections::BTreeSet, fs, io::ErrorKind, path::Path};

use regex::{Regex, RegexBuilder};

use crate::{Error, Result};

pub const DEFAULT_EXIT_KEYWORDS: [&str; 24] = [
	"退出",
	"再见",
	"结束",
	"bye",
	"goodbye",
	"quit",
	"exit",
	"我问完了",
	"不用了",
	"没问题",
	"不用谢谢",
	"谢谢",
	"拜拜",
	"走了",
	"结束对话",
	"完成了",
	"不需要了",
	"先这样",
	"就这样吧",
	"好了",
	"不必了",
	"算了",
	"没事",
	"不需要",
];

/// Trigger phrases plus a compiled case-insensitive substring matcher.
#[derive(Debug, Clone)]
pub struct ExitKeywords {
	keywords: BTreeSet<String>,
	matcher: Option<Regex>,
}
impl ExitKeywords {
	pub fn new<I, S>(keywords: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let keywords = keywords
			.into_iter()
			.map(Into::into)
			.map(|keyword: String| keyword.trim().to_string())
			.filter(|keyword| !keyword.is_empty())
			.collect::<BTreeSet<_>>();
		let matcher = compile(&keywords)?;

		Ok(Self { keywords, matcher })
	}

	pub fn defaults() -> Result<Self> {
		Self::new(DEFAULT_EXIT_KEYWORDS)
	}

	/// Parses the newline-delimited keyword file format. Blank lines are ignored.
	pub fn parse(text: &str) -> Result<Self> {
		Self::new(text.lines())
	}

	/// Loads the keyword file, writing the default set first when the file does not exist.
	pub fn load_or_init(path: &Path) -> Result<Self> {
		match fs::read_to_string(path) {
			Ok(text) => Self::parse(&text),
			Err(err) if err.kind() == ErrorKind::NotFound => {
				let keywords = Self::defaults()?;

				keywords.save(path)?;

				Ok(keywords)
			},
			Err(err) => Err(Error::Read { path: path.to_path_buf(), source: err }),
		}
	}

	pub fn save(&self, path: &Path) -> Result<()> {
		if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
			fs::create_dir_all(parent)
				.map_err(|err| Error::Write { path: path.to_path_buf(), source: err })?;
		}

		fs::write(path, self.render())
			.map_err(|err| Error::Write { path: path.to_path_buf(), source: err })
	}

	/// Sorted keywords, one per line, newline terminated.
	pub fn render(&self) -> String {
		self.keywords.iter().map(|keyword| format!("{keyword}\n")).collect()
	}

	pub fn matches(&self, utterance: &str) -> bool {
		self.matcher.as_ref().map(|matcher| matcher.is_match(utterance)).unwrap_or(false)
	}

	/// Adds a trigger phrase and recompiles the matcher. Returns `false` if it was already known.
	pub fn insert(&mut self, keyword: &str) -> Result<bool> {
		let keyword = keyword.trim();

		if keyword.is_empty() || self.keywords.contains(keyword) {
			return Ok(false);
		}

		let mut keywords = self.keywords.clone();

		keywords.insert(keyword.to_string());

		self.matcher = compile(&keywords)?;
		self.keywords = keywords;

		Ok(true)
	}

	pub fn contains(&self, keyword: &str) -> bool {
		self.keywords.contains(keyword)
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.keywords.iter().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.keywords.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keywords.is_empty()
	}
}

fn compile(keywords: &BTreeSet<String>) -> Result<Option<Regex>> {
	if keywords.is_empty() {
		return Ok(None);
	}

	let pattern =
		keywords.iter().map(|keyword| regex::escape(keyword)).collect::<Vec<_>>().join("|");
	let matcher = RegexBuilder::new(&pattern).case_insensitive(true).build()?;

	Ok(Some(matcher))
}
