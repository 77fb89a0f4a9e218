use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
	User,
	Assistant,
}
impl Speaker {
	/// Turn marker used in prompts and as completion stop sequences.
	pub fn marker(self) -> &'static str {
		match self {
			Self::User => "用户：",
			Self::Assistant => "助手：",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
	pub speaker: Speaker,
	pub text: String,
}
impl ConversationTurn {
	pub fn render(&self) -> String {
		format!("{}{}", self.speaker.marker(), self.text)
	}
}

/// Per-session history, bounded to the most recent `max_rounds` user/assistant exchanges.
#[derive(Debug, Clone)]
pub struct Conversation {
	turns: Vec<ConversationTurn>,
	max_rounds: usize,
}
impl Conversation {
	pub fn new(max_rounds: usize) -> Self {
		Self { turns: Vec::new(), max_rounds: max_rounds.max(1) }
	}

	pub fn turns(&self) -> &[ConversationTurn] {
		&self.turns
	}

	pub fn len(&self) -> usize {
		self.turns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.turns.is_empty()
	}

	pub fn max_turns(&self) -> usize {
		self.max_rounds * 2
	}

	/// Appends one completed exchange and drops the oldest turns beyond the window.
	pub fn record_exchange(&mut self, user: &str, assistant: &str) {
		self.turns.push(ConversationTurn { speaker: Speaker::User, text: user.to_string() });
		self.turns
			.push(ConversationTurn { speaker: Speaker::Assistant, text: assistant.to_string() });

		let max_turns = self.max_turns();

		if self.turns.len() > max_turns {
			let excess = self.turns.len() - max_turns;

			self.turns.drain(..excess);
		}
	}

	/// History lines, oldest first, one turn per line.
	pub fn render(&self) -> String {
		self.turns.iter().map(ConversationTurn::render).collect::<Vec<_>>().join("\n")
	}
}
