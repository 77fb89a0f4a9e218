use crate::{
	conversation::{Conversation, Speaker},
	knowledge::KnowledgeRecord,
};

const GROUNDING_INSTRUCTION: &str =
	"请根据以下已知信息，回答用户的问题。如果无法从中得到答案，请告诉用户您不知道。";
const CONTEXT_HEADER: &str = "已知信息：";
const GROUNDING_CONSTRAINT: &str = "请注意，您的回答应仅基于以上提供的信息，不要添加任何其他内容。";

/// Renders retrieved records as `key：value` lines in the given order.
pub fn render_context(records: &[KnowledgeRecord]) -> String {
	records.iter().map(KnowledgeRecord::render).collect::<Vec<_>>().join("\n")
}

/// Builds the completion prompt. The prompt ends with the assistant marker so the model
/// continues exactly one assistant turn.
pub fn build_prompt(history: &Conversation, records: &[KnowledgeRecord], utterance: &str) -> String {
	let mut prompt = String::new();

	prompt.push_str(GROUNDING_INSTRUCTION);
	prompt.push_str("\n\n");
	prompt.push_str(CONTEXT_HEADER);
	prompt.push('\n');
	prompt.push_str(&render_context(records));
	prompt.push_str("\n\n");
	prompt.push_str(GROUNDING_CONSTRAINT);
	prompt.push_str("\n\n");

	if !history.is_empty() {
		prompt.push_str(&history.render());
		prompt.push('\n');
	}

	prompt.push_str(Speaker::User.marker());
	prompt.push_str(utterance);
	prompt.push('\n');
	prompt.push_str(Speaker::Assistant.marker());

	prompt
}
