use std::sync::Arc;

use ragbot_config::Config;
use ragbot_domain::{conversation::Conversation, knowledge::KnowledgeRecord, prompt};
use ragbot_providers::completion::CompletionOptions;

use crate::{Error, KnowledgeStore, Providers, Result, VectorSearch};

pub const NO_RELEVANT_INFORMATION: &str = "未找到相关信息。";

/// Outcome of one user turn.
#[derive(Debug)]
pub enum ChatReply {
	/// A grounded answer and the record ids it was grounded on, in retrieval order.
	Answer { text: String, sources: Vec<i64> },
	/// Retrieval found nothing; the model was not called.
	NoRelevantInformation,
	Failed(Error),
}
impl ChatReply {
	/// Text shown to the user for this reply.
	pub fn message(&self) -> String {
		match self {
			Self::Answer { text, .. } => text.clone(),
			Self::NoRelevantInformation => NO_RELEVANT_INFORMATION.to_string(),
			Self::Failed(err) => failure_message(err),
		}
	}

	pub fn is_answer(&self) -> bool {
		matches!(self, Self::Answer { .. })
	}
}

pub struct ChatService {
	pub cfg: Config,
	pub index: Arc<dyn VectorSearch>,
	pub store: Arc<dyn KnowledgeStore>,
	pub providers: Providers,
}
impl ChatService {
	pub fn new(cfg: Config, index: Arc<dyn VectorSearch>, store: Arc<dyn KnowledgeStore>) -> Self {
		Self { cfg, index, store, providers: Providers::default() }
	}

	pub fn with_providers(
		cfg: Config,
		index: Arc<dyn VectorSearch>,
		store: Arc<dyn KnowledgeStore>,
		providers: Providers,
	) -> Self {
		Self { cfg, index, store, providers }
	}

	/// Empty history sized by `chat.max_history_rounds`.
	pub fn new_conversation(&self) -> Conversation {
		Conversation::new(self.cfg.chat.max_history_rounds as usize)
	}

	/// Answers one utterance. History is only extended when the model produced an answer.
	pub async fn query(&self, conversation: &mut Conversation, utterance: &str) -> ChatReply {
		let records = match self.retrieve(utterance).await {
			Ok(records) => records,
			Err(err) => {
				tracing::warn!(error = %err, "Retrieval failed.");

				return ChatReply::Failed(err);
			},
		};

		if records.is_empty() {
			tracing::info!("No relevant knowledge for utterance.");

			return ChatReply::NoRelevantInformation;
		}

		let prompt = prompt::build_prompt(conversation, &records, utterance);
		let cfg = &self.cfg.providers.completion;
		let options = CompletionOptions::from_config(cfg);
		let text = match self.providers.completion.complete(cfg, &prompt, &options).await {
			Ok(text) => text,
			Err(err) => {
				let err = Error::completion(err);

				tracing::warn!(error = %err, "Completion failed.");

				return ChatReply::Failed(err);
			},
		};

		conversation.record_exchange(utterance, &text);

		ChatReply::Answer { text, sources: records.iter().map(|record| record.id).collect() }
	}

	/// Embeds the utterance, searches the index and loads the matching records.
	///
	/// Records come back in retrieval order. Slots that do not map to a record, and ids
	/// missing from the store, are skipped.
	pub async fn retrieve(&self, utterance: &str) -> Result<Vec<KnowledgeRecord>> {
		let query = self.embed_query(utterance).await?;
		let k = self.cfg.chat.top_k as usize;
		let hits =
			self.index.search(&query, k).map_err(|err| Error::Search { message: err.to_string() })?;
		let ids = hits
			.positions
			.iter()
			.filter_map(|position| self.index.record_id(*position))
			.collect::<Vec<_>>();

		if ids.is_empty() {
			return Ok(Vec::new());
		}

		let mut rows = self
			.store
			.fetch_by_ids(&ids)
			.await
			.map_err(|err| Error::Store { message: err.to_string() })?;
		let records = ids.iter().filter_map(|id| rows.remove(id)).collect::<Vec<_>>();

		tracing::debug!(
			hits = hits.positions.len(),
			records = records.len(),
			context = %prompt::render_context(&records),
			"Retrieved knowledge."
		);

		Ok(records)
	}

	async fn embed_query(&self, utterance: &str) -> Result<Vec<f32>> {
		let cfg = &self.cfg.providers.embedding;
		let vectors = self
			.providers
			.embedding
			.embed(cfg, &[utterance.to_string()])
			.await
			.map_err(Error::embedding)?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::Embedding {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if vector.len() != cfg.dimensions as usize {
			return Err(Error::Embedding {
				message: format!(
					"Embedding vector has {} dimensions, expected {}.",
					vector.len(),
					cfg.dimensions
				),
			});
		}

		Ok(vector)
	}
}

fn failure_message(err: &Error) -> String {
	match err {
		Error::Embedding { .. } => "嵌入模型调用失败，请稍后再试。".to_string(),
		Error::Search { .. } => "向量检索失败，请稍后再试。".to_string(),
		Error::Store { .. } => "知识库查询失败，请稍后再试。".to_string(),
		Error::Completion { status: Some(status), message } => format!("错误：{status} - {message}"),
		Error::Completion { status: None, message } => format!("调用失败：{message}"),
		Error::Config { message } | Error::Keywords { message } => format!("调用失败：{message}"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn failure_messages_name_the_failing_stage() {
		let embedding = ChatReply::Failed(Error::Embedding { message: "timeout".to_string() });
		let search = ChatReply::Failed(Error::Search { message: "dim".to_string() });
		let store = ChatReply::Failed(Error::Store { message: "down".to_string() });

		assert_eq!(embedding.message(), "嵌入模型调用失败，请稍后再试。");
		assert_eq!(search.message(), "向量检索失败，请稍后再试。");
		assert_eq!(store.message(), "知识库查询失败，请稍后再试。");
	}

	#[test]
	fn completion_failures_keep_status_and_cause() {
		let status = ChatReply::Failed(Error::Completion {
			status: Some(401),
			message: "Invalid API-key provided.".to_string(),
		});
		let transport = ChatReply::Failed(Error::Completion {
			status: None,
			message: "connection refused".to_string(),
		});

		assert_eq!(status.message(), "错误：401 - Invalid API-key provided.");
		assert_eq!(transport.message(), "调用失败：connection refused");
	}

	#[test]
	fn provider_status_maps_to_completion_status() {
		let err = Error::completion(ragbot_providers::Error::Status {
			status: 429,
			message: "slow down".to_string(),
		});

		assert!(matches!(
			err,
			Error::Completion { status: Some(429), ref message } if message == "slow down"
		));
	}

	#[test]
	fn empty_retrieval_reads_as_no_information() {
		assert_eq!(ChatReply::NoRelevantInformation.message(), NO_RELEVANT_INFORMATION);
		assert!(!ChatReply::NoRelevantInformation.is_answer());
	}
}
