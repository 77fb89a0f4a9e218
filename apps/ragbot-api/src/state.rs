use std::{
	collections::HashMap,
	sync::{Arc, Mutex as StdMutex},
};

use tokio::sync::Mutex;

use ragbot_domain::conversation::Conversation;
use ragbot_service::ChatService;

pub type SharedConversation = Arc<Mutex<Conversation>>;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<ChatService>,
	pub sessions: Arc<SessionRegistry>,
}
impl AppState {
	pub async fn new(config: ragbot_config::Config) -> color_eyre::Result<Self> {
		let service = ragbot_service::open(config).await?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: ChatService) -> Self {
		let max_sessions = service.cfg.service.max_sessions as usize;

		Self {
			service: Arc::new(service),
			sessions: Arc::new(SessionRegistry::new(max_sessions)),
		}
	}
}

struct SessionEntry {
	last_used: u64,
	conversation: SharedConversation,
}

/// Conversations keyed by session id, evicting the least recently used beyond `max_sessions`.
pub struct SessionRegistry {
	max_sessions: usize,
	inner: StdMutex<Sessions>,
}

#[derive(Default)]
struct Sessions {
	clock: u64,
	entries: HashMap<String, SessionEntry>,
}

impl SessionRegistry {
	pub fn new(max_sessions: usize) -> Self {
		Self { max_sessions: max_sessions.max(1), inner: StdMutex::new(Sessions::default()) }
	}

	pub fn get_or_create(
		&self,
		session_id: &str,
		create: impl FnOnce() -> Conversation,
	) -> SharedConversation {
		let mut sessions = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		sessions.clock += 1;

		let now = sessions.clock;

		if let Some(entry) = sessions.entries.get_mut(session_id) {
			entry.last_used = now;

			return entry.conversation.clone();
		}

		if sessions.entries.len() >= self.max_sessions
			&& let Some(oldest) = sessions
				.entries
				.iter()
				.min_by_key(|(_, entry)| entry.last_used)
				.map(|(id, _)| id.clone())
		{
			sessions.entries.remove(&oldest);

			tracing::debug!(session_id = %oldest, "Evicted idle session.");
		}

		let conversation = Arc::new(Mutex::new(create()));

		sessions.entries.insert(session_id.to_string(), SessionEntry {
			last_used: now,
			conversation: conversation.clone(),
		});

		conversation
	}

	pub fn len(&self) -> usize {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn contains(&self, session_id: &str) -> bool {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).entries.contains_key(session_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn same_id_shares_one_conversation() {
		let registry = SessionRegistry::new(4);
		let first = registry.get_or_create("a", || Conversation::new(10));
		let second = registry.get_or_create("a", || Conversation::new(10));

		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn least_recently_used_session_is_evicted() {
		let registry = SessionRegistry::new(2);

		registry.get_or_create("a", || Conversation::new(10));
		registry.get_or_create("b", || Conversation::new(10));
		// Touch "a" so "b" becomes the eviction candidate.
		registry.get_or_create("a", || Conversation::new(10));
		registry.get_or_create("c", || Conversation::new(10));

		assert_eq!(registry.len(), 2);
		assert!(registry.contains("a"));
		assert!(!registry.contains("b"));
		assert!(registry.contains("c"));
	}
}
