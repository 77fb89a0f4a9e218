use std::any::Any;

use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::state::AppState;

pub const WELCOME_MESSAGE: &str = "欢迎使用聊天机器人API。请使用 /chat 路由发送POST请求。";
pub const EMPTY_MESSAGE_REPLY: &str = "请输入您的问题。";
pub const DEFAULT_SESSION_ID: &str = "default";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/", get(index))
		.route("/health", get(health))
		.route("/chat", post(chat))
		.with_state(state)
		.layer(CatchPanicLayer::custom(handle_panic))
		.layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
	#[serde(default)]
	pub message: String,
	/// Conversation to continue. Requests without one share the default conversation.
	#[serde(default)]
	pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
	pub response: String,
}
impl ChatResponse {
	fn new(response: impl Into<String>) -> Self {
		Self { response: response.into() }
	}
}

#[derive(Debug, Serialize)]
struct WelcomeBody {
	message: &'static str,
}

async fn index() -> Json<WelcomeBody> {
	Json(WelcomeBody { message: WELCOME_MESSAGE })
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn chat(
	State(state): State<AppState>,
	payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
	let Json(payload) = match payload {
		Ok(payload) => payload,
		Err(rejection) => {
			tracing::warn!(error = %rejection, "Rejected chat request.");

			return (StatusCode::BAD_REQUEST, Json(ChatResponse::new("invalid request")))
				.into_response();
		},
	};
	let message = payload.message.trim();

	if message.is_empty() {
		return Json(ChatResponse::new(EMPTY_MESSAGE_REPLY)).into_response();
	}

	let session_id = payload
		.session_id
		.as_deref()
		.map(str::trim)
		.filter(|id| !id.is_empty())
		.unwrap_or(DEFAULT_SESSION_ID);
	let conversation =
		state.sessions.get_or_create(session_id, || state.service.new_conversation());
	let mut conversation = conversation.lock().await;
	let reply = state.service.query(&mut conversation, message).await;

	tracing::info!(session_id, answered = reply.is_answer(), "Handled chat request.");

	Json(ChatResponse::new(reply.message())).into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
	let detail = err
		.downcast_ref::<String>()
		.map(String::as_str)
		.or_else(|| err.downcast_ref::<&str>().copied())
		.unwrap_or("unknown panic");

	tracing::error!(panic = detail, "Chat handler panicked.");

	(StatusCode::INTERNAL_SERVER_ERROR, Json(ChatResponse::new("internal error"))).into_response()
}
