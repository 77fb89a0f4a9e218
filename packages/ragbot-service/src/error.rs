pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Embedding error: {message}")]
	Embedding { message: String },
	#[error("Search error: {message}")]
	Search { message: String },
	#[error("Store error: {message}")]
	Store { message: String },
	#[error("Completion error: {message}")]
	Completion { status: Option<u16>, message: String },
	#[error("Configuration error: {message}")]
	Config { message: String },
	#[error("Exit keyword error: {message}")]
	Keywords { message: String },
}
impl Error {
	pub(crate) fn embedding(err: ragbot_providers::Error) -> Self {
		Self::Embedding { message: err.to_string() }
	}

	pub(crate) fn completion(err: ragbot_providers::Error) -> Self {
		match err {
			ragbot_providers::Error::Status { status, message } =>
				Self::Completion { status: Some(status), message },
			other => Self::Completion { status: other.status(), message: other.to_string() },
		}
	}
}

impl From<ragbot_domain::Error> for Error {
	fn from(err: ragbot_domain::Error) -> Self {
		Self::Keywords { message: err.to_string() }
	}
}
