pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("Provider responded with status {status}: {message}")]
	Status { status: u16, message: String },
	#[error("Provider call failed after {attempts} attempts: {source}")]
	RetriesExhausted { attempts: u32, source: Box<Error> },
}
impl Error {
	/// Transport failures, rate limiting and server errors are worth another attempt.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Reqwest(err) => err.is_timeout() || err.is_connect() || err.is_request(),
			Self::Status { status, .. } => *status == 429 || *status >= 500,
			_ => false,
		}
	}

	/// HTTP status of the failed call, looking through retry wrappers.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			Self::RetriesExhausted { source, .. } => source.status(),
			Self::Reqwest(err) => err.status().map(|status| status.as_u16()),
			_ => None,
		}
	}
}
