use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Validation(String),
	#[error("Failed to read knowledge file {path:?}.")]
	ReadSource { path: PathBuf, source: std::io::Error },
	#[error(transparent)]
	Storage(#[from] ragbot_storage::Error),
	#[error(transparent)]
	Provider(#[from] ragbot_providers::Error),
}
