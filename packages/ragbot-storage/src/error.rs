use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Failed to access index file at {path:?}.")]
	Io { path: PathBuf, source: std::io::Error },
	#[error("Index file {path:?} does not exist. Run ragbot-ingest first.")]
	MissingIndex { path: PathBuf },
	#[error("Index data is corrupt: {message}")]
	CorruptIndex { message: String },
	#[error("Vector dimension mismatch: expected {expected}, got {actual}.")]
	DimensionMismatch { expected: usize, actual: usize },
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}
