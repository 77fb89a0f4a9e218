pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read {path:?}.")]
	Read { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to write {path:?}.")]
	Write { path: std::path::PathBuf, source: std::io::Error },
	#[error(transparent)]
	Pattern(#[from] regex::Error),
}
