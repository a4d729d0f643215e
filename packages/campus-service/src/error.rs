pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures a caller must handle. Extraction problems never show up here; they degrade the
/// analysis instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Embedding provider unavailable after {attempts} attempt(s): {message}")]
	EmbeddingUnavailable { attempts: u32, message: String },
	#[error("Vector index unavailable after {attempts} attempt(s): {message}")]
	IndexUnavailable { attempts: u32, message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<campus_storage::Error> for Error {
	fn from(err: campus_storage::Error) -> Self {
		match err {
			campus_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			campus_storage::Error::Qdrant(inner) =>
				Self::IndexUnavailable { attempts: 1, message: inner.to_string() },
			other => Self::Storage { message: other.to_string() },
		}
	}
}
