#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Csv(#[from] csv::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
}
impl Error {
	/// Index backends can recover; bad input cannot.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Qdrant(_))
	}
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
