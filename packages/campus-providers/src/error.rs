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
	#[error("Provider timed out: {message}")]
	Timeout { message: String },
	#[error("Provider returned HTTP {status}: {message}")]
	Status { status: u16, message: String },
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl Error {
	/// Whether repeating the same request may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Timeout { .. } => true,
			Self::Status { status, .. } => *status == 429 || *status >= 500,
			Self::Reqwest(err) =>
				err.is_timeout()
					|| err.is_connect()
					|| err.is_request()
					|| err
						.status()
						.map(|status| status.as_u16() == 429 || status.is_server_error())
						.unwrap_or(false),
			_ => false,
		}
	}

	pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
		Self::InvalidResponse { message: message.into() }
	}
}
