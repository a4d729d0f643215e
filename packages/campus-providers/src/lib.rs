pub mod embedding;
pub mod error;
pub mod extractor;

pub use error::{Error, Result};

use reqwest::{
	Response,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

fn classify_send_error(err: reqwest::Error) -> Error {
	if err.is_timeout() {
		return Error::Timeout { message: err.to_string() };
	}

	Error::Reqwest(err)
}

async fn read_json(res: Response) -> Result<Value> {
	let status = res.status();

	if !status.is_success() {
		let body = res.text().await.unwrap_or_default();
		let message: String = body.chars().take(256).collect();

		return Err(Error::Status { status: status.as_u16(), message });
	}

	Ok(res.json().await?)
}
