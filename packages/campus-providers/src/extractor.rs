use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Sends one chat-completion request asking for a JSON object and returns the parsed object.
/// Retries are the caller's concern.
pub async fn extract(cfg: &campus_config::LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"max_tokens": cfg.max_tokens,
		"response_format": { "type": "json_object" },
		"messages": messages,
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await
		.map_err(crate::classify_send_error)?;
	let json = crate::read_json(res).await?;

	parse_extractor_json(json)
}

fn parse_extractor_json(json: Value) -> Result<Value> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		let parsed: Value = serde_json::from_str(strip_code_fence(content))
			.map_err(|_| Error::invalid_response("Extractor content is not valid JSON."))?;

		if !parsed.is_object() {
			return Err(Error::invalid_response("Extractor content is not a JSON object."));
		}

		return Ok(parsed);
	}

	Err(Error::invalid_response("Extractor response is missing message content."))
}

fn strip_code_fence(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(inner) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let inner = inner.strip_prefix("json").unwrap_or(inner);

	inner.strip_suffix("```").unwrap_or(inner).trim()
}
