use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde_json::{Map, Value};

use campus_providers::Error;

#[test]
fn builds_bearer_auth_header() {
	let headers =
		campus_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn merges_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-team".to_string(), Value::String("admissions".to_string()));

	let headers = campus_providers::auth_headers("secret", &defaults).expect("Failed to build headers.");

	assert_eq!(headers.get("x-team"), Some(&HeaderValue::from_static("admissions")));
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	let err = campus_providers::auth_headers("secret", &defaults).expect_err("expected failure");

	assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn classifies_transient_failures() {
	assert!(Error::Timeout { message: "slow".to_string() }.is_transient());
	assert!(Error::Status { status: 429, message: String::new() }.is_transient());
	assert!(Error::Status { status: 503, message: String::new() }.is_transient());
	assert!(!Error::Status { status: 401, message: String::new() }.is_transient());
	assert!(!Error::InvalidResponse { message: "bad".to_string() }.is_transient());
}

#[tokio::test]
async fn unreachable_endpoint_is_transient() {
	let cfg = campus_config::EmbeddingProviderConfig {
		provider_id: "local".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: "key".to_string(),
		path: "/embeddings".to_string(),
		model: "m".to_string(),
		dimensions: 3,
		timeout_ms: 500,
		default_headers: Map::new(),
	};
	let err = campus_providers::embedding::embed(&cfg, &["hello".to_string()])
		.await
		.expect_err("expected connection failure");

	assert!(err.is_transient());
}
