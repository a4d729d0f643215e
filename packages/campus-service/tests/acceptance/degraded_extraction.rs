use std::sync::Arc;

use super::{
	FailingExtractor, HashEmbedding, ScriptedExtractor, ScriptedIndex, hit, service, test_config,
};
use campus_service::{DegradedReason, ResponseStatus};
use campus_testkit::FIXTURE_VECTOR_DIM;

#[tokio::test]
async fn unavailable_extractor_is_retried_then_degrades_to_semantic_search() {
	let records = campus_testkit::scenario_records();
	let extractor = Arc::new(FailingExtractor::unavailable());
	let service = service(
		test_config(),
		records.clone(),
		Arc::new(ScriptedIndex::new(vec![hit(&records[1], 0.7), hit(&records[0], 0.6)])),
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		extractor.clone(),
	);
	let query = "MBA colleges in Mumbai under 10 lakhs";
	let analysis = service.analyze(query).await;

	assert_eq!(extractor.count(), 3);
	assert!(!analysis.valid);
	assert!(analysis.filter.is_empty());
	assert_eq!(analysis.residual_query, query);
	assert_eq!(analysis.degraded_reason, Some(DegradedReason::ProviderFailure));

	let response = service.recommend(query).await.expect("recommend failed");

	assert_eq!(response.status, ResponseStatus::Degraded);
	assert_eq!(response.filter_summary, "no specific filters");
	assert_eq!(response.items.len(), 2);
	assert_eq!(response.items[0].record.id, records[1].id);
	assert!(response.items.iter().all(|item| item.match_bonus == 0.0));
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
	let extractor = Arc::new(FailingExtractor::new(|| campus_providers::Error::Status {
		status: 401,
		message: "bad key".to_string(),
	}));
	let service = service(
		test_config(),
		campus_testkit::scenario_records(),
		Arc::new(ScriptedIndex::new(Vec::new())),
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		extractor.clone(),
	);
	let analysis = service.analyze("engineering colleges").await;

	assert_eq!(extractor.count(), 1);
	assert_eq!(analysis.degraded_reason, Some(DegradedReason::ProviderFailure));
}

#[tokio::test]
async fn malformed_and_low_confidence_output_degrade() {
	let malformed = Arc::new(FailingExtractor::new(|| campus_providers::Error::InvalidResponse {
		message: "Extractor content is not valid JSON.".to_string(),
	}));
	let service_malformed = service(
		test_config(),
		campus_testkit::scenario_records(),
		Arc::new(ScriptedIndex::new(Vec::new())),
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		malformed.clone(),
	);

	assert_eq!(
		service_malformed.analyze("cheap mba").await.degraded_reason,
		Some(DegradedReason::MalformedOutput)
	);
	assert_eq!(malformed.count(), 1);

	let unsure = serde_json::json!({ "filters": { "city": "Pune" }, "confidence": 0.1 });
	let service_unsure = service(
		test_config(),
		campus_testkit::scenario_records(),
		Arc::new(ScriptedIndex::new(Vec::new())),
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		Arc::new(ScriptedExtractor::new(unsure)),
	);
	let analysis = service_unsure.analyze("maybe pune").await;

	assert_eq!(analysis.degraded_reason, Some(DegradedReason::LowConfidence));
	assert!(analysis.filter.is_empty());
}

#[tokio::test]
async fn blank_query_skips_every_backend() {
	let extractor = Arc::new(ScriptedExtractor::new(serde_json::json!({})));
	let embedding = Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM));
	let index = Arc::new(ScriptedIndex::new(Vec::new()));
	let service = service(
		test_config(),
		campus_testkit::scenario_records(),
		index.clone(),
		embedding.clone(),
		extractor.clone(),
	);
	let response = service.recommend("   ").await.expect("recommend failed");

	assert_eq!(response.status, ResponseStatus::Empty);
	assert_eq!(response.analysis.degraded_reason, Some(DegradedReason::EmptyQuery));
	assert_eq!(extractor.count(), 0);
	assert_eq!(embedding.count(), 0);
	assert_eq!(index.count(), 0);
}

#[tokio::test]
async fn long_queries_are_truncated_before_extraction() {
	let mut cfg = test_config();

	cfg.extraction.max_query_chars = 12;

	let extractor = Arc::new(ScriptedExtractor::new(serde_json::json!({
		"filters": {},
		"cleaned_query": "",
		"confidence": 0.9
	})));
	let service = service(
		cfg,
		campus_testkit::scenario_records(),
		Arc::new(ScriptedIndex::new(Vec::new())),
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		extractor.clone(),
	);
	let query = "₹5L ₹6L engineering colleges with strong placements";
	let analysis = service.analyze(query).await;
	let sent = extractor.last_query().expect("extractor saw no query");

	assert_eq!(sent.chars().count(), 12);
	assert!(query.starts_with(&sent));
	assert_eq!(analysis.original_query, query);
	assert_eq!(analysis.semantic_text(), query);
}
