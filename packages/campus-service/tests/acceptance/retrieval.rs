use std::sync::Arc;

use uuid::Uuid;

use super::{
	FailingExtractor, HashEmbedding, ScriptedExtractor, ScriptedIndex, StalledIndex, hit, hit_id,
	service, test_config,
};
use campus_service::{DegradedReason, Error, QueryAnalysis};
use campus_testkit::FIXTURE_VECTOR_DIM;

#[tokio::test]
async fn semantic_pass_skips_unknown_dedupes_clamps_and_thresholds() {
	let records = campus_testkit::scenario_records();
	let (a, b, c) = (&records[0], &records[1], &records[2]);
	let index = Arc::new(ScriptedIndex::new(vec![
		hit_id(Uuid::new_v4(), 0.99),
		hit(a, 0.5),
		hit(a, 0.45),
		hit(b, 1.7),
		hit(c, 0.1),
	]));
	let service = service(
		test_config(),
		records.clone(),
		index,
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		Arc::new(FailingExtractor::unavailable()),
	);
	let analysis = QueryAnalysis::degraded("business schools", DegradedReason::ProviderFailure);
	let retrieval = service.retrieve(&analysis, 3, 0.2).await.expect("retrieve failed");

	assert!(retrieval.filtered.is_empty());
	assert_eq!(retrieval.semantic.len(), 2);
	assert_eq!(retrieval.semantic[0].record.id, b.id);
	assert_eq!(retrieval.semantic[0].similarity, 1.0);
	assert_eq!(retrieval.semantic[0].semantic_rank, Some(1));
	assert_eq!(retrieval.semantic[1].record.id, a.id);
	assert_eq!(retrieval.semantic[1].similarity, 0.5);
	assert_eq!(retrieval.semantic[1].semantic_rank, Some(2));
}

#[tokio::test]
async fn filtered_pass_runs_even_when_semantic_pass_finds_nothing() {
	let records = campus_testkit::fixture_records();
	let extraction = serde_json::json!({
		"filters": { "course": "engineering", "college_type": "govt" },
		"cleaned_query": "",
		"confidence": 0.8
	});
	let service = service(
		test_config(),
		records.clone(),
		Arc::new(ScriptedIndex::new(Vec::new())),
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		Arc::new(ScriptedExtractor::new(extraction)),
	);
	let analysis = service.analyze("government engineering colleges").await;

	assert_eq!(analysis.semantic_text(), "Engineering colleges");

	let retrieval = service.retrieve(&analysis, 3, 0.2).await.expect("retrieve failed");
	let fort = campus_testkit::record_named(&records, "Fort Engineering College").expect("fixture");

	assert_eq!(retrieval.filtered, vec![fort.id]);
	assert!(retrieval.semantic.is_empty());
}

#[tokio::test]
async fn stalled_index_is_a_typed_failure_after_bounded_retries() {
	let index = Arc::new(StalledIndex::new());
	let service = service(
		test_config(),
		campus_testkit::scenario_records(),
		index.clone(),
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		Arc::new(FailingExtractor::unavailable()),
	);
	let err = service.recommend("MBA colleges").await.expect_err("expected index failure");

	assert!(matches!(err, Error::IndexUnavailable { attempts: 3, .. }));
	assert_eq!(index.count(), 3);
}

#[tokio::test]
async fn rejects_invalid_retrieval_arguments() {
	let service = service(
		test_config(),
		campus_testkit::scenario_records(),
		Arc::new(ScriptedIndex::new(Vec::new())),
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		Arc::new(FailingExtractor::unavailable()),
	);
	let analysis = QueryAnalysis::degraded("mba", DegradedReason::ProviderFailure);

	assert!(matches!(service.retrieve(&analysis, 0, 0.2).await, Err(Error::InvalidRequest { .. })));
	assert!(matches!(service.retrieve(&analysis, 3, 1.5).await, Err(Error::InvalidRequest { .. })));
	assert!(matches!(
		service.retrieve(&analysis, 3, f32::NAN).await,
		Err(Error::InvalidRequest { .. })
	));
}
