use std::sync::Arc;

use super::{FailingExtractor, HashEmbedding, ScriptedIndex, hit, service, test_config};
use campus_service::{Error, ResponseStatus};
use campus_testkit::FIXTURE_VECTOR_DIM;

#[tokio::test]
async fn one_unreachable_embedding_does_not_sink_the_batch() {
	let records = campus_testkit::scenario_records();
	let hits = records.iter().map(|record| hit(record, 0.6)).collect();
	let embedding = Arc::new(HashEmbedding::failing_on(FIXTURE_VECTOR_DIM, "unreachable"));
	let service = service(
		test_config(),
		records,
		Arc::new(ScriptedIndex::new(hits)),
		embedding.clone(),
		Arc::new(FailingExtractor::unavailable()),
	);
	let queries = vec![
		"MBA colleges in Mumbai".to_string(),
		"unreachable index query".to_string(),
		"affordable management colleges".to_string(),
	];
	let results = service.recommend_many(&queries).await;

	assert_eq!(results.len(), 3);

	for (idx, query) in [(0, &queries[0]), (2, &queries[2])] {
		let response = results[idx].as_ref().expect("sibling query should succeed");

		assert_eq!(&response.query, query);
		assert_eq!(response.status, ResponseStatus::Degraded);
		assert_eq!(response.items.len(), 3);
	}

	assert!(matches!(results[1], Err(Error::EmbeddingUnavailable { attempts: 3, .. })));
	assert_eq!(embedding.count(), 5);
}

#[tokio::test]
async fn results_stay_index_aligned_with_concurrency_of_one() {
	let mut cfg = test_config();

	cfg.batch.max_concurrency = 1;

	let records = campus_testkit::scenario_records();
	let hits = records.iter().map(|record| hit(record, 0.5)).collect();
	let service = service(
		cfg,
		records,
		Arc::new(ScriptedIndex::new(hits)),
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		Arc::new(FailingExtractor::unavailable()),
	);
	let queries: Vec<String> = (0..6).map(|n| format!("query number {n}")).collect();
	let results = service.recommend_many(&queries).await;

	for (query, result) in queries.iter().zip(&results) {
		assert_eq!(&result.as_ref().expect("recommend failed").query, query);
	}
	assert!(service.recommend_many(&[]).await.is_empty());
}
