use std::sync::Arc;

use super::{
	HashEmbedding, ScriptedExtractor, ScriptedIndex, hit, mumbai_mba_extraction, service,
	test_config,
};
use campus_domain::Attribute;
use campus_service::{CandidateSource, ResponseStatus};
use campus_testkit::FIXTURE_VECTOR_DIM;

#[tokio::test]
async fn mumbai_mba_under_ten_lakhs_ranks_the_affordable_match_first() {
	let records = campus_testkit::scenario_records();
	let (a, b, c) = (&records[0], &records[1], &records[2]);
	let index = Arc::new(ScriptedIndex::new(vec![hit(b, 0.81), hit(a, 0.78), hit(c, 0.55)]));
	let extractor = Arc::new(ScriptedExtractor::new(mumbai_mba_extraction()));
	let service = service(
		test_config(),
		records.clone(),
		index.clone(),
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		extractor.clone(),
	);
	let response =
		service.recommend("MBA colleges in Mumbai under 10 lakhs").await.expect("recommend failed");

	assert_eq!(response.status, ResponseStatus::Success);
	assert_eq!(response.filter_summary, "in Mumbai, for MBA, fees under ₹10.0L");
	assert_eq!(response.analysis.filter.len(), 3);
	assert!(response.analysis.filter.get(Attribute::Fee).is_some());
	assert_eq!(extractor.count(), 1);
	assert_eq!(index.count(), 1);

	let names: Vec<&str> = response.items.iter().map(|item| item.record.name.as_str()).collect();

	assert_eq!(names, vec![a.name.as_str(), b.name.as_str(), c.name.as_str()]);
	assert_eq!(response.items[0].source, CandidateSource::Both);
	assert!(response.items[0].filter_match);
	assert_eq!(response.items[1].source, CandidateSource::SemanticOnly);
	assert!(!response.items[1].filter_match);
	assert_eq!(response.items[2].source, CandidateSource::SemanticOnly);
	assert!(response.items.iter().all(|item| (0.0..=1.0).contains(&item.similarity)));
}

#[tokio::test]
async fn filter_only_match_surfaces_below_double_matches() {
	let records = campus_testkit::scenario_records();
	let (a, b, c) = (&records[0], &records[1], &records[2]);
	// A satisfies the filter but falls under the threshold, so it only arrives via the filter.
	let index = Arc::new(ScriptedIndex::new(vec![hit(b, 0.9), hit(c, 0.6), hit(a, 0.1)]));
	let service = service(
		test_config(),
		records.clone(),
		index,
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		Arc::new(ScriptedExtractor::new(mumbai_mba_extraction())),
	);
	let response = service.recommend("MBA colleges in Mumbai under 10 lakhs").await.expect("recommend failed");

	assert_eq!(response.items[0].record.id, a.id);
	assert_eq!(response.items[0].source, CandidateSource::FilterOnly);
	assert_eq!(response.items[0].semantic_rank, None);
	assert_eq!(response.items[0].similarity, 0.0);
	assert_eq!(response.items[1].record.id, b.id);
	assert_eq!(response.items[2].record.id, c.id);
}

#[tokio::test]
async fn identical_queries_give_identical_responses() {
	let records = campus_testkit::fixture_records();
	let hits = records.iter().rev().enumerate().map(|(idx, record)| hit(record, 0.9 - idx as f32 * 0.05)).collect();
	let service = service(
		test_config(),
		records.clone(),
		Arc::new(ScriptedIndex::new(hits)),
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		Arc::new(ScriptedExtractor::new(mumbai_mba_extraction())),
	);
	let first = service.recommend("MBA in Mumbai under 10 lakhs").await.expect("recommend failed");
	let second = service.recommend("MBA in Mumbai under 10 lakhs").await.expect("recommend failed");

	assert_eq!(first, second);
	assert_eq!(first.items.len(), 3);
}

#[tokio::test]
async fn nothing_above_threshold_and_no_filter_match_is_empty() {
	let records = campus_testkit::scenario_records();
	let index = Arc::new(ScriptedIndex::new(records.iter().map(|record| hit(record, 0.05)).collect()));
	let extraction = serde_json::json!({
		"filters": { "city": "Kolkata" },
		"cleaned_query": "colleges",
		"confidence": 0.9
	});
	let service = service(
		test_config(),
		records,
		index,
		Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM)),
		Arc::new(ScriptedExtractor::new(extraction)),
	);
	let response = service.recommend("colleges in Kolkata").await.expect("recommend failed");

	assert_eq!(response.status, ResponseStatus::Empty);
	assert!(response.items.is_empty());
	assert!(response.analysis.valid);
}
