use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use super::{FailingExtractor, HashEmbedding, service, test_config};
use campus_config::EmbeddingProviderConfig;
use campus_service::{
	BoxFuture, EmbeddingProvider, ResponseStatus, build_memory_index, embed_documents,
};
use campus_storage::records::RecordStore;
use campus_testkit::{FIXTURE_VECTOR_DIM, HashEmbedder};

/// Answers 503 for the first `failures` calls, then embeds normally.
struct FlakyEmbedding {
	embedder: HashEmbedder,
	failures: usize,
	calls: AtomicUsize,
}
impl EmbeddingProvider for FlakyEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, campus_providers::Result<Vec<Vec<f32>>>> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);
		let vectors = self.embedder.embed_all(texts);
		let fails = call < self.failures;

		Box::pin(async move {
			if fails {
				return Err(campus_providers::Error::Status {
					status: 503,
					message: "upstream overloaded".to_string(),
				});
			}

			Ok(vectors)
		})
	}
}

#[tokio::test]
async fn memory_backend_finds_the_record_whose_text_matches_the_query() {
	let cfg = test_config();
	let records = campus_testkit::fixture_records();
	let store = RecordStore::from_records(records.clone());
	let embedding = Arc::new(HashEmbedding::new(FIXTURE_VECTOR_DIM));
	let index = build_memory_index(&cfg, &store, embedding.as_ref()).await.expect("index build failed");

	assert_eq!(index.len(), records.len());
	// Batches of two over seven records.
	assert_eq!(embedding.count(), 4);

	let target = campus_testkit::record_named(&records, "Eastern Medical College").expect("fixture");
	let service = service(
		cfg,
		records.clone(),
		Arc::new(index),
		embedding,
		Arc::new(FailingExtractor::unavailable()),
	);
	let response = service.recommend(&target.document_text()).await.expect("recommend failed");

	assert_eq!(response.status, ResponseStatus::Degraded);
	assert_eq!(response.items[0].record.id, target.id);
	assert!((response.items[0].similarity - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn memory_index_build_surfaces_embedding_outage() {
	let cfg = test_config();
	let store = RecordStore::from_records(campus_testkit::fixture_records());
	let embedding = HashEmbedding::failing_on(FIXTURE_VECTOR_DIM, "Medical");
	let err = build_memory_index(&cfg, &store, &embedding).await.expect_err("expected failure");

	assert!(matches!(err, campus_service::Error::EmbeddingUnavailable { attempts: 3, .. }));
}

#[tokio::test]
async fn document_embedding_retries_a_transient_outage() {
	let cfg = test_config();
	let embedding = FlakyEmbedding {
		embedder: HashEmbedder::new(FIXTURE_VECTOR_DIM),
		failures: 2,
		calls: AtomicUsize::new(0),
	};
	let texts = vec!["MBA college in Mumbai".to_string(), "Medical college in Kolkata".to_string()];
	let vectors = embed_documents(&cfg, &embedding, &texts).await.expect("embedding failed");

	assert_eq!(vectors.len(), 2);
	assert_eq!(vectors[0].len(), FIXTURE_VECTOR_DIM as usize);
	assert_eq!(embedding.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn document_embedding_gives_up_after_the_attempt_budget() {
	let cfg = test_config();
	let embedding = FlakyEmbedding {
		embedder: HashEmbedder::new(FIXTURE_VECTOR_DIM),
		failures: usize::MAX,
		calls: AtomicUsize::new(0),
	};
	let texts = vec!["MBA college in Mumbai".to_string()];
	let err = embed_documents(&cfg, &embedding, &texts).await.expect_err("expected failure");

	assert!(matches!(err, campus_service::Error::EmbeddingUnavailable { attempts: 3, .. }));
	assert_eq!(embedding.calls.load(Ordering::SeqCst), 3);
}
