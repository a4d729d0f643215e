mod acceptance {
	mod batch;
	mod degraded_extraction;
	mod memory_index;
	mod retrieval;
	mod scenario;

	use std::{
		sync::{
			Arc, Mutex,
			atomic::{AtomicUsize, Ordering},
		},
		time::Duration,
	};

	use serde_json::Value;

	use campus_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
	use campus_domain::{CollegeRecord, RecordId};
	use campus_service::{
		BoxFuture, CampusService, EmbeddingProvider, ExtractorProvider, Providers, VectorIndex,
	};
	use campus_storage::{IndexHit, records::RecordStore};
	use campus_testkit::HashEmbedder;

	/// Returns the same model output for every query and records what it was asked.
	pub(super) struct ScriptedExtractor {
		output: Value,
		calls: AtomicUsize,
		last_query: Mutex<Option<String>>,
	}
	impl ScriptedExtractor {
		pub(super) fn new(output: Value) -> Self {
			Self { output, calls: AtomicUsize::new(0), last_query: Mutex::new(None) }
		}

		pub(super) fn count(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		pub(super) fn last_query(&self) -> Option<String> {
			self.last_query.lock().unwrap_or_else(|err| err.into_inner()).clone()
		}
	}
	impl ExtractorProvider for ScriptedExtractor {
		fn extract<'a>(
			&'a self,
			_cfg: &'a LlmProviderConfig,
			messages: &'a [Value],
		) -> BoxFuture<'a, campus_providers::Result<Value>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let query = messages.last().and_then(|message| message["content"].as_str()).map(str::to_string);

			*self.last_query.lock().unwrap_or_else(|err| err.into_inner()) = query;

			let output = self.output.clone();

			Box::pin(async move { Ok(output) })
		}
	}

	/// Fails every call with the error produced by `make_error`.
	pub(super) struct FailingExtractor {
		calls: AtomicUsize,
		make_error: fn() -> campus_providers::Error,
	}
	impl FailingExtractor {
		pub(super) fn new(make_error: fn() -> campus_providers::Error) -> Self {
			Self { calls: AtomicUsize::new(0), make_error }
		}

		pub(super) fn unavailable() -> Self {
			Self::new(|| campus_providers::Error::Status {
				status: 503,
				message: "upstream overloaded".to_string(),
			})
		}

		pub(super) fn count(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl ExtractorProvider for FailingExtractor {
		fn extract<'a>(
			&'a self,
			_cfg: &'a LlmProviderConfig,
			_messages: &'a [Value],
		) -> BoxFuture<'a, campus_providers::Result<Value>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let err = (self.make_error)();

			Box::pin(async move { Err(err) })
		}
	}

	/// Bag-of-words embeddings; texts containing `fail_marker` time out instead.
	pub(super) struct HashEmbedding {
		embedder: HashEmbedder,
		fail_marker: Option<&'static str>,
		calls: AtomicUsize,
	}
	impl HashEmbedding {
		pub(super) fn new(dim: u32) -> Self {
			Self { embedder: HashEmbedder::new(dim), fail_marker: None, calls: AtomicUsize::new(0) }
		}

		pub(super) fn failing_on(dim: u32, marker: &'static str) -> Self {
			Self { fail_marker: Some(marker), ..Self::new(dim) }
		}

		pub(super) fn count(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl EmbeddingProvider for HashEmbedding {
		fn embed<'a>(
			&'a self,
			_cfg: &'a EmbeddingProviderConfig,
			texts: &'a [String],
		) -> BoxFuture<'a, campus_providers::Result<Vec<Vec<f32>>>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let fails = self
				.fail_marker
				.map(|marker| texts.iter().any(|text| text.contains(marker)))
				.unwrap_or(false);
			let vectors = self.embedder.embed_all(texts);

			Box::pin(async move {
				if fails {
					return Err(campus_providers::Error::Timeout {
						message: "embedding endpoint unreachable".to_string(),
					});
				}

				Ok(vectors)
			})
		}
	}

	/// Answers every query with a fixed list of hits.
	pub(super) struct ScriptedIndex {
		hits: Vec<IndexHit>,
		calls: AtomicUsize,
	}
	impl ScriptedIndex {
		pub(super) fn new(hits: Vec<IndexHit>) -> Self {
			Self { hits, calls: AtomicUsize::new(0) }
		}

		pub(super) fn count(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl VectorIndex for ScriptedIndex {
		fn nearest<'a>(
			&'a self,
			_vector: &'a [f32],
			limit: u32,
		) -> BoxFuture<'a, campus_storage::Result<Vec<IndexHit>>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let hits = self.hits.iter().take(limit as usize).copied().collect();

			Box::pin(async move { Ok(hits) })
		}
	}

	/// Never answers within any sane timeout.
	pub(super) struct StalledIndex {
		calls: AtomicUsize,
	}
	impl StalledIndex {
		pub(super) fn new() -> Self {
			Self { calls: AtomicUsize::new(0) }
		}

		pub(super) fn count(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl VectorIndex for StalledIndex {
		fn nearest<'a>(
			&'a self,
			_vector: &'a [f32],
			_limit: u32,
		) -> BoxFuture<'a, campus_storage::Result<Vec<IndexHit>>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Box::pin(async move {
				tokio::time::sleep(Duration::from_secs(30)).await;

				Ok(Vec::new())
			})
		}
	}

	pub(super) fn test_config() -> Config {
		let mut cfg = campus_testkit::sample_config();

		cfg.providers.embedding.timeout_ms = 50;
		cfg.providers.llm_extractor.timeout_ms = 50;

		cfg
	}

	pub(super) fn hit(record: &CollegeRecord, similarity: f32) -> IndexHit {
		IndexHit { record_id: record.id, similarity }
	}

	pub(super) fn hit_id(record_id: RecordId, similarity: f32) -> IndexHit {
		IndexHit { record_id, similarity }
	}

	pub(super) fn service(
		cfg: Config,
		records: Vec<CollegeRecord>,
		index: Arc<dyn VectorIndex>,
		embedding: Arc<dyn EmbeddingProvider>,
		extractor: Arc<dyn ExtractorProvider>,
	) -> CampusService {
		CampusService::new(
			cfg,
			Arc::new(RecordStore::from_records(records)),
			index,
			Providers::new(embedding, extractor),
		)
	}

	pub(super) fn mumbai_mba_extraction() -> Value {
		serde_json::json!({
			"filters": {
				"city": "Mumbai",
				"course": "MBA",
				"fees": { "operator": "lt", "value": 1000000 }
			},
			"cleaned_query": "good MBA colleges",
			"intent": "find_colleges",
			"confidence": 0.92
		})
	}
}
