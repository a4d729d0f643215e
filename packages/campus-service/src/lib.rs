pub mod analyze;
pub mod fuse;
pub mod recommend;
pub mod retrieve;

mod error;
mod retry;

pub use analyze::{DegradedReason, DroppedField, QueryAnalysis};
pub use error::{Error, Result};
pub use fuse::{FusionPolicy, fuse};
pub use recommend::{RecommendationResponse, ResponseStatus};
pub use retrieve::{CandidateSource, Retrieval, ScoredCandidate};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use campus_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use campus_providers::{embedding, extractor};
use campus_storage::{IndexHit, memory::MemoryIndex, qdrant::QdrantIndex, records::RecordStore};
use retry::RetryPolicy;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, campus_providers::Result<Vec<Vec<f32>>>>;
}

/// The LLM capability. The target schema travels inside `messages`; implementations return the
/// JSON object the model produced.
pub trait ExtractorProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, campus_providers::Result<Value>>;
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn nearest<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, campus_storage::Result<Vec<IndexHit>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub extractor: Arc<dyn ExtractorProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, extractor: Arc<dyn ExtractorProvider>) -> Self {
		Self { embedding, extractor }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), extractor: provider }
	}
}

/// Request-scoped pipeline over shared, read-only context. Cheap to share behind an `Arc`;
/// no method takes `&mut self`.
pub struct CampusService {
	pub cfg: Config,
	pub records: Arc<RecordStore>,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
}
impl CampusService {
	pub fn new(
		cfg: Config,
		records: Arc<RecordStore>,
		index: Arc<dyn VectorIndex>,
		providers: Providers,
	) -> Self {
		Self { cfg, records, index, providers }
	}

	pub(crate) fn extractor_retry(&self) -> RetryPolicy {
		RetryPolicy::new(&self.cfg.retry, self.cfg.providers.llm_extractor.timeout_ms)
	}

	pub(crate) fn embedding_retry(&self) -> RetryPolicy {
		RetryPolicy::new(&self.cfg.retry, self.cfg.providers.embedding.timeout_ms)
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, campus_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl ExtractorProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, campus_providers::Result<Value>> {
		Box::pin(extractor::extract(cfg, messages))
	}
}

impl VectorIndex for QdrantIndex {
	fn nearest<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, campus_storage::Result<Vec<IndexHit>>> {
		Box::pin(QdrantIndex::nearest(self, vector, limit))
	}
}
impl VectorIndex for MemoryIndex {
	fn nearest<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, campus_storage::Result<Vec<IndexHit>>> {
		Box::pin(async move { MemoryIndex::nearest(self, vector, limit) })
	}
}

/// Embeds a batch of document texts under the shared retry policy and checks that one vector
/// came back per text.
pub async fn embed_documents(
	cfg: &Config,
	embedder: &dyn EmbeddingProvider,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let policy = RetryPolicy::new(&cfg.retry, cfg.providers.embedding.timeout_ms);
	let vectors = retry::with_retry(&policy, "embed_documents", || {
		embedder.embed(&cfg.providers.embedding, texts)
	})
	.await
	.map_err(|err| Error::EmbeddingUnavailable {
		attempts: err.attempts,
		message: err.last.to_string(),
	})?;

	if vectors.len() != texts.len() {
		return Err(Error::EmbeddingUnavailable {
			attempts: 1,
			message: format!("Got {} vectors for {} texts.", vectors.len(), texts.len()),
		});
	}

	Ok(vectors)
}

/// Embeds every record's document text in `indexing.batch_size` batches and holds the vectors
/// in memory. Used when `storage.index.backend = "memory"`.
pub async fn build_memory_index(
	cfg: &Config,
	records: &RecordStore,
	embedder: &dyn EmbeddingProvider,
) -> Result<MemoryIndex> {
	let batch_size = (cfg.indexing.batch_size as usize).max(1);
	let mut index = MemoryIndex::new(cfg.providers.embedding.dimensions);

	for batch in records.records().chunks(batch_size) {
		let texts: Vec<String> = batch.iter().map(|record| record.document_text()).collect();
		let vectors = embed_documents(cfg, embedder, &texts).await?;

		for (record, vector) in batch.iter().zip(vectors) {
			index.insert(record.id, vector)?;
		}
	}

	tracing::info!(records = index.len(), "Built in-memory vector index.");

	Ok(index)
}
