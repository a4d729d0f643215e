use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub dataset: Dataset,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub extraction: Extraction,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub fusion: Fusion,
	#[serde(default)]
	pub retry: Retry,
	#[serde(default)]
	pub batch: Batch,
	#[serde(default)]
	pub indexing: Indexing,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dataset {
	pub csv_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub index: IndexSettings,
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
	Qdrant,
	Memory,
}
impl IndexBackend {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Qdrant => "qdrant",
			Self::Memory => "memory",
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexSettings {
	pub backend: IndexBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm_extractor: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	#[serde(default = "default_max_tokens")]
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Extraction {
	/// Extractions reporting a lower confidence are discarded as if the model had failed.
	pub min_confidence: f32,
	pub max_query_chars: u32,
}
impl Default for Extraction {
	fn default() -> Self {
		Self { min_confidence: 0.3, max_query_chars: 500 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub top_k: u32,
	pub score_threshold: f32,
	/// The semantic pass asks the index for `max(top_k * candidate_multiplier, min_candidates)`.
	pub candidate_multiplier: u32,
	pub min_candidates: u32,
}
impl Retrieval {
	pub fn candidate_k(&self, top_k: u32) -> u32 {
		top_k.saturating_mul(self.candidate_multiplier).max(self.min_candidates).max(top_k)
	}
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { top_k: 3, score_threshold: 0.2, candidate_multiplier: 3, min_candidates: 10 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Fusion {
	pub match_bonus: f32,
	pub filter_only_floor: f32,
}
impl Default for Fusion {
	fn default() -> Self {
		Self { match_bonus: 1.0, filter_only_floor: 0.0 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retry {
	pub max_attempts: u32,
	pub base_backoff_ms: u64,
	pub max_backoff_ms: u64,
}
impl Default for Retry {
	fn default() -> Self {
		Self { max_attempts: 3, base_backoff_ms: 200, max_backoff_ms: 2_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Batch {
	pub max_concurrency: u32,
}
impl Default for Batch {
	fn default() -> Self {
		Self { max_concurrency: 4 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Indexing {
	pub batch_size: u32,
}
impl Default for Indexing {
	fn default() -> Self {
		Self { batch_size: 32 }
	}
}

fn default_max_tokens() -> u32 {
	500
}
