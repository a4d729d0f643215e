mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Batch, Config, Dataset, EmbeddingProviderConfig, Extraction, Fusion, IndexBackend,
	IndexSettings, Indexing, LlmProviderConfig, Providers, Qdrant, Retrieval, Retry, Service,
	Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.dataset.csv_path.trim().is_empty() {
		return Err(Error::validation("dataset.csv_path", "must be non-empty."));
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::validation("storage.qdrant.collection", "must be non-empty."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::validation(
			"providers.embedding.dimensions",
			"must be greater than zero.",
		));
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::validation(
			"providers.embedding.dimensions",
			"must match storage.qdrant.vector_dim.",
		));
	}

	for (key, api_key) in [
		("providers.embedding.api_key", &cfg.providers.embedding.api_key),
		("providers.llm_extractor.api_key", &cfg.providers.llm_extractor.api_key),
	] {
		if api_key.trim().is_empty() {
			return Err(Error::validation(key, "must be non-empty."));
		}
	}
	for (key, timeout_ms) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.llm_extractor.timeout_ms", cfg.providers.llm_extractor.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::validation(key, "must be greater than zero."));
		}
	}

	if !cfg.providers.llm_extractor.temperature.is_finite() {
		return Err(Error::validation("providers.llm_extractor.temperature", "must be finite."));
	}
	if !(0.0..=1.0).contains(&cfg.extraction.min_confidence) {
		return Err(Error::validation(
			"extraction.min_confidence",
			"must be in the range 0.0-1.0.",
		));
	}
	if cfg.extraction.max_query_chars == 0 {
		return Err(Error::validation("extraction.max_query_chars", "must be greater than zero."));
	}
	if cfg.retrieval.top_k == 0 {
		return Err(Error::validation("retrieval.top_k", "must be greater than zero."));
	}
	if !cfg.retrieval.score_threshold.is_finite()
		|| !(0.0..=1.0).contains(&cfg.retrieval.score_threshold)
	{
		return Err(Error::validation(
			"retrieval.score_threshold",
			"must be a finite number in the range 0.0-1.0.",
		));
	}
	if cfg.retrieval.candidate_multiplier == 0 {
		return Err(Error::validation(
			"retrieval.candidate_multiplier",
			"must be greater than zero.",
		));
	}
	if !cfg.fusion.match_bonus.is_finite() || cfg.fusion.match_bonus < 1.0 {
		return Err(Error::validation(
			"fusion.match_bonus",
			"must be a finite number of at least 1.0 so filter matches outrank pure semantic hits.",
		));
	}
	if !cfg.fusion.filter_only_floor.is_finite()
		|| cfg.fusion.filter_only_floor < 0.0
		|| cfg.fusion.filter_only_floor > cfg.retrieval.score_threshold
	{
		return Err(Error::validation(
			"fusion.filter_only_floor",
			"must be between 0.0 and retrieval.score_threshold.",
		));
	}
	if cfg.retry.max_attempts == 0 {
		return Err(Error::validation("retry.max_attempts", "must be greater than zero."));
	}
	if cfg.retry.base_backoff_ms > cfg.retry.max_backoff_ms {
		return Err(Error::validation(
			"retry.base_backoff_ms",
			"must not exceed retry.max_backoff_ms.",
		));
	}
	if cfg.batch.max_concurrency == 0 {
		return Err(Error::validation("batch.max_concurrency", "must be greater than zero."));
	}
	if cfg.indexing.batch_size == 0 {
		return Err(Error::validation("indexing.batch_size", "must be greater than zero."));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	for api_base in
		[&mut cfg.providers.embedding.api_base, &mut cfg.providers.llm_extractor.api_base]
	{
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}
}
