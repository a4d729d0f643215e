use std::time::Instant;

use futures::{StreamExt, stream};
use serde::Serialize;

use crate::{CampusService, FusionPolicy, QueryAnalysis, Result, ScoredCandidate, fuse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
	Success,
	Degraded,
	Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResponse {
	pub query: String,
	pub analysis: QueryAnalysis,
	pub filter_summary: String,
	pub status: ResponseStatus,
	pub items: Vec<ScoredCandidate>,
	pub elapsed_ms: u64,
}

impl CampusService {
	/// Analyze, retrieve, fuse. An empty result is a response, not an error; only an
	/// unreachable embedding provider or index fails the request.
	pub async fn recommend(&self, query: &str) -> Result<RecommendationResponse> {
		let started = Instant::now();
		let analysis = self.analyze(query).await;
		let top_k = self.cfg.retrieval.top_k;
		let items = if query.trim().is_empty() {
			Vec::new()
		} else {
			let retrieval = self.retrieve(&analysis, top_k, self.cfg.retrieval.score_threshold).await?;

			fuse(
				&self.records,
				&retrieval.filtered,
				&retrieval.semantic,
				top_k as usize,
				FusionPolicy::from(&self.cfg.fusion),
			)
		};
		let status = if items.is_empty() {
			ResponseStatus::Empty
		} else if !analysis.valid {
			ResponseStatus::Degraded
		} else {
			ResponseStatus::Success
		};
		let filter_summary = analysis.filter.summary();
		let elapsed_ms = started.elapsed().as_millis() as u64;

		tracing::info!(
			status = ?status,
			filters = analysis.filter.len(),
			degraded_reason = analysis.degraded_reason.map(|reason| reason.as_str()),
			items = items.len(),
			elapsed_ms,
			"Recommendation served."
		);

		Ok(RecommendationResponse {
			query: query.to_string(),
			analysis,
			filter_summary,
			status,
			items,
			elapsed_ms,
		})
	}

	/// Runs each query independently with at most `batch.max_concurrency` in flight. Results
	/// are index-aligned with `queries`; one failure does not affect its siblings.
	pub async fn recommend_many(&self, queries: &[String]) -> Vec<Result<RecommendationResponse>> {
		let limit = (self.cfg.batch.max_concurrency as usize).max(1);

		stream::iter(queries.iter().map(|query| self.recommend(query)))
			.buffered(limit)
			.collect()
			.await
	}
}
