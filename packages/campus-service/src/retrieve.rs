use std::{
	cmp::Ordering,
	collections::{HashMap, HashSet},
};

use serde::Serialize;

use crate::{CampusService, Error, QueryAnalysis, Result, retry};
use campus_domain::{CollegeRecord, RecordId};
use campus_storage::IndexHit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
	Both,
	FilterOnly,
	SemanticOnly,
}

/// A record with its scores. Retrieval fills in similarity and rank; fusion assigns the
/// composite score, source and bonus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
	pub record: CollegeRecord,
	pub similarity: f32,
	pub filter_match: bool,
	pub semantic_rank: Option<u32>,
	pub composite_score: f32,
	pub source: CandidateSource,
	pub match_bonus: f32,
}
impl ScoredCandidate {
	pub fn semantic(record: CollegeRecord, similarity: f32, rank: u32, filter_match: bool) -> Self {
		Self {
			record,
			similarity,
			filter_match,
			semantic_rank: Some(rank),
			composite_score: similarity,
			source: CandidateSource::SemanticOnly,
			match_bonus: 0.0,
		}
	}

	pub fn id(&self) -> RecordId {
		self.record.id
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Retrieval {
	/// Records satisfying the filter, in Record Store order. Empty when the filter is empty.
	pub filtered: Vec<RecordId>,
	/// Semantic hits at or above the threshold, best first.
	pub semantic: Vec<ScoredCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropReasonCount {
	pub reason: String,
	pub count: usize,
}

impl CampusService {
	/// Runs the filtered and semantic passes. Fails only when embedding or the index stays
	/// unavailable after retries.
	pub async fn retrieve(
		&self,
		analysis: &QueryAnalysis,
		k: u32,
		score_threshold: f32,
	) -> Result<Retrieval> {
		if k == 0 {
			return Err(Error::InvalidRequest { message: "k must be greater than zero.".to_string() });
		}
		if !score_threshold.is_finite() || !(0.0..=1.0).contains(&score_threshold) {
			return Err(Error::InvalidRequest {
				message: "score_threshold must be a finite number in [0.0, 1.0].".to_string(),
			});
		}

		let filtered = self.filtered_pass(analysis);
		let text = analysis.semantic_text();
		let vector = self.embed_query(&text).await?;
		let candidate_k = self.cfg.retrieval.candidate_k(k);
		let policy = self.embedding_retry();
		let hits = retry::with_retry(&policy, "vector_nearest", || self.index.nearest(&vector, candidate_k))
			.await
			.map_err(|err| match err.last {
				retry::AttemptFailure::Failed(inner) if !inner.is_transient() =>
					Error::from(inner),
				last => Error::IndexUnavailable { attempts: err.attempts, message: last.to_string() },
			})?;
		let filtered_set: HashSet<RecordId> = filtered.iter().copied().collect();
		let semantic = self.rank_hits(&hits, &filtered_set, score_threshold);

		tracing::debug!(
			filtered = filtered.len(),
			hits = hits.len(),
			semantic = semantic.len(),
			candidate_k,
			"Retrieval passes complete."
		);

		Ok(Retrieval { filtered, semantic })
	}

	fn filtered_pass(&self, analysis: &QueryAnalysis) -> Vec<RecordId> {
		if analysis.filter.is_empty() {
			return Vec::new();
		}

		let mut kept = Vec::new();
		let mut dropped_reason_counts: HashMap<String, usize> = HashMap::new();

		for record in self.records.iter() {
			let outcome = analysis.filter.matches(record);

			if outcome.matched {
				kept.push(record.id);
			} else {
				dropped_reason_counts
					.entry(outcome.reason.unwrap_or_else(|| "filter.no_match".to_string()))
					.and_modify(|count| *count += 1)
					.or_insert(1);
			}
		}

		let top_drop_reasons = top_drop_reasons(dropped_reason_counts);

		tracing::debug!(
			kept = kept.len(),
			total = self.records.len(),
			top_drop_reasons = ?top_drop_reasons,
			"Filtered pass evaluated."
		);

		kept
	}

	async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
		let texts = vec![text.to_string()];
		let policy = self.embedding_retry();
		let embedding_cfg = &self.cfg.providers.embedding;
		let vectors = retry::with_retry(&policy, "embed_query", || {
			self.providers.embedding.embed(embedding_cfg, &texts)
		})
		.await
		.map_err(|err| Error::EmbeddingUnavailable {
			attempts: err.attempts,
			message: err.last.to_string(),
		})?;

		vectors.into_iter().next().ok_or_else(|| Error::EmbeddingUnavailable {
			attempts: 1,
			message: "Embedding provider returned no vectors.".to_string(),
		})
	}

	fn rank_hits(
		&self,
		hits: &[IndexHit],
		filtered: &HashSet<RecordId>,
		score_threshold: f32,
	) -> Vec<ScoredCandidate> {
		let mut seen = HashSet::new();
		let mut scored: Vec<(CollegeRecord, f32)> = Vec::with_capacity(hits.len());

		for hit in hits {
			if !seen.insert(hit.record_id) {
				continue;
			}

			let Some(record) = self.records.get(&hit.record_id) else {
				tracing::warn!(record_id = %hit.record_id, "Index returned a record missing from the store.");

				continue;
			};

			scored.push((record.clone(), clamp_similarity(hit.similarity)));
		}

		scored.sort_by(|(a_record, a_sim), (b_record, b_sim)| {
			cmp_f32_desc(*a_sim, *b_sim).then_with(|| cmp_ranking(a_record.ranking, b_record.ranking))
		});

		scored
			.into_iter()
			.enumerate()
			.filter(|(_, (_, similarity))| *similarity >= score_threshold)
			.map(|(idx, (record, similarity))| {
				let filter_match = filtered.contains(&record.id);

				ScoredCandidate::semantic(record, similarity, idx as u32 + 1, filter_match)
			})
			.collect()
	}
}

pub(crate) fn clamp_similarity(raw: f32) -> f32 {
	if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 }
}

pub(crate) fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

/// Lower ranking is better; unranked records sort last.
pub(crate) fn cmp_ranking(a: Option<u32>, b: Option<u32>) -> Ordering {
	match (a, b) {
		(Some(a), Some(b)) => a.cmp(&b),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}

fn top_drop_reasons(counts: HashMap<String, usize>) -> Vec<DropReasonCount> {
	let mut reasons: Vec<DropReasonCount> =
		counts.into_iter().map(|(reason, count)| DropReasonCount { reason, count }).collect();

	reasons.sort_by(|a, b| match b.count.cmp(&a.count) {
		Ordering::Equal => a.reason.cmp(&b.reason),
		other => other,
	});
	reasons.truncate(5);

	reasons
}
