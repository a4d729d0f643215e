use std::{
	cmp::Ordering,
	collections::{HashMap, HashSet},
};

use crate::{
	CandidateSource, ScoredCandidate,
	retrieve::{cmp_f32_desc, cmp_ranking},
};
use campus_domain::RecordId;
use campus_storage::records::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionPolicy {
	pub match_bonus: f32,
	pub filter_only_floor: f32,
}
impl From<&campus_config::Fusion> for FusionPolicy {
	fn from(cfg: &campus_config::Fusion) -> Self {
		Self { match_bonus: cfg.match_bonus, filter_only_floor: cfg.filter_only_floor }
	}
}

/// Merges filter matches with semantic hits into one ranked list of at most `k` entries.
///
/// Scores: both sets get `similarity + match_bonus`, filter-only gets
/// `filter_only_floor + match_bonus`, semantic-only keeps its similarity. Ties fall back to
/// source (both sets, then filter-only, then semantic-only), similarity, ranking (unranked
/// last), semantic rank and finally store order, so identical inputs always produce identical
/// output.
pub fn fuse(
	records: &RecordStore,
	filtered: &[RecordId],
	semantic: &[ScoredCandidate],
	k: usize,
	policy: FusionPolicy,
) -> Vec<ScoredCandidate> {
	let filtered_set: HashSet<RecordId> = filtered.iter().copied().collect();
	let mut seen: HashSet<RecordId> = HashSet::with_capacity(semantic.len() + filtered.len());
	let mut fused: Vec<ScoredCandidate> = Vec::with_capacity(semantic.len() + filtered.len());

	for candidate in semantic {
		if !seen.insert(candidate.id()) {
			continue;
		}

		let mut candidate = candidate.clone();

		if filtered_set.contains(&candidate.id()) {
			candidate.filter_match = true;
			candidate.source = CandidateSource::Both;
			candidate.match_bonus = policy.match_bonus;
			candidate.composite_score = candidate.similarity + policy.match_bonus;
		} else {
			candidate.filter_match = false;
			candidate.source = CandidateSource::SemanticOnly;
			candidate.match_bonus = 0.0;
			candidate.composite_score = candidate.similarity;
		}

		fused.push(candidate);
	}

	for id in filtered {
		if !seen.insert(*id) {
			continue;
		}

		let Some(record) = records.get(id) else {
			continue;
		};

		fused.push(ScoredCandidate {
			record: record.clone(),
			similarity: policy.filter_only_floor,
			filter_match: true,
			semantic_rank: None,
			composite_score: policy.filter_only_floor + policy.match_bonus,
			source: CandidateSource::FilterOnly,
			match_bonus: policy.match_bonus,
		});
	}

	let positions: HashMap<RecordId, usize> = fused
		.iter()
		.map(|candidate| (candidate.id(), records.position(&candidate.id()).unwrap_or(usize::MAX)))
		.collect();

	fused.sort_by(|a, b| {
		cmp_f32_desc(a.composite_score, b.composite_score)
			.then_with(|| source_tier(a.source).cmp(&source_tier(b.source)))
			.then_with(|| cmp_f32_desc(a.similarity, b.similarity))
			.then_with(|| cmp_ranking(a.record.ranking, b.record.ranking))
			.then_with(|| cmp_semantic_rank(a.semantic_rank, b.semantic_rank))
			.then_with(|| positions[&a.id()].cmp(&positions[&b.id()]))
	});
	fused.truncate(k);

	fused
}

fn source_tier(source: CandidateSource) -> u8 {
	match source {
		CandidateSource::Both => 0,
		CandidateSource::FilterOnly => 1,
		CandidateSource::SemanticOnly => 2,
	}
}

fn cmp_semantic_rank(a: Option<u32>, b: Option<u32>) -> Ordering {
	cmp_ranking(a, b)
}
