use std::{
	collections::HashSet,
	fs,
	path::{Path, PathBuf},
	sync::Arc,
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use campus_config::{Config, IndexBackend};
use campus_service::{CampusService, Providers, RecommendationResponse, VectorIndex};
use campus_storage::{qdrant::QdrantIndex, records::RecordStore};

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab")]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	#[arg(long, value_name = "N")]
	pub top_k: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EvalDataset {
	name: Option<String>,
	queries: Vec<EvalQuery>,
}

#[derive(Debug, Deserialize)]
struct EvalQuery {
	id: Option<String>,
	query: String,
	#[serde(default)]
	expected: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EvalOutput {
	dataset: EvalDatasetInfo,
	settings: EvalSettings,
	summary: EvalSummary,
	queries: Vec<QueryReport>,
	failures: Vec<QueryFailure>,
}

#[derive(Debug, Serialize)]
struct EvalDatasetInfo {
	name: String,
	query_count: usize,
}

#[derive(Debug, Serialize)]
struct EvalSettings {
	config_path: String,
	backend: &'static str,
	top_k: u32,
	score_threshold: f32,
	match_bonus: f32,
	max_concurrency: u32,
}

#[derive(Debug, Serialize)]
struct EvalSummary {
	avg_recall_at_k: f64,
	avg_precision_at_k: f64,
	mean_rr: f64,
	mean_ndcg: f64,
	latency_ms_p50: f64,
	latency_ms_p95: f64,
	batch_ms: f64,
	failed_count: usize,
	empty_count: usize,
	degraded_count: usize,
}

#[derive(Debug, Serialize)]
struct QueryReport {
	id: String,
	query: String,
	status: String,
	filter_summary: String,
	expected_count: usize,
	retrieved_count: usize,
	relevant_count: usize,
	recall_at_k: f64,
	precision_at_k: f64,
	rr: f64,
	ndcg: f64,
	latency_ms: f64,
	expected: Vec<String>,
	retrieved: Vec<String>,
}

#[derive(Debug, Serialize)]
struct QueryFailure {
	id: String,
	query: String,
	error: String,
}

#[derive(Debug, PartialEq)]
struct Metrics {
	recall_at_k: f64,
	precision_at_k: f64,
	rr: f64,
	ndcg: f64,
	relevant_count: usize,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let mut config = campus_config::load(&args.config)?;
	tracing_subscriber::fmt().with_env_filter(log_filter(&config.service.log_level)).init();

	if let Some(top_k) = args.top_k {
		config.retrieval.top_k = top_k;

		campus_config::validate(&config)?;
	}

	let dataset = load_dataset(&args.dataset)?;
	let settings = EvalSettings {
		config_path: args.config.display().to_string(),
		backend: config.storage.index.backend.as_str(),
		top_k: config.retrieval.top_k,
		score_threshold: config.retrieval.score_threshold,
		match_bonus: config.fusion.match_bonus,
		max_concurrency: config.batch.max_concurrency,
	};
	let service = build_service(config).await?;
	let queries: Vec<String> = dataset.queries.iter().map(|query| query.query.clone()).collect();
	let started = Instant::now();
	let results = service.recommend_many(&queries).await;
	let batch_ms = started.elapsed().as_secs_f64() * 1_000.0;
	let mut reports = Vec::new();
	let mut failures = Vec::new();

	for (idx, (query, result)) in dataset.queries.iter().zip(results).enumerate() {
		let id = query.id.clone().unwrap_or_else(|| format!("q{}", idx + 1));

		match result {
			Ok(response) => reports.push(query_report(id, query, &response)),
			Err(err) => {
				tracing::warn!(id = %id, error = %err, "Query failed.");

				failures.push(QueryFailure { id, query: query.query.clone(), error: err.to_string() });
			},
		}
	}

	let mut summary = summarize(&reports, batch_ms);

	summary.failed_count = failures.len();

	let output = EvalOutput {
		dataset: EvalDatasetInfo {
			name: dataset.name.clone().unwrap_or_else(|| dataset_name(&args.dataset)),
			query_count: dataset.queries.len(),
		},
		settings,
		summary,
		queries: reports,
		failures,
	};
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

fn log_filter(directive: &str) -> EnvFilter {
	EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

async fn build_service(config: Config) -> color_eyre::Result<CampusService> {
	let (records, _) = RecordStore::load_csv(Path::new(&config.dataset.csv_path))?;
	let providers = Providers::default();
	let index: Arc<dyn VectorIndex> = match config.storage.index.backend {
		IndexBackend::Qdrant => Arc::new(QdrantIndex::new(&config.storage.qdrant)?),
		IndexBackend::Memory => Arc::new(
			campus_service::build_memory_index(&config, &records, providers.embedding.as_ref())
				.await?,
		),
	};

	Ok(CampusService::new(config, Arc::new(records), index, providers))
}

fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.queries.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one query."));
	}

	Ok(dataset)
}

fn dataset_name(path: &Path) -> String {
	path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default()
}

fn query_report(id: String, query: &EvalQuery, response: &RecommendationResponse) -> QueryReport {
	let retrieved: Vec<String> = response.items.iter().map(|item| item.record.name.clone()).collect();
	let expected: HashSet<String> = query.expected.iter().map(|name| normalize_name(name)).collect();
	let normalized: Vec<String> = retrieved.iter().map(|name| normalize_name(name)).collect();
	let metrics = compute_metrics(&normalized, &expected);

	QueryReport {
		id,
		query: query.query.clone(),
		status: status_label(response).to_string(),
		filter_summary: response.filter_summary.clone(),
		expected_count: expected.len(),
		retrieved_count: retrieved.len(),
		relevant_count: metrics.relevant_count,
		recall_at_k: metrics.recall_at_k,
		precision_at_k: metrics.precision_at_k,
		rr: metrics.rr,
		ndcg: metrics.ndcg,
		latency_ms: response.elapsed_ms as f64,
		expected: query.expected.clone(),
		retrieved,
	}
}

fn status_label(response: &RecommendationResponse) -> &'static str {
	match response.status {
		campus_service::ResponseStatus::Success => "success",
		campus_service::ResponseStatus::Degraded => "degraded",
		campus_service::ResponseStatus::Empty => "empty",
	}
}

fn normalize_name(name: &str) -> String {
	name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn compute_metrics(retrieved: &[String], expected: &HashSet<String>) -> Metrics {
	let expected_count = expected.len();

	let mut relevant_count = 0usize;
	let mut dcg = 0.0_f64;
	let mut rr = 0.0_f64;
	let mut first_hit: Option<usize> = None;
	let mut seen = HashSet::new();

	for (idx, name) in retrieved.iter().enumerate() {
		if expected.contains(name) && seen.insert(name) {
			relevant_count += 1;
			let rank = idx + 1;
			let denom = (rank as f64 + 1.0).log2();
			dcg += 1.0 / denom;
			if first_hit.is_none() {
				first_hit = Some(rank);
			}
		}
	}

	if let Some(rank) = first_hit {
		rr = 1.0 / rank as f64;
	}

	let ideal_hits = expected_count.min(retrieved.len());

	let mut idcg = 0.0_f64;

	for idx in 0..ideal_hits {
		let rank = idx + 1;
		let denom = (rank as f64 + 1.0).log2();
		idcg += 1.0 / denom;
	}

	let ndcg = if idcg > 0.0 { dcg / idcg } else { 0.0 };
	let precision_at_k =
		if retrieved.is_empty() { 0.0 } else { relevant_count as f64 / retrieved.len() as f64 };
	let recall_at_k =
		if expected_count == 0 { 0.0 } else { relevant_count as f64 / expected_count as f64 };

	Metrics { recall_at_k, precision_at_k, rr, ndcg, relevant_count }
}

fn summarize(reports: &[QueryReport], batch_ms: f64) -> EvalSummary {
	let count = reports.len().max(1) as f64;
	let avg_recall_at_k = reports.iter().map(|r| r.recall_at_k).sum::<f64>() / count;
	let avg_precision_at_k = reports.iter().map(|r| r.precision_at_k).sum::<f64>() / count;
	let mean_rr = reports.iter().map(|r| r.rr).sum::<f64>() / count;
	let mean_ndcg = reports.iter().map(|r| r.ndcg).sum::<f64>() / count;

	let mut sorted: Vec<f64> = reports.iter().map(|r| r.latency_ms).collect();

	sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

	EvalSummary {
		avg_recall_at_k,
		avg_precision_at_k,
		mean_rr,
		mean_ndcg,
		latency_ms_p50: percentile(&sorted, 0.50),
		latency_ms_p95: percentile(&sorted, 0.95),
		batch_ms,
		failed_count: 0,
		empty_count: reports.iter().filter(|r| r.status == "empty").count(),
		degraded_count: reports.iter().filter(|r| r.status == "degraded").count(),
	}
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let clamped = percentile.clamp(0.0, 1.0);
	let pos = clamped * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;

	if lower == upper {
		values[lower]
	} else {
		let weight = pos - lower as f64;
		values[lower] * (1.0 - weight) + values[upper] * weight
	}
}
