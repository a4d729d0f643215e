use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use campus_config::{Config, IndexBackend};
use campus_domain::CollegeRecord;
use campus_service::{EmbeddingProvider, Providers};
use campus_storage::{qdrant::QdrantIndex, records::RecordStore};

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab")]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Overrides `dataset.csv_path`.
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: Option<PathBuf>,
	/// Re-embed and overwrite records that are already indexed.
	#[arg(long)]
	pub force: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct IndexReport {
	pub total: usize,
	pub added: usize,
	pub skipped: usize,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = campus_config::load(&args.config)?;

	init_tracing(&config);

	if config.storage.index.backend != IndexBackend::Qdrant {
		tracing::warn!(
			backend = config.storage.index.backend.as_str(),
			"Configured backend keeps vectors in memory; indexing into Qdrant anyway."
		);
	}

	let dataset = dataset_path(&config, args.dataset.as_deref());
	let (records, _) = RecordStore::load_csv(&dataset)?;
	let index = QdrantIndex::new(&config.storage.qdrant)?;

	index.ensure_collection().await?;

	let providers = Providers::default();
	let report =
		index_records(&config, &records, &index, providers.embedding.as_ref(), args.force).await?;

	tracing::info!(
		dataset = %dataset.display(),
		total = report.total,
		added = report.added,
		skipped = report.skipped,
		"Indexing finished."
	);

	Ok(())
}

pub fn init_tracing(config: &Config) {
	tracing_subscriber::fmt().with_env_filter(log_filter(&config.service.log_level)).init();
}

fn log_filter(directive: &str) -> EnvFilter {
	EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Embeds and upserts the records Qdrant does not have yet. Point ids are content-derived, so
/// re-running over an unchanged dataset adds nothing.
pub async fn index_records(
	config: &Config,
	records: &RecordStore,
	index: &QdrantIndex,
	embedder: &dyn EmbeddingProvider,
	force: bool,
) -> color_eyre::Result<IndexReport> {
	let batch_size = (config.indexing.batch_size as usize).max(1);
	let mut report = IndexReport { total: records.len(), ..IndexReport::default() };

	for batch in records.records().chunks(batch_size) {
		let pending = pending_records(batch, index, force).await?;

		report.skipped += batch.len() - pending.len();

		if pending.is_empty() {
			continue;
		}

		let texts: Vec<String> = pending.iter().map(|record| record.document_text()).collect();
		let vectors = campus_service::embed_documents(config, embedder, &texts).await?;

		verify_dimensions(&vectors, config.storage.qdrant.vector_dim)?;

		report.added += index.upsert(&pending, &vectors).await?;

		tracing::debug!(added = report.added, skipped = report.skipped, "Indexed batch.");
	}

	Ok(report)
}

async fn pending_records(
	batch: &[CollegeRecord],
	index: &QdrantIndex,
	force: bool,
) -> color_eyre::Result<Vec<CollegeRecord>> {
	if force {
		return Ok(batch.to_vec());
	}

	let ids: Vec<_> = batch.iter().map(|record| record.id).collect();
	let existing = index.existing_ids(&ids).await?;

	Ok(batch.iter().filter(|record| !existing.contains(&record.id)).cloned().collect())
}

fn verify_dimensions(vectors: &[Vec<f32>], expected: u32) -> color_eyre::Result<()> {
	if let Some(bad) = vectors.iter().find(|vec| vec.len() != expected as usize) {
		return Err(eyre::eyre!(
			"Embedding has {} dimensions but storage.qdrant.vector_dim is {expected}.",
			bad.len()
		));
	}

	Ok(())
}

pub fn dataset_path(config: &Config, override_path: Option<&Path>) -> PathBuf {
	override_path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(&config.dataset.csv_path))
}
