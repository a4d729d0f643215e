mod error;

pub use error::{Error, Result};

use std::{
	env, fs,
	path::{Path, PathBuf},
};

use serde_json::Map;
use uuid::Uuid;

use campus_config::{
	Batch, Config, Dataset, EmbeddingProviderConfig, Extraction, Fusion, IndexBackend,
	IndexSettings, Indexing, LlmProviderConfig, Providers, Qdrant, Retrieval, Retry, Service,
	Storage,
};
use campus_domain::{CollegeRecord, Ownership};

pub const FIXTURE_VECTOR_DIM: u32 = 64;
pub const CSV_HEADER: [&str; 8] =
	["name", "type", "city", "course", "fees", "avg_package", "ranking", "exam"];

/// The three-record dataset from the Mumbai MBA scenario: A and B are Mumbai MBAs on either
/// side of the 10 lakh fee line, C is a cheaper MBA in Delhi.
pub fn scenario_records() -> Vec<CollegeRecord> {
	vec![
		CollegeRecord::builder("Alpha School of Business")
			.city("Mumbai")
			.ownership(Ownership::Private)
			.course("MBA")
			.exam("CAT")
			.fee(900_000.0)
			.avg_package(1_800_000.0)
			.ranking(12)
			.build(),
		CollegeRecord::builder("Bayview Institute of Management")
			.city("Mumbai")
			.ownership(Ownership::Private)
			.course("MBA")
			.exam("CAT/XAT")
			.fee(1_200_000.0)
			.avg_package(2_100_000.0)
			.ranking(8)
			.build(),
		CollegeRecord::builder("Capital Management College")
			.city("Delhi")
			.ownership(Ownership::Government)
			.course("MBA")
			.exam("CAT")
			.fee(500_000.0)
			.avg_package(1_400_000.0)
			.ranking(20)
			.build(),
	]
}

/// Scenario records plus a spread of courses, cities and partially-filled rows.
pub fn fixture_records() -> Vec<CollegeRecord> {
	let mut records = scenario_records();

	records.extend([
		CollegeRecord::builder("Deccan Institute of Technology")
			.city("Pune")
			.ownership(Ownership::Private)
			.course("Engineering")
			.exam("JEE/MHT-CET")
			.fee(350_000.0)
			.avg_package(900_000.0)
			.ranking(30)
			.build(),
		CollegeRecord::builder("Eastern Medical College")
			.city("Kolkata")
			.ownership(Ownership::Government)
			.course("Medical")
			.exam("NEET")
			.fee(150_000.0)
			.ranking(18)
			.build(),
		CollegeRecord::builder("Fort Engineering College")
			.city("Chennai")
			.ownership(Ownership::Government)
			.course("Engineering")
			.exam("TNEA")
			.fee(80_000.0)
			.avg_package(700_000.0)
			.ranking(25)
			.build(),
		CollegeRecord::builder("Garden City Business School").city("Bangalore").course("MBA").build(),
	]);

	records
}

/// Memory-backed configuration that never reaches the network during tests.
pub fn sample_config() -> Config {
	Config {
		service: Service { log_level: "debug".to_string() },
		dataset: Dataset { csv_path: "fixtures/colleges.csv".to_string() },
		storage: Storage {
			index: IndexSettings { backend: IndexBackend::Memory },
			qdrant: Qdrant {
				url: "http://127.0.0.1:6334".to_string(),
				collection: "colleges_test".to_string(),
				vector_dim: FIXTURE_VECTOR_DIM,
			},
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "hash".to_string(),
				dimensions: FIXTURE_VECTOR_DIM,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			llm_extractor: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-key".to_string(),
				path: "/chat/completions".to_string(),
				model: "scripted".to_string(),
				temperature: 0.1,
				max_tokens: 500,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		extraction: Extraction::default(),
		retrieval: Retrieval::default(),
		fusion: Fusion::default(),
		retry: Retry { max_attempts: 3, base_backoff_ms: 1, max_backoff_ms: 4 },
		batch: Batch::default(),
		indexing: Indexing { batch_size: 2 },
	}
}

/// Deterministic bag-of-words embedder: every lower-cased token is hashed into one of `dim`
/// buckets and the vector is L2-normalized. Texts sharing words get positive cosine similarity.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
	dim: usize,
}
impl HashEmbedder {
	pub fn new(dim: u32) -> Self {
		Self { dim: dim.max(1) as usize }
	}

	pub fn embed(&self, text: &str) -> Vec<f32> {
		let mut vec = vec![0.0_f32; self.dim];

		for token in text
			.split(|c: char| !c.is_alphanumeric())
			.filter(|token| !token.is_empty())
			.map(str::to_lowercase)
		{
			let hash = blake3::hash(token.as_bytes());
			let bytes = hash.as_bytes();
			let bucket = u64::from_le_bytes([
				bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
			]) % self.dim as u64;

			vec[bucket as usize] += 1.0;
		}

		let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();

		if norm > 0.0 {
			for value in &mut vec {
				*value /= norm;
			}
		}

		vec
	}

	pub fn embed_all(&self, texts: &[String]) -> Vec<Vec<f32>> {
		texts.iter().map(|text| self.embed(text)).collect()
	}
}

/// Scratch directory removed on drop.
pub struct TestDir {
	path: PathBuf,
}
impl TestDir {
	pub fn new(prefix: &str) -> Result<Self> {
		let path = env::temp_dir().join(format!("{prefix}_{}", Uuid::new_v4().simple()));

		fs::create_dir_all(&path)?;

		Ok(Self { path })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
		let path = self.path.join(name);

		fs::write(&path, contents)?;

		Ok(path)
	}
}
impl Drop for TestDir {
	fn drop(&mut self) {
		let _ = fs::remove_dir_all(&self.path);
	}
}

/// Writes records with the dataset's column layout.
pub fn write_records_csv(path: &Path, records: &[CollegeRecord]) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;

	writer.write_record(CSV_HEADER)?;

	for record in records {
		let number = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();

		writer.write_record([
			record.name.clone(),
			record.ownership.map(|o| o.as_str().to_string()).unwrap_or_default(),
			record.city.clone().unwrap_or_default(),
			record.course.clone().unwrap_or_default(),
			number(record.fee),
			number(record.avg_package),
			record.ranking.map(|r| r.to_string()).unwrap_or_default(),
			record.exam.clone().unwrap_or_default(),
		])?;
	}

	writer.flush()?;

	Ok(())
}

pub fn record_named<'a>(records: &'a [CollegeRecord], name: &str) -> Result<&'a CollegeRecord> {
	records
		.iter()
		.find(|record| record.name == name)
		.ok_or_else(|| Error::Message(format!("No fixture record named {name}.")))
}
