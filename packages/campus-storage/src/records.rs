use std::{collections::HashMap, path::Path};

use serde::Deserialize;

use crate::Result;
use campus_domain::{CollegeRecord, Ownership, RecordId, amount};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
	name: Option<String>,
	#[serde(rename = "type")]
	ownership: Option<String>,
	city: Option<String>,
	course: Option<String>,
	fees: Option<String>,
	avg_package: Option<String>,
	ranking: Option<String>,
	exam: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
	pub loaded: usize,
	pub skipped_unnamed: usize,
	pub duplicates: usize,
}

/// The dataset, loaded once and read-only afterwards. Iteration follows load order.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
	records: Vec<CollegeRecord>,
	positions: HashMap<RecordId, usize>,
}
impl RecordStore {
	/// Builds a store, keeping the first of any records with the same id.
	pub fn from_records(records: impl IntoIterator<Item = CollegeRecord>) -> Self {
		let mut store = Self::default();

		for record in records {
			store.push(record);
		}

		store
	}

	pub fn load_csv(path: &Path) -> Result<(Self, LoadReport)> {
		let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
		let mut store = Self::default();
		let mut report = LoadReport::default();

		for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
			let row = row?;
			let Some(record) = row_to_record(row) else {
				tracing::warn!(path = %path.display(), row = line + 1, "Skipping dataset row without a name.");

				report.skipped_unnamed += 1;

				continue;
			};

			if store.push(record) {
				report.loaded += 1;
			} else {
				report.duplicates += 1;
			}
		}

		tracing::info!(
			path = %path.display(),
			loaded = report.loaded,
			skipped_unnamed = report.skipped_unnamed,
			duplicates = report.duplicates,
			"Dataset loaded."
		);

		Ok((store, report))
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn get(&self, id: &RecordId) -> Option<&CollegeRecord> {
		self.positions.get(id).map(|&position| &self.records[position])
	}

	/// Load-order position, used as the final deterministic tie-breaker when ranking.
	pub fn position(&self, id: &RecordId) -> Option<usize> {
		self.positions.get(id).copied()
	}

	pub fn iter(&self) -> impl Iterator<Item = &CollegeRecord> {
		self.records.iter()
	}

	pub fn records(&self) -> &[CollegeRecord] {
		&self.records
	}

	fn push(&mut self, record: CollegeRecord) -> bool {
		if self.positions.contains_key(&record.id) {
			return false;
		}

		self.positions.insert(record.id, self.records.len());
		self.records.push(record);

		true
	}
}

fn row_to_record(row: CsvRow) -> Option<CollegeRecord> {
	let name = row.name.filter(|name| !name.trim().is_empty())?;
	let mut builder = CollegeRecord::builder(name);

	if let Some(city) = row.city {
		builder = builder.city(city);
	}
	if let Some(ownership) = row.ownership.as_deref().and_then(Ownership::parse) {
		builder = builder.ownership(ownership);
	}
	if let Some(course) = row.course {
		builder = builder.course(course);
	}
	if let Some(exam) = row.exam {
		builder = builder.exam(exam);
	}
	if let Some(fee) = row.fees.as_deref().and_then(amount::parse_amount) {
		builder = builder.fee(fee);
	}
	if let Some(package) = row.avg_package.as_deref().and_then(amount::parse_amount) {
		builder = builder.avg_package(package);
	}
	if let Some(ranking) = row.ranking.as_deref().and_then(parse_ranking) {
		builder = builder.ranking(ranking);
	}

	Some(builder.build())
}

fn parse_ranking(raw: &str) -> Option<u32> {
	let trimmed = raw.trim().trim_start_matches('#');

	trimmed.parse::<u32>().ok().or_else(|| {
		let value: f64 = trimmed.parse().ok()?;

		(value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX))
			.then(|| value.round() as u32)
	})
}
