use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RecordId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
	Private,
	Government,
}
impl Ownership {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"private" | "pvt" | "pvt." | "deemed" | "self-financed" => Some(Self::Private),
			"govt" | "govt." | "government" | "public" | "state" | "central" => Some(Self::Government),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Private => "private",
			Self::Government => "government",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollegeRecord {
	pub id: RecordId,
	pub name: String,
	pub city: Option<String>,
	pub ownership: Option<Ownership>,
	pub course: Option<String>,
	pub exam: Option<String>,
	pub fee: Option<f64>,
	pub avg_package: Option<f64>,
	pub ranking: Option<u32>,
}
impl CollegeRecord {
	pub fn builder(name: impl Into<String>) -> RecordBuilder {
		RecordBuilder {
			name: name.into(),
			city: None,
			ownership: None,
			course: None,
			exam: None,
			fee: None,
			avg_package: None,
			ranking: None,
		}
	}

	/// Pipe-joined row used for content hashing. Two rows with the same visible fields
	/// collapse to the same record.
	pub fn canonical_row(&self) -> String {
		canonical_row(
			&self.name,
			self.ownership,
			self.city.as_deref(),
			self.course.as_deref(),
			self.fee,
			self.avg_package,
			self.ranking,
			self.exam.as_deref(),
		)
	}

	pub fn content_hash(&self) -> String {
		blake3::hash(self.canonical_row().as_bytes()).to_hex().to_string()
	}

	/// Text that gets embedded for semantic retrieval.
	pub fn document_text(&self) -> String {
		let mut parts = vec![self.name.clone()];

		if let Some(ownership) = self.ownership {
			parts.push(format!("{} college", ownership.as_str()));
		}
		if let Some(city) = &self.city {
			parts.push(format!("located in {city}"));
		}
		if let Some(course) = &self.course {
			parts.push(format!("offers {course}"));
		}
		if let Some(exam) = &self.exam {
			parts.push(format!("admission through {exam}"));
		}
		if let Some(fee) = self.fee {
			parts.push(format!("fees {}", crate::amount::format_rupees(fee)));
		}
		if let Some(package) = self.avg_package {
			parts.push(format!("average package {}", crate::amount::format_rupees(package)));
		}
		if let Some(ranking) = self.ranking {
			parts.push(format!("ranked {ranking}"));
		}

		parts.join(", ")
	}

	/// Exam names accepted by this college. Datasets list several exams as `JEE/GATE` or
	/// `CAT, XAT`.
	pub fn exams(&self) -> impl Iterator<Item = &str> {
		self.exam
			.as_deref()
			.unwrap_or_default()
			.split(['/', ','])
			.map(str::trim)
			.filter(|exam| !exam.is_empty())
	}
}

#[derive(Debug, Clone)]
pub struct RecordBuilder {
	name: String,
	city: Option<String>,
	ownership: Option<Ownership>,
	course: Option<String>,
	exam: Option<String>,
	fee: Option<f64>,
	avg_package: Option<f64>,
	ranking: Option<u32>,
}
impl RecordBuilder {
	pub fn city(mut self, city: impl Into<String>) -> Self {
		self.city = non_blank(city.into());

		self
	}

	pub fn ownership(mut self, ownership: Ownership) -> Self {
		self.ownership = Some(ownership);

		self
	}

	pub fn course(mut self, course: impl Into<String>) -> Self {
		self.course = non_blank(course.into());

		self
	}

	pub fn exam(mut self, exam: impl Into<String>) -> Self {
		self.exam = non_blank(exam.into());

		self
	}

	pub fn fee(mut self, fee: f64) -> Self {
		self.fee = fee.is_finite().then_some(fee);

		self
	}

	pub fn avg_package(mut self, avg_package: f64) -> Self {
		self.avg_package = avg_package.is_finite().then_some(avg_package);

		self
	}

	pub fn ranking(mut self, ranking: u32) -> Self {
		self.ranking = Some(ranking);

		self
	}

	pub fn build(self) -> CollegeRecord {
		let name = self.name.trim().to_string();
		let row = canonical_row(
			&name,
			self.ownership,
			self.city.as_deref(),
			self.course.as_deref(),
			self.fee,
			self.avg_package,
			self.ranking,
			self.exam.as_deref(),
		);
		let hash = blake3::hash(row.as_bytes());

		CollegeRecord {
			id: Uuid::new_v5(&Uuid::NAMESPACE_OID, hash.to_hex().as_bytes()),
			name,
			city: self.city,
			ownership: self.ownership,
			course: self.course,
			exam: self.exam,
			fee: self.fee,
			avg_package: self.avg_package,
			ranking: self.ranking,
		}
	}
}

/// Title-cases a free-form value: `new delhi` becomes `New Delhi`.
pub fn title_case(raw: &str) -> String {
	raw.split_whitespace()
		.map(|word| {
			let mut chars = word.chars();

			match chars.next() {
				Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
				None => String::new(),
			}
		})
		.collect::<Vec<String>>()
		.join(" ")
}

/// Maps the many ways people name a programme onto the dataset's course names.
pub fn canonical_course(raw: &str) -> Option<String> {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return None;
	}

	let course = match trimmed.to_ascii_lowercase().as_str() {
		"engineering" | "engineer" | "b.tech" | "btech" | "b.e" | "be" => "Engineering".to_string(),
		"mba" | "management" | "pgdm" => "MBA".to_string(),
		"medicine" | "medical" | "mbbs" => "Medical".to_string(),
		"law" | "llb" => "Law".to_string(),
		_ => title_case(trimmed),
	};

	Some(course)
}

/// Exam names are acronyms in practice (`JEE`, `CAT`, `NEET`), so they compare upper-cased.
pub fn canonical_exam(raw: &str) -> Option<String> {
	let trimmed = raw.trim();

	(!trimmed.is_empty()).then(|| trimmed.to_uppercase())
}

#[allow(clippy::too_many_arguments)]
fn canonical_row(
	name: &str,
	ownership: Option<Ownership>,
	city: Option<&str>,
	course: Option<&str>,
	fee: Option<f64>,
	avg_package: Option<f64>,
	ranking: Option<u32>,
	exam: Option<&str>,
) -> String {
	let number = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();

	[
		name.to_string(),
		ownership.map(|o| o.as_str().to_string()).unwrap_or_default(),
		city.unwrap_or_default().to_string(),
		course.unwrap_or_default().to_string(),
		number(fee),
		number(avg_package),
		ranking.map(|r| r.to_string()).unwrap_or_default(),
		exam.unwrap_or_default().to_string(),
	]
	.join("|")
}

fn non_blank(value: String) -> Option<String> {
	let trimmed = value.trim();

	(!trimmed.is_empty()).then(|| trimmed.to_string())
}
