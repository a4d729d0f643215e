use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
	amount,
	college::{CollegeRecord, Ownership},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
	City,
	Ownership,
	Course,
	Exam,
	Fee,
	AvgPackage,
	Ranking,
}
impl Attribute {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::City => "city",
			Self::Ownership => "ownership",
			Self::Course => "course",
			Self::Exam => "exam",
			Self::Fee => "fee",
			Self::AvgPackage => "avg_package",
			Self::Ranking => "ranking",
		}
	}

	pub fn is_numeric(&self) -> bool {
		matches!(self, Self::Fee | Self::AvgPackage | Self::Ranking)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
	pub value: f64,
	pub inclusive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
	min: Option<Bound>,
	max: Option<Bound>,
}
impl NumericRange {
	/// Returns `None` for ranges no value can satisfy or that constrain nothing.
	pub fn new(min: Option<Bound>, max: Option<Bound>) -> Option<Self> {
		if min.is_none() && max.is_none() {
			return None;
		}
		if [min, max].iter().flatten().any(|bound| !bound.value.is_finite()) {
			return None;
		}
		if let (Some(lo), Some(hi)) = (min, max) {
			if lo.value > hi.value {
				return None;
			}
			if lo.value == hi.value && !(lo.inclusive && hi.inclusive) {
				return None;
			}
		}

		Some(Self { min, max })
	}

	pub fn below(value: f64) -> Option<Self> {
		Self::new(None, Some(Bound { value, inclusive: false }))
	}

	pub fn at_most(value: f64) -> Option<Self> {
		Self::new(None, Some(Bound { value, inclusive: true }))
	}

	pub fn above(value: f64) -> Option<Self> {
		Self::new(Some(Bound { value, inclusive: false }), None)
	}

	pub fn at_least(value: f64) -> Option<Self> {
		Self::new(Some(Bound { value, inclusive: true }), None)
	}

	pub fn exactly(value: f64) -> Option<Self> {
		let bound = Some(Bound { value, inclusive: true });

		Self::new(bound, bound)
	}

	pub fn min(&self) -> Option<Bound> {
		self.min
	}

	pub fn max(&self) -> Option<Bound> {
		self.max
	}

	pub fn contains(&self, value: f64) -> bool {
		if !value.is_finite() {
			return false;
		}

		let above_min = match self.min {
			Some(Bound { value: lo, inclusive: true }) => value >= lo,
			Some(Bound { value: lo, inclusive: false }) => value > lo,
			None => true,
		};
		let below_max = match self.max {
			Some(Bound { value: hi, inclusive: true }) => value <= hi,
			Some(Bound { value: hi, inclusive: false }) => value < hi,
			None => true,
		};

		above_min && below_max
	}

	fn describe(&self, render: impl Fn(f64) -> String) -> String {
		match (self.min, self.max) {
			(Some(lo), Some(hi)) if lo.value == hi.value => format!("exactly {}", render(lo.value)),
			(Some(lo), Some(hi)) => format!("between {} and {}", render(lo.value), render(hi.value)),
			(Some(lo), None) if lo.inclusive => format!("at least {}", render(lo.value)),
			(Some(lo), None) => format!("above {}", render(lo.value)),
			(None, Some(hi)) if hi.inclusive => format!("up to {}", render(hi.value)),
			(None, Some(hi)) => format!("under {}", render(hi.value)),
			(None, None) => "any".to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
	OneOf(Vec<String>),
	Range(NumericRange),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
	pub matched: bool,
	pub reason: Option<String>,
}
impl FilterOutcome {
	fn matched() -> Self {
		Self { matched: true, reason: None }
	}

	fn dropped(reason: String) -> Self {
		Self { matched: false, reason: Some(reason) }
	}
}

/// Conjunction of per-attribute constraints. At most one constraint per attribute; an empty
/// filter constrains nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryFilter {
	constraints: BTreeMap<Attribute, Constraint>,
}
impl QueryFilter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a constraint, replacing any earlier one on the same attribute. Returns `false` and
	/// leaves the filter untouched when the constraint kind does not fit the attribute or a
	/// membership list is empty.
	pub fn insert(&mut self, attribute: Attribute, constraint: Constraint) -> bool {
		let fits = match &constraint {
			Constraint::OneOf(values) =>
				!attribute.is_numeric() && values.iter().any(|value| !value.trim().is_empty()),
			Constraint::Range(_) => attribute.is_numeric(),
		};

		if !fits {
			return false;
		}

		let constraint = match constraint {
			Constraint::OneOf(values) => Constraint::OneOf(
				values
					.into_iter()
					.map(|value| value.trim().to_string())
					.filter(|value| !value.is_empty())
					.collect(),
			),
			range => range,
		};

		self.constraints.insert(attribute, constraint);

		true
	}

	pub fn get(&self, attribute: Attribute) -> Option<&Constraint> {
		self.constraints.get(&attribute)
	}

	pub fn iter(&self) -> impl Iterator<Item = (Attribute, &Constraint)> {
		self.constraints.iter().map(|(attribute, constraint)| (*attribute, constraint))
	}

	pub fn is_empty(&self) -> bool {
		self.constraints.is_empty()
	}

	pub fn len(&self) -> usize {
		self.constraints.len()
	}

	/// Evaluates every constraint in attribute order. A record lacking a constrained field
	/// does not match.
	pub fn matches(&self, record: &CollegeRecord) -> FilterOutcome {
		for (attribute, constraint) in self.iter() {
			match check(attribute, constraint, record) {
				Some(true) => {},
				Some(false) => return FilterOutcome::dropped(attribute.as_str().to_string()),
				None => return FilterOutcome::dropped(format!("missing:{}", attribute.as_str())),
			}
		}

		FilterOutcome::matched()
	}

	pub fn summary(&self) -> String {
		if self.is_empty() {
			return "no specific filters".to_string();
		}

		let mut parts = Vec::new();

		for (attribute, constraint) in self.iter() {
			let part = match (attribute, constraint) {
				(Attribute::City, Constraint::OneOf(values)) => format!("in {}", join_or(values)),
				(Attribute::Ownership, Constraint::OneOf(values)) =>
					format!("{} colleges", join_or(values).to_lowercase()),
				(Attribute::Course, Constraint::OneOf(values)) => format!("for {}", join_or(values)),
				(Attribute::Exam, Constraint::OneOf(values)) => format!("via {}", join_or(values)),
				(Attribute::Fee, Constraint::Range(range)) =>
					format!("fees {}", range.describe(amount::format_rupees)),
				(Attribute::AvgPackage, Constraint::Range(range)) =>
					format!("average package {}", range.describe(amount::format_rupees)),
				(Attribute::Ranking, Constraint::Range(range)) =>
					format!("ranking {}", range.describe(|value| format!("{value:.0}"))),
				(attribute, _) => attribute.as_str().to_string(),
			};

			parts.push(part);
		}

		parts.join(", ")
	}
}

fn check(attribute: Attribute, constraint: &Constraint, record: &CollegeRecord) -> Option<bool> {
	match (attribute, constraint) {
		(Attribute::City, Constraint::OneOf(values)) =>
			record.city.as_deref().map(|city| contains_ci(values, city)),
		(Attribute::Course, Constraint::OneOf(values)) =>
			record.course.as_deref().map(|course| contains_ci(values, course)),
		(Attribute::Ownership, Constraint::OneOf(values)) => record
			.ownership
			.map(|ownership| values.iter().any(|value| Ownership::parse(value) == Some(ownership))),
		(Attribute::Exam, Constraint::OneOf(values)) => {
			record.exam.as_ref()?;

			Some(record.exams().any(|exam| contains_ci(values, exam)))
		},
		(Attribute::Fee, Constraint::Range(range)) => record.fee.map(|fee| range.contains(fee)),
		(Attribute::AvgPackage, Constraint::Range(range)) =>
			record.avg_package.map(|package| range.contains(package)),
		(Attribute::Ranking, Constraint::Range(range)) =>
			record.ranking.map(|ranking| range.contains(f64::from(ranking))),
		_ => Some(false),
	}
}

fn contains_ci(values: &[String], candidate: &str) -> bool {
	let candidate = candidate.trim();

	values.iter().any(|value| value.trim().eq_ignore_ascii_case(candidate))
}

fn join_or(values: &[String]) -> String {
	match values {
		[] => String::new(),
		[only] => only.clone(),
		[init @ .., last] => format!("{} or {}", init.join(", "), last),
	}
}
