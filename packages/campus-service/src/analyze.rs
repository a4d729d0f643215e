use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
	CampusService,
	retry::{self, AttemptFailure},
};
use campus_domain::{
	Attribute, Bound, Constraint, NumericRange, Ownership, QueryFilter, amount,
	college::{canonical_course, canonical_exam},
	location,
};

const MAX_CATEGORICAL_BYTES: usize = 128;
const DEFAULT_CONFIDENCE: f32 = 0.5;

const SYSTEM_PROMPT: &str = "You extract search filters from a student's college query. \
Return one JSON object with keys filters, cleaned_query, intent and confidence, following the schema below. \
Rules: \
Use only the filter keys in the schema and omit any filter the query does not state. \
Convert money to rupees: 1 lakh = 100000, 1 crore = 10000000, 1k = 1000. \
Numeric filters use an operator (lt, lte, gt, gte, eq) and a value, or min and max for a range. \
under / below / less than means lt; up to / at most / within means lte; above / more than means gt; at least means gte. \
A lower ranking number is better, so 'top 10' means ranking lte 10. \
college_type is private or government. \
Put a state in state and a region of India (north, south, east, west, central) in region, never in city. \
cleaned_query is the query with the extracted constraints removed, keeping descriptive wishes such as good placements. \
confidence is a number from 0 to 1 for how sure you are of the filters.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
	EmptyQuery,
	ProviderFailure,
	MalformedOutput,
	LowConfidence,
}
impl DegradedReason {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::EmptyQuery => "empty_query",
			Self::ProviderFailure => "provider_failure",
			Self::MalformedOutput => "malformed_output",
			Self::LowConfidence => "low_confidence",
		}
	}
}

/// A filter field the model produced that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedField {
	pub field: String,
	pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnalysis {
	pub original_query: String,
	pub filter: QueryFilter,
	pub residual_query: String,
	pub intent: Option<String>,
	pub confidence: f32,
	pub valid: bool,
	pub degraded_reason: Option<DegradedReason>,
	pub dropped: Vec<DroppedField>,
}
impl QueryAnalysis {
	/// Pure semantic fallback: no filter, the query itself as residual.
	pub fn degraded(query: &str, reason: DegradedReason) -> Self {
		Self {
			original_query: query.to_string(),
			filter: QueryFilter::new(),
			residual_query: query.to_string(),
			intent: None,
			confidence: 0.0,
			valid: false,
			degraded_reason: Some(reason),
			dropped: Vec::new(),
		}
	}

	/// Text for the semantic pass.
	pub fn semantic_text(&self) -> String {
		if self.filter.is_empty() {
			return self.original_query.clone();
		}
		if !self.residual_query.trim().is_empty() {
			return self.residual_query.clone();
		}
		if let Some(Constraint::OneOf(courses)) = self.filter.get(Attribute::Course)
			&& let Some(course) = courses.first()
		{
			return format!("{course} colleges");
		}

		self.original_query.clone()
	}
}

impl CampusService {
	/// Turns a free-text query into a filter and residual query. Never fails: provider
	/// problems, unusable output and low confidence all fall back to a degraded analysis.
	pub async fn analyze(&self, query: &str) -> QueryAnalysis {
		if query.trim().is_empty() {
			return QueryAnalysis::degraded(query, DegradedReason::EmptyQuery);
		}

		let max_chars = self.cfg.extraction.max_query_chars as usize;
		let prompt_query: String = query.chars().take(max_chars).collect();
		let messages = build_messages(&prompt_query);
		let policy = self.extractor_retry();
		let llm_cfg = &self.cfg.providers.llm_extractor;
		let outcome = retry::with_retry(&policy, "extract_filters", || {
			self.providers.extractor.extract(llm_cfg, &messages)
		})
		.await;
		let output = match outcome {
			Ok(output) => output,
			Err(err) => {
				let reason = match &err.last {
					AttemptFailure::Failed(
						campus_providers::Error::InvalidResponse { .. }
						| campus_providers::Error::SerdeJson(_),
					) => DegradedReason::MalformedOutput,
					_ => DegradedReason::ProviderFailure,
				};

				tracing::warn!(
					reason = reason.as_str(),
					attempts = err.attempts,
					error = %err.last,
					"Filter extraction degraded."
				);

				return QueryAnalysis::degraded(query, reason);
			},
		};

		match parse_extraction(query, &output, self.cfg.extraction.min_confidence) {
			Ok(analysis) => {
				for dropped in &analysis.dropped {
					tracing::debug!(field = %dropped.field, reason = dropped.reason, "Dropped filter field.");
				}

				analysis
			},
			Err(reason) => {
				tracing::warn!(reason = reason.as_str(), "Filter extraction degraded.");

				QueryAnalysis::degraded(query, reason)
			},
		}
	}
}

pub fn target_schema() -> Value {
	let numeric = serde_json::json!({
		"oneOf": [
			{
				"type": "object",
				"properties": {
					"operator": { "enum": ["lt", "lte", "gt", "gte", "eq"] },
					"value": { "type": "number" }
				},
				"required": ["operator", "value"]
			},
			{
				"type": "object",
				"properties": { "min": { "type": "number" }, "max": { "type": "number" } }
			}
		]
	});
	let categorical = serde_json::json!({
		"oneOf": [{ "type": "string" }, { "type": "array", "items": { "type": "string" } }]
	});

	serde_json::json!({
		"type": "object",
		"properties": {
			"filters": {
				"type": "object",
				"properties": {
					"city": categorical,
					"state": categorical,
					"region": categorical,
					"college_type": { "enum": ["private", "government"] },
					"course": categorical,
					"exam": categorical,
					"fees": numeric,
					"avg_package": numeric,
					"ranking": numeric
				},
				"additionalProperties": false
			},
			"cleaned_query": { "type": "string" },
			"intent": { "type": "string" },
			"confidence": { "type": "number", "minimum": 0, "maximum": 1 }
		},
		"required": ["filters", "cleaned_query", "confidence"]
	})
}

pub fn build_messages(query: &str) -> Vec<Value> {
	let system = format!("{SYSTEM_PROMPT}\nSchema:\n{}", target_schema());

	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": query }),
	]
}

/// Coerces model output into an analysis. Unusable fields are dropped one by one; only an
/// output that is not an object, or whose `filters` is not an object, is malformed as a whole.
pub fn parse_extraction(
	query: &str,
	output: &Value,
	min_confidence: f32,
) -> Result<QueryAnalysis, DegradedReason> {
	let object = output.as_object().ok_or(DegradedReason::MalformedOutput)?;
	let confidence = match object.get("confidence") {
		None | Some(Value::Null) => DEFAULT_CONFIDENCE,
		Some(value) => value
			.as_f64()
			.filter(|value| value.is_finite())
			.map(|value| value.clamp(0.0, 1.0) as f32)
			.ok_or(DegradedReason::MalformedOutput)?,
	};

	if confidence < min_confidence {
		return Err(DegradedReason::LowConfidence);
	}

	let filters = match object.get("filters") {
		None | Some(Value::Null) => Map::new(),
		Some(Value::Object(filters)) => filters.clone(),
		Some(_) => return Err(DegradedReason::MalformedOutput),
	};
	let mut builder = FilterBuilder::default();

	builder.apply(&filters);

	let residual_query = object
		.get("cleaned_query")
		.and_then(Value::as_str)
		.map(|text| text.trim().to_string())
		.unwrap_or_default();
	let intent = object
		.get("intent")
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|intent| !intent.is_empty())
		.map(str::to_string);

	Ok(QueryAnalysis {
		original_query: query.to_string(),
		filter: builder.filter,
		residual_query,
		intent,
		confidence,
		valid: true,
		degraded_reason: None,
		dropped: builder.dropped,
	})
}

#[derive(Default)]
struct FilterBuilder {
	filter: QueryFilter,
	dropped: Vec<DroppedField>,
}
impl FilterBuilder {
	fn apply(&mut self, filters: &Map<String, Value>) {
		let mut places: Vec<(&str, &Value)> = Vec::new();

		for (key, value) in filters {
			if value.is_null() {
				continue;
			}

			match key.as_str() {
				"city" | "state" | "region" | "location" => places.push((key.as_str(), value)),
				"college_type" | "ownership" | "type" => self.ownership(key, value),
				"course" | "stream" => self.categorical(key, value, Attribute::Course, canonical_course),
				"exam" | "entrance_exam" => self.categorical(key, value, Attribute::Exam, canonical_exam),
				"fees" | "fee" => self.numeric(key, value, Attribute::Fee, amount::parse_amount),
				"avg_package" | "package" | "placement" =>
					self.numeric(key, value, Attribute::AvgPackage, amount::parse_amount),
				"ranking" | "rank" => self.numeric(key, value, Attribute::Ranking, parse_plain_number),
				_ => self.reject(key, "unknown_attribute"),
			}
		}

		self.location(&places);
	}

	/// City beats state, state beats region. Lower-priority keys are ignored once a higher one
	/// yields cities.
	fn location(&mut self, places: &[(&str, &Value)]) {
		let priority = |key: &str| match key {
			"city" => 0,
			"location" => 1,
			"state" => 2,
			_ => 3,
		};
		let mut ordered = places.to_vec();

		ordered.sort_by_key(|(key, _)| priority(key));

		let mut chosen: Option<Vec<String>> = None;

		for (key, value) in ordered {
			if chosen.is_some() {
				self.reject(key, "superseded");

				continue;
			}

			let Some(names) = self.strings(key, value) else {
				continue;
			};
			let mut cities: Vec<String> = Vec::new();

			for name in names {
				let resolved: Option<Vec<String>> = match key {
					"state" => location::cities_for_state(&name)
						.map(|cities| cities.iter().map(|city| city.to_string()).collect()),
					"region" => location::cities_for_region(&name)
						.map(|cities| cities.iter().map(|city| city.to_string()).collect()),
					_ => location::resolve_place(&name).map(|place| place.cities()),
				};

				match resolved {
					Some(found) if !found.is_empty() => {
						for city in found {
							if !cities.contains(&city) {
								cities.push(city);
							}
						}
					},
					Some(_) => self.reject(key, "no_known_cities"),
					None => self.reject(key, "unknown_place"),
				}
			}

			if !cities.is_empty() {
				chosen = Some(cities);
			}
		}

		if let Some(cities) = chosen {
			self.filter.insert(Attribute::City, Constraint::OneOf(cities));
		}
	}

	fn ownership(&mut self, key: &str, value: &Value) {
		let Some(names) = self.strings(key, value) else {
			return;
		};
		let mut kinds: Vec<Ownership> = Vec::new();

		for name in names {
			match Ownership::parse(&name) {
				Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
				Some(_) => {},
				None => self.reject(key, "invalid_value"),
			}
		}

		if !kinds.is_empty() {
			let values = kinds.iter().map(|kind| kind.as_str().to_string()).collect();

			self.filter.insert(Attribute::Ownership, Constraint::OneOf(values));
		}
	}

	fn categorical(
		&mut self,
		key: &str,
		value: &Value,
		attribute: Attribute,
		canonical: fn(&str) -> Option<String>,
	) {
		let Some(names) = self.strings(key, value) else {
			return;
		};
		let mut values: Vec<String> = Vec::new();

		for name in names {
			if let Some(value) = canonical(&name)
				&& !values.iter().any(|existing| existing.eq_ignore_ascii_case(&value))
			{
				values.push(value);
			}
		}

		if values.is_empty() || !self.filter.insert(attribute, Constraint::OneOf(values)) {
			self.reject(key, "invalid_value");
		}
	}

	fn numeric(
		&mut self,
		key: &str,
		value: &Value,
		attribute: Attribute,
		parse: fn(&str) -> Option<f64>,
	) {
		match numeric_range(value, parse) {
			Ok(range) => {
				self.filter.insert(attribute, Constraint::Range(range));
			},
			Err(reason) => self.reject(key, reason),
		}
	}

	/// Accepts a string or an array of strings; unusable entries are dropped individually.
	fn strings(&mut self, key: &str, value: &Value) -> Option<Vec<String>> {
		let items: Vec<&Value> = match value {
			Value::Array(items) => items.iter().collect(),
			other => vec![other],
		};
		let mut out = Vec::new();

		for item in items {
			match item.as_str().map(str::trim) {
				Some(text) if !text.is_empty() && text.len() <= MAX_CATEGORICAL_BYTES =>
					out.push(text.to_string()),
				Some(text) if text.is_empty() => {},
				_ => self.reject(key, "invalid_value"),
			}
		}

		(!out.is_empty()).then_some(out)
	}

	fn reject(&mut self, key: &str, reason: &'static str) {
		self.dropped.push(DroppedField { field: key.to_string(), reason });
	}
}

fn numeric_range(value: &Value, parse: fn(&str) -> Option<f64>) -> Result<NumericRange, &'static str> {
	let number = |value: &Value| -> Option<f64> {
		match value {
			Value::Number(number) => number.as_f64(),
			Value::String(text) => parse(text),
			_ => None,
		}
	};

	match value {
		Value::Object(object) if object.contains_key("operator") => {
			let operator = object.get("operator").and_then(Value::as_str).ok_or("invalid_operator")?;
			let value = object.get("value").and_then(number).ok_or("invalid_value")?;
			let range = match operator.trim().to_ascii_lowercase().as_str() {
				"lt" | "<" => NumericRange::below(value),
				"lte" | "<=" => NumericRange::at_most(value),
				"gt" | ">" => NumericRange::above(value),
				"gte" | ">=" => NumericRange::at_least(value),
				"eq" | "=" | "==" => NumericRange::exactly(value),
				_ => return Err("invalid_operator"),
			};

			range.ok_or("invalid_value")
		},
		Value::Object(object) if object.contains_key("min") || object.contains_key("max") => {
			let bound = |key: &str| -> Result<Option<Bound>, &'static str> {
				match object.get(key) {
					None | Some(Value::Null) => Ok(None),
					Some(raw) => number(raw)
						.map(|value| Some(Bound { value, inclusive: true }))
						.ok_or("invalid_value"),
				}
			};
			let min = bound("min")?;
			let max = bound("max")?;

			if let (Some(lo), Some(hi)) = (min, max)
				&& lo.value > hi.value
			{
				return Err("inverted_range");
			}

			NumericRange::new(min, max).ok_or("invalid_value")
		},
		Value::Number(_) | Value::String(_) =>
			number(value).and_then(NumericRange::exactly).ok_or("invalid_value"),
		_ => Err("invalid_value"),
	}
}

fn parse_plain_number(raw: &str) -> Option<f64> {
	raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}
