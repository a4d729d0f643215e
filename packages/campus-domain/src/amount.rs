//! Money amounts as they appear in Indian college queries and datasets.
//!
//! Everything is normalized to whole rupees: `10 lakhs`, `₹10L`, `10,00,000` and `1000000` all
//! parse to the same value.

use std::sync::LazyLock;

use regex::Regex;

pub const THOUSAND: f64 = 1_000.0;
pub const LAKH: f64 = 100_000.0;
pub const CRORE: f64 = 10_000_000.0;

const AMOUNT_PATTERN: &str = r"(?i)^(?:₹|rs\.?|inr)?\s*(\d[\d,]*(?:\.\d+)?)\s*(k|thousand|l|lakhs?|lacs?|lpa|cr|crores?)?\s*(?:rupees|rs\.?|inr|per annum|p\.?a\.?)?$";

static AMOUNT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(AMOUNT_PATTERN).ok());

/// Parses a rupee amount, expanding shorthand units. Returns `None` for anything that is not a
/// single non-negative finite amount.
pub fn parse_amount(raw: &str) -> Option<f64> {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return None;
	}

	let caps = AMOUNT_RE.as_ref()?.captures(trimmed)?;
	let digits = caps.get(1)?.as_str().replace(',', "");
	let number: f64 = digits.parse().ok()?;
	let multiplier = caps.get(2).map(|unit| unit_multiplier(unit.as_str())).unwrap_or(1.0);
	let value = number * multiplier;

	(value.is_finite() && value >= 0.0).then_some(value)
}

/// Renders an amount the way users write it back: lakhs or crores above one lakh.
pub fn format_rupees(value: f64) -> String {
	if value >= CRORE {
		format!("₹{:.1}Cr", value / CRORE)
	} else if value >= LAKH {
		format!("₹{:.1}L", value / LAKH)
	} else {
		format!("₹{value:.0}")
	}
}

fn unit_multiplier(unit: &str) -> f64 {
	match unit.to_ascii_lowercase().as_str() {
		"k" | "thousand" => THOUSAND,
		"l" | "lakh" | "lakhs" | "lac" | "lacs" | "lpa" => LAKH,
		"cr" | "crore" | "crores" => CRORE,
		_ => 1.0,
	}
}
