//! Place names the dataset knows about, and how states and regions expand to its cities.

const STATE_CITIES: &[(&str, &[&str])] = &[
	("Delhi", &["Delhi"]),
	("Maharashtra", &["Mumbai", "Pune", "Nagpur"]),
	("Tamil Nadu", &["Chennai", "Vellore"]),
	("Karnataka", &["Bangalore"]),
	("Telangana", &["Hyderabad"]),
	("West Bengal", &["Kolkata"]),
	("Gujarat", &["Ahmedabad"]),
	("Uttarakhand", &["Roorkee"]),
	("Andhra Pradesh", &[]),
];
const REGION_CITIES: &[(&str, &[&str])] = &[
	("North", &["Delhi", "Roorkee"]),
	("South", &["Chennai", "Bangalore", "Hyderabad", "Vellore"]),
	("West", &["Mumbai", "Pune", "Ahmedabad", "Nagpur"]),
	("East", &["Kolkata"]),
	("Central", &[]),
];
const STATE_VARIANTS: &[(&str, &str)] = &[
	("maharastra", "Maharashtra"),
	("uttaranchal", "Uttarakhand"),
	("andharapradesh", "Andhra Pradesh"),
	("bengal", "West Bengal"),
];
const CITY_VARIANTS: &[(&str, &str)] = &[
	("bengaluru", "Bangalore"),
	("bombay", "Mumbai"),
	("madras", "Chennai"),
	("calcutta", "Kolkata"),
	("newdelhi", "Delhi"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Place {
	City(String),
	State { name: &'static str, cities: &'static [&'static str] },
	Region { name: &'static str, cities: &'static [&'static str] },
}
impl Place {
	/// Cities a filter on this place should accept. Empty when the dataset has none there.
	pub fn cities(&self) -> Vec<String> {
		match self {
			Self::City(city) => vec![city.clone()],
			Self::State { cities, .. } | Self::Region { cities, .. } =>
				cities.iter().map(|city| city.to_string()).collect(),
		}
	}
}

pub fn known_cities() -> Vec<&'static str> {
	let mut cities: Vec<&'static str> =
		STATE_CITIES.iter().flat_map(|(_, cities)| cities.iter().copied()).collect();

	cities.sort_unstable();
	cities.dedup();

	cities
}

/// Resolves a state name, tolerating spacing, underscores and common misspellings.
pub fn canonical_state(raw: &str) -> Option<&'static str> {
	let key = squash(raw);

	if key.is_empty() {
		return None;
	}
	if let Some((_, state)) = STATE_VARIANTS.iter().find(|(variant, _)| *variant == key) {
		return Some(*state);
	}

	STATE_CITIES.iter().map(|(state, _)| *state).find(|state| squash(state) == key)
}

pub fn cities_for_state(raw: &str) -> Option<&'static [&'static str]> {
	let state = canonical_state(raw)?;

	STATE_CITIES.iter().find(|(name, _)| *name == state).map(|(_, cities)| *cities)
}

pub fn canonical_region(raw: &str) -> Option<&'static str> {
	let key = squash(raw);
	let key = key.strip_suffix("india").unwrap_or(&key);

	REGION_CITIES.iter().map(|(region, _)| *region).find(|region| squash(region) == key)
}

pub fn cities_for_region(raw: &str) -> Option<&'static [&'static str]> {
	let region = canonical_region(raw)?;

	REGION_CITIES.iter().find(|(name, _)| *name == region).map(|(_, cities)| *cities)
}

/// City names keep the dataset spelling when known and are title-cased otherwise.
pub fn canonical_city(raw: &str) -> Option<String> {
	let key = squash(raw);

	if key.is_empty() {
		return None;
	}
	if let Some((_, city)) = CITY_VARIANTS.iter().find(|(variant, _)| *variant == key) {
		return Some(city.to_string());
	}
	if let Some(city) = known_cities().into_iter().find(|city| squash(city) == key) {
		return Some(city.to_string());
	}

	Some(crate::college::title_case(raw))
}

/// Resolves a place mention. A name that is both a city and a state (`Delhi`) resolves as the
/// city, and a state wins over a region.
pub fn resolve_place(raw: &str) -> Option<Place> {
	let key = squash(raw);

	if key.is_empty() {
		return None;
	}
	if let Some(city) = known_cities().into_iter().find(|city| squash(city) == key) {
		return Some(Place::City(city.to_string()));
	}
	if let Some(name) = canonical_state(raw) {
		let cities = cities_for_state(name).unwrap_or_default();

		return Some(Place::State { name, cities });
	}
	if let Some(name) = canonical_region(raw) {
		let cities = cities_for_region(name).unwrap_or_default();

		return Some(Place::Region { name, cities });
	}

	canonical_city(raw).map(Place::City)
}

fn squash(raw: &str) -> String {
	raw.chars()
		.filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
		.flat_map(char::to_lowercase)
		.collect()
}
