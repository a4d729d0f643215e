pub mod memory;
pub mod qdrant;
pub mod records;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

use serde::Serialize;

use campus_domain::RecordId;

/// One nearest-neighbour answer. `similarity` is the backend's raw cosine score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexHit {
	pub record_id: RecordId,
	pub similarity: f32,
}
