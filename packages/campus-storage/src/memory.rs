use std::cmp::Ordering;

use crate::{Error, IndexHit, Result};
use campus_domain::RecordId;

/// Brute-force cosine index held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
	dim: usize,
	entries: Vec<(RecordId, Vec<f32>)>,
}
impl MemoryIndex {
	pub fn new(dim: u32) -> Self {
		Self { dim: dim as usize, entries: Vec::new() }
	}

	pub fn insert(&mut self, record_id: RecordId, vector: Vec<f32>) -> Result<()> {
		if vector.len() != self.dim {
			return Err(Error::InvalidArgument(format!(
				"Vector for {record_id} has {} dimensions, expected {}.",
				vector.len(),
				self.dim
			)));
		}

		match self.entries.iter_mut().find(|(id, _)| *id == record_id) {
			Some(entry) => entry.1 = vector,
			None => self.entries.push((record_id, vector)),
		}

		Ok(())
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Highest cosine first; equal scores keep insertion order.
	pub fn nearest(&self, vector: &[f32], limit: u32) -> Result<Vec<IndexHit>> {
		if vector.len() != self.dim {
			return Err(Error::InvalidArgument(format!(
				"Query vector has {} dimensions, expected {}.",
				vector.len(),
				self.dim
			)));
		}

		let mut hits: Vec<IndexHit> = self
			.entries
			.iter()
			.map(|(record_id, stored)| IndexHit {
				record_id: *record_id,
				similarity: cosine(vector, stored),
			})
			.collect();

		hits.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal));
		hits.truncate(limit as usize);

		Ok(hits)
	}
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
	let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
	let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let norm_b = b.iter().map(|y| y * y).sum::<f32>().sqrt();

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a * norm_b)
}
