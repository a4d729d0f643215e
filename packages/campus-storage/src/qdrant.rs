pub const DENSE_VECTOR_NAME: &str = "dense";

use std::collections::{HashMap, HashSet};

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, Distance, GetPointsBuilder, PointId, PointStruct, Query,
		QueryPointsBuilder, UpsertPointsBuilder, Vector, VectorParamsBuilder, VectorsConfigBuilder,
		point_id::PointIdOptions,
	},
};
use serde_json::Value;

use crate::{Error, IndexHit, Result};
use campus_domain::{CollegeRecord, RecordId};

pub struct QdrantIndex {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantIndex {
	pub fn new(cfg: &campus_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection with a named cosine vector when it does not exist yet. Returns
	/// whether it was created.
	pub async fn ensure_collection(&self) -> Result<bool> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(false);
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
		);

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(vectors_config),
			)
			.await?;

		tracing::info!(collection = %self.collection, dim = self.vector_dim, "Created Qdrant collection.");

		Ok(true)
	}

	pub async fn existing_ids(&self, ids: &[RecordId]) -> Result<HashSet<RecordId>> {
		if ids.is_empty() {
			return Ok(HashSet::new());
		}

		let point_ids: Vec<PointId> = ids.iter().map(|id| PointId::from(id.to_string())).collect();
		let response = self
			.client
			.get_points(
				GetPointsBuilder::new(self.collection.clone(), point_ids)
					.with_payload(false)
					.with_vectors(false),
			)
			.await?;

		Ok(response.result.iter().filter_map(|point| point.id.as_ref().and_then(point_id_to_uuid)).collect())
	}

	/// Writes one point per record, keyed by record id so repeated runs overwrite in place.
	pub async fn upsert(&self, records: &[CollegeRecord], vectors: &[Vec<f32>]) -> Result<usize> {
		if records.len() != vectors.len() {
			return Err(Error::InvalidArgument(format!(
				"Got {} vectors for {} records.",
				vectors.len(),
				records.len()
			)));
		}
		if records.is_empty() {
			return Ok(0);
		}

		let mut points = Vec::with_capacity(records.len());

		for (record, vec) in records.iter().zip(vectors) {
			if vec.len() != self.vector_dim as usize {
				return Err(Error::InvalidArgument(format!(
					"Vector for {} has {} dimensions, expected {}.",
					record.name,
					vec.len(),
					self.vector_dim
				)));
			}

			let mut vectors_map = HashMap::new();

			vectors_map.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(vec.clone()));
			points.push(PointStruct::new(record.id.to_string(), vectors_map, record_payload(record)));
		}

		let count = points.len();

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
			.await?;

		Ok(count)
	}

	pub async fn nearest(&self, vector: &[f32], limit: u32) -> Result<Vec<IndexHit>> {
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.using(DENSE_VECTOR_NAME)
			.with_payload(false)
			.limit(limit as u64);
		let response = self.client.query(search).await?;
		let hits = response
			.result
			.iter()
			.filter_map(|point| {
				let record_id = point.id.as_ref().and_then(point_id_to_uuid)?;

				Some(IndexHit { record_id, similarity: point.score })
			})
			.collect();

		Ok(hits)
	}
}

fn record_payload(record: &CollegeRecord) -> Payload {
	let mut payload = Payload::new();
	let optional = |value: Option<&String>| value.cloned().map(Value::String).unwrap_or(Value::Null);

	payload.insert("record_id", record.id.to_string());
	payload.insert("name", record.name.clone());
	payload.insert("city", optional(record.city.as_ref()));
	payload.insert(
		"ownership",
		record.ownership.map(|o| Value::from(o.as_str())).unwrap_or(Value::Null),
	);
	payload.insert("course", optional(record.course.as_ref()));
	payload.insert("exam", optional(record.exam.as_ref()));
	payload.insert("fee", record.fee.map(Value::from).unwrap_or(Value::Null));
	payload.insert("avg_package", record.avg_package.map(Value::from).unwrap_or(Value::Null));
	payload.insert("ranking", record.ranking.map(Value::from).unwrap_or(Value::Null));
	payload.insert("content_hash", record.content_hash());

	payload
}

fn point_id_to_uuid(point_id: &PointId) -> Option<RecordId> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => RecordId::parse_str(id).ok(),
		_ => None,
	}
}
