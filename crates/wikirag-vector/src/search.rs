use anyhow::{anyhow, Result};
use arrow_array::{Float32Array, Int32Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::path::Path;

use wikirag_core::error::Error;
use wikirag_core::traits::VectorIndex;
use wikirag_core::types::Neighbor;

use crate::fingerprint::IndexFingerprint;
use crate::schema::{vector_dim, DISTANCE_COLUMN, POSITION_COLUMN};
use crate::table;

/// Read side of the index: exact squared-L2 nearest neighbours over a LanceDB table.
/// Owns a runtime so it can sit behind the synchronous [`VectorIndex`] trait.
pub struct LanceVectorIndex { rt: tokio::runtime::Runtime, table: Table, dim: usize, size: usize, fingerprint: Option<IndexFingerprint> }

impl LanceVectorIndex {
	pub fn open(db_path: &Path, table_name: &str) -> Result<Self> {
		if !db_path.exists() { return Err(Error::NotFound(format!("index directory {}", db_path.display())).into()); }
		let rt = tokio::runtime::Runtime::new()?;
		let (table, dim, size, fingerprint) = rt.block_on(async {
			let db = table::open_db(&db_path.to_string_lossy()).await?;
			if !table::table_exists(&db, table_name).await? {
				return Err(anyhow::Error::from(Error::NotFound(format!("index table '{}' in {}", table_name, db_path.display()))));
			}
			let t = db.open_table(table_name).execute().await?;
			let schema = t.schema().await?;
			let dim = vector_dim(&schema).ok_or_else(|| anyhow!("table '{}' has no fixed-size vector column", table_name))?;
			let size = t.count_rows(None).await?;
			let fingerprint = IndexFingerprint::from_entries(&table::read_meta(&db).await?);
			Ok((t, dim, size, fingerprint))
		})?;
		tracing::debug!("Opened index '{}' ({} vectors, dim={})", table_name, size, dim);
		Ok(Self { rt, table, dim, size, fingerprint })
	}

	/// Build metadata written alongside the index, if present.
	pub fn fingerprint(&self) -> Option<&IndexFingerprint> { self.fingerprint.as_ref() }

	async fn search_async(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
		let mut stream = self.table.vector_search(query.to_vec())?.distance_type(DistanceType::L2).limit(k).execute().await?;
		let mut hits = Vec::new();
		while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
			let positions = batch.column_by_name(POSITION_COLUMN).and_then(|c| c.as_any().downcast_ref::<Int32Array>()).ok_or_else(|| anyhow!("{} column missing", POSITION_COLUMN))?;
			let distances = batch.column_by_name(DISTANCE_COLUMN).and_then(|c| c.as_any().downcast_ref::<Float32Array>()).ok_or_else(|| anyhow!("{} column missing", DISTANCE_COLUMN))?;
			for i in 0..batch.num_rows() {
				// Negative positions cannot address a chunk; treat them like any other bad hit.
				let Ok(position) = usize::try_from(positions.value(i)) else { continue };
				hits.push(Neighbor { distance: distances.value(i), position });
			}
		}
		hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
		hits.truncate(k);
		Ok(hits)
	}
}

impl VectorIndex for LanceVectorIndex {
	fn dim(&self) -> usize { self.dim }
	fn size(&self) -> usize { self.size }

	fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
		if query.len() != self.dim {
			return Err(Error::ArtifactMismatch(format!("query vector has dimension {}, index expects {}", query.len(), self.dim)).into());
		}
		if k == 0 || self.size == 0 { return Ok(vec![]); }
		self.rt.block_on(self.search_async(query, k))
	}
}
