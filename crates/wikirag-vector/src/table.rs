//! LanceDB connection and housekeeping helpers.
//!
//! Provides the database open function, table creation from record batches,
//! and a small key/value meta table that stores the index build fingerprint.

use anyhow::{anyhow, Result};
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};
use std::collections::HashMap;
use std::sync::Arc;

use crate::schema::build_meta_schema;

pub const META_TABLE: &str = "meta";

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

/// Create `name` from `batches`, or as an empty table when there are none.
pub async fn create_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>, batches: Vec<RecordBatch>) -> Result<()> {
    if batches.is_empty() {
        conn.create_empty_table(name, schema).execute().await?;
        return Ok(());
    }
    let iter = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);
    conn.create_table(name, Box::new(iter)).execute().await?;
    Ok(())
}

pub async fn write_meta(conn: &Connection, entries: &[(&str, String)]) -> Result<()> {
    let keys: Vec<&str> = entries.iter().map(|(k, _)| *k).collect();
    let values: Vec<&str> = entries.iter().map(|(_, v)| v.as_str()).collect();
    let rb = RecordBatch::try_new(
        build_meta_schema(),
        vec![Arc::new(StringArray::from(keys)), Arc::new(StringArray::from(values))],
    )?;
    create_table(conn, META_TABLE, build_meta_schema(), vec![rb]).await
}

pub async fn read_meta(conn: &Connection) -> Result<HashMap<String, String>> {
    if !table_exists(conn, META_TABLE).await? { return Ok(HashMap::new()); }
    let t = conn.open_table(META_TABLE).execute().await?;
    let mut out = HashMap::new();
    let mut stream = t.query().execute().await?;
    while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
        let key = batch.column_by_name("key").and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("meta.key column missing"))?;
        let val = batch.column_by_name("value").and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("meta.value column missing"))?;
        for i in 0..batch.num_rows() {
            out.insert(key.value(i).to_string(), val.value(i).to_string());
        }
    }
    Ok(out)
}
