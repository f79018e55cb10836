use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const POSITION_COLUMN: &str = "position";
pub const VECTOR_COLUMN: &str = "vector";
pub const DISTANCE_COLUMN: &str = "_distance";

/// One row per chunk: its position in the chunk file and its embedding.
pub fn build_index_schema(dim: usize) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(POSITION_COLUMN, DataType::Int32, false),
		Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32), true),
	]))
}

pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
	]))
}

/// Vector width declared by an index table schema.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
	match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
		DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dim_is_read_back_from_schema() {
		assert_eq!(vector_dim(&build_index_schema(384)), Some(384));
		assert_eq!(vector_dim(&build_meta_schema()), None);
	}
}
