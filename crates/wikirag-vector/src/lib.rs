//! LanceDB-backed vector index: built once from the chunk file, then opened
//! read-only for nearest-neighbour search.

pub mod fingerprint;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use fingerprint::IndexFingerprint;
pub use search::LanceVectorIndex;
pub use writer::LanceIndexWriter;
