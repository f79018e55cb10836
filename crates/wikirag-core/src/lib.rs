#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunk_store;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;
