pub mod config;
pub mod dataset;
pub mod error;
pub mod query;
pub mod report;

pub use dataset::{Dataset, Record};
pub use error::{LoadError, QueryError};
