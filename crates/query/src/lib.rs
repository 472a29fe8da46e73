//! Query execution: filters records from a `RecordStore`, folds them into
//! `DataSeries` and packages the result as an `AnalyticsResult`.

pub mod error;
pub mod executor;
pub mod filter;
pub mod memory;
pub mod store;
pub mod value;

pub use error::QueryError;
pub use executor::{CancellationFlag, QueryExecutor};
pub use filter::{DateRange, FilterPredicate};
pub use memory::MemoryRecordStore;
pub use store::{FetchRequest, FieldCatalog, Record, RecordStore};
