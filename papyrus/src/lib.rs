pub mod error;
pub mod query;
pub mod record;
pub mod schema;
pub mod storage;
pub mod store;
pub mod validation;

pub use error::{PapyrusError, Result};
pub use query::{Operation, Query, QueryResult};
pub use record::{Record, RecordSet, SortDirection};
pub use schema::{FileDefinition, KeyKind, PrimaryKey, SchemaRegistry, StoreConfig};
pub use store::{
    Collection, Condition, DeleteOutcome, FetchOptions, Fetched, InsertOutcome, Sort, Store,
    UpdateOutcome,
};
