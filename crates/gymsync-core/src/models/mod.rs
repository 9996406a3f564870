//! Data models for gymsync

mod report;
mod row;
mod settings;
mod table;

pub use report::{SyncKind, SyncReport};
pub use row::{Row, SqlValue, DELETED_AT_COLUMN, ID_COLUMN, UPDATED_AT_COLUMN};
pub use settings::{Credentials, REMOTE_TOKEN_ENV, REMOTE_URL_ENV};
pub use table::CatalogTable;
