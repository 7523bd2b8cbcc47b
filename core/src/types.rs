//! Response schemas for the operations that unwrap a single field.
//!
//! Operations returning whole sheets (`get`, `keys`, `search`, `search_or`)
//! hand back `serde_json::Value` because the row shape is defined by the
//! spreadsheet, not by the API.

use serde::{Deserialize, Serialize};

/// `POST /` answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub created: u64,
}

/// `PATCH|PUT /{column}/{value}` and `/batch_update` answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Updated {
    pub updated: u64,
}

/// `DELETE /{column}/{value}` answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: u64,
}

/// `GET /name` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentName {
    pub name: String,
}

/// `GET /count` answer. Excludes the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCount {
    pub rows: u64,
}

/// Verb used for updates. `Patch` touches only the given columns; `Put`
/// clears every column not given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMethod {
    #[default]
    Patch,
    Put,
}
