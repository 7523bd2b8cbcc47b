//! Blocking client for the SheetDB spreadsheet API.
//!
//! # Overview
//! `SheetDb` maps each API operation (get, keys, name, count, search,
//! search_or, create, update, batch_update, delete) to one HTTP request
//! against `https://sheetdb.io/api/v1/{api_id}` and decodes the JSON answer.
//!
//! # Design
//! - Requests are built as plain `HttpRequest` data by `Connection`; only a
//!   `Transport` performs I/O, so every operation can be inspected without a
//!   network (`build_*`) or fed a recorded answer (`parse_*`).
//! - `SheetDb` builds a fresh `Connection` per call and keeps no per-call
//!   state.
//! - Failures are typed (`ApiError`): transport, HTTP status, undecodable
//!   body, empty body, or missing field.
//!
//! ```no_run
//! use sheetdb_core::{SheetDb, UpdateMethod};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), sheetdb_core::ApiError> {
//! let db = SheetDb::new("58f61be4dda40", None);
//! let created = db.create(&[json!({"id": "3", "name": "Cid"})])?;
//! let updated = db.update("id", "3", &json!({"name": "Cyd"}), UpdateMethod::Patch)?;
//! let rows = db.search([("name", "cyd")], false)?;
//! println!("{created} created, {updated} updated, found {rows}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod form;
pub mod http;
pub mod transport;
pub mod types;

pub use client::{SheetDb, BASE_URL};
pub use connection::{Connection, QueryParams};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{Created, Deleted, DocumentName, RowCount, UpdateMethod, Updated};
