//! SheetDB API facade.
//!
//! # Design
//! `SheetDb` holds the api_id, the base URL, the optional sheet name and a
//! `Transport`. Every operation builds a fresh `Connection` for its target
//! URL, so no query parameters survive from one call to the next and the
//! facade can be shared between threads when its transport can.
//!
//! Each operation comes in three forms, mirroring the request/response
//! split used throughout the crate:
//! - `build_*` produces the `HttpRequest` without any I/O,
//! - `parse_*` interprets an `HttpResponse`,
//! - the plain method runs both around one `Transport::execute`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::connection::{decode_json, Connection};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Created, Deleted, DocumentName, RowCount, UpdateMethod, Updated};

/// Public endpoint every api_id lives under.
pub const BASE_URL: &str = "https://sheetdb.io/api/v1/";

/// Query key controlling case-sensitive search.
pub const CASE_SENSITIVE_PARAM: &str = "casesensitive";

#[derive(Debug, Clone)]
pub struct SheetDb<T = UreqTransport> {
    api_id: String,
    base_url: String,
    sheet: Option<String>,
    transport: T,
}

impl SheetDb<UreqTransport> {
    /// Client for `api_id` on the public endpoint, optionally bound to one
    /// sheet of a multi-sheet document.
    pub fn new(api_id: &str, sheet: Option<&str>) -> Self {
        Self::with_transport(api_id, sheet, UreqTransport::new())
    }
}

impl<T: Transport> SheetDb<T> {
    pub fn with_transport(api_id: &str, sheet: Option<&str>, transport: T) -> Self {
        Self {
            api_id: api_id.to_string(),
            base_url: BASE_URL.to_string(),
            sheet: sheet.map(str::to_string),
            transport,
        }
    }

    /// Replaces the public endpoint, e.g. with a local mock server. The
    /// api_id is appended after exactly one slash.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = format!("{}/", base_url.trim_end_matches('/'));
        self
    }

    pub fn api_id(&self) -> &str {
        &self.api_id
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Connection targeting `base + api_id + suffix`.
    fn connection(&self, suffix: &str) -> Connection {
        Connection::new(
            format!("{}{}{}", self.base_url, self.api_id, suffix),
            self.sheet.clone(),
        )
    }

    // -----------------------------------------------------------------------
    // Request building
    // -----------------------------------------------------------------------

    pub fn build_get(&self) -> HttpRequest {
        self.connection("").build_request(HttpMethod::Get, &no_data())
    }

    pub fn build_keys(&self) -> HttpRequest {
        self.connection("/keys").build_request(HttpMethod::Get, &no_data())
    }

    pub fn build_name(&self) -> HttpRequest {
        self.connection("/name").build_request(HttpMethod::Get, &no_data())
    }

    pub fn build_count(&self) -> HttpRequest {
        self.connection("/count").build_request(HttpMethod::Get, &no_data())
    }

    /// Rows matching every condition in `query`. `casesensitive` is always
    /// sent, whatever its value.
    pub fn build_search<I, K, V>(&self, query: I, case_sensitive: bool) -> HttpRequest
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.search_request("/search", query, case_sensitive)
    }

    /// Rows matching any condition in `query`.
    pub fn build_search_or<I, K, V>(&self, query: I, case_sensitive: bool) -> HttpRequest
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.search_request("/search_or", query, case_sensitive)
    }

    fn search_request<I, K, V>(&self, suffix: &str, query: I, case_sensitive: bool) -> HttpRequest
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut conn = self.connection(suffix);
        conn.add_to_query_params(query);
        conn.add_to_query_params([(CASE_SENSITIVE_PARAM, case_sensitive)]);
        conn.build_request(HttpMethod::Get, &no_data())
    }

    /// Appends rows. `data` is usually a sequence of row objects; a single
    /// object creates one row.
    pub fn build_create<S: Serialize + ?Sized>(&self, data: &S) -> Result<HttpRequest, ApiError> {
        let data = to_value(data)?;
        Ok(self.connection("").build_request(HttpMethod::Post, &data))
    }

    /// Updates rows where `column` equals `value`. The row object is sent
    /// wrapped in a one-element sequence.
    pub fn build_update<S: Serialize + ?Sized>(
        &self,
        column: &str,
        value: &str,
        data: &S,
        method: UpdateMethod,
    ) -> Result<HttpRequest, ApiError> {
        let data = Value::Array(vec![to_value(data)?]);
        Ok(self
            .connection(&format!("/{column}/{value}"))
            .build_request(update_verb(method), &data))
    }

    /// Updates several row sets at once. `data` is sent as given.
    pub fn build_batch_update<S: Serialize + ?Sized>(
        &self,
        data: &S,
        method: UpdateMethod,
    ) -> Result<HttpRequest, ApiError> {
        let data = to_value(data)?;
        Ok(self
            .connection("/batch_update")
            .build_request(update_verb(method), &data))
    }

    pub fn build_delete(&self, column: &str, value: &str) -> HttpRequest {
        self.connection(&format!("/{column}/{value}"))
            .build_request(HttpMethod::Delete, &no_data())
    }

    // -----------------------------------------------------------------------
    // Response parsing
    // -----------------------------------------------------------------------

    pub fn parse_get(&self, response: HttpResponse) -> Result<Value, ApiError> {
        decode_json(&response)
    }

    pub fn parse_keys(&self, response: HttpResponse) -> Result<Value, ApiError> {
        decode_json(&response)
    }

    pub fn parse_search(&self, response: HttpResponse) -> Result<Value, ApiError> {
        decode_json(&response)
    }

    pub fn parse_search_or(&self, response: HttpResponse) -> Result<Value, ApiError> {
        decode_json(&response)
    }

    pub fn parse_name(&self, response: HttpResponse) -> Result<String, ApiError> {
        unwrap_field::<DocumentName>(&response, "name").map(|d| d.name)
    }

    pub fn parse_count(&self, response: HttpResponse) -> Result<u64, ApiError> {
        unwrap_field::<RowCount>(&response, "rows").map(|c| c.rows)
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<u64, ApiError> {
        unwrap_field::<Created>(&response, "created").map(|c| c.created)
    }

    pub fn parse_update(&self, response: HttpResponse) -> Result<u64, ApiError> {
        unwrap_field::<Updated>(&response, "updated").map(|u| u.updated)
    }

    pub fn parse_batch_update(&self, response: HttpResponse) -> Result<u64, ApiError> {
        unwrap_field::<Updated>(&response, "updated").map(|u| u.updated)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<u64, ApiError> {
        unwrap_field::<Deleted>(&response, "deleted").map(|d| d.deleted)
    }

    // -----------------------------------------------------------------------
    // Round trips
    // -----------------------------------------------------------------------

    /// Every row of the sheet.
    pub fn get(&self) -> Result<Value, ApiError> {
        self.parse_get(self.send(&self.build_get())?)
    }

    /// Column names of the sheet.
    pub fn keys(&self) -> Result<Value, ApiError> {
        self.parse_keys(self.send(&self.build_keys())?)
    }

    /// Name of the spreadsheet document.
    pub fn name(&self) -> Result<String, ApiError> {
        self.parse_name(self.send(&self.build_name())?)
    }

    /// Number of data rows.
    pub fn count(&self) -> Result<u64, ApiError> {
        self.parse_count(self.send(&self.build_count())?)
    }

    pub fn search<I, K, V>(&self, query: I, case_sensitive: bool) -> Result<Value, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.parse_search(self.send(&self.build_search(query, case_sensitive))?)
    }

    pub fn search_or<I, K, V>(&self, query: I, case_sensitive: bool) -> Result<Value, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.parse_search_or(self.send(&self.build_search_or(query, case_sensitive))?)
    }

    /// Number of rows created.
    pub fn create<S: Serialize + ?Sized>(&self, data: &S) -> Result<u64, ApiError> {
        self.parse_create(self.send(&self.build_create(data)?)?)
    }

    /// Number of rows updated.
    pub fn update<S: Serialize + ?Sized>(
        &self,
        column: &str,
        value: &str,
        data: &S,
        method: UpdateMethod,
    ) -> Result<u64, ApiError> {
        self.parse_update(self.send(&self.build_update(column, value, data, method)?)?)
    }

    /// Number of rows updated.
    pub fn batch_update<S: Serialize + ?Sized>(
        &self,
        data: &S,
        method: UpdateMethod,
    ) -> Result<u64, ApiError> {
        self.parse_batch_update(self.send(&self.build_batch_update(data, method)?)?)
    }

    /// Number of rows deleted.
    pub fn delete(&self, column: &str, value: &str) -> Result<u64, ApiError> {
        self.parse_delete(self.send(&self.build_delete(column, value))?)
    }

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        self.transport.execute(request)
    }
}

fn no_data() -> Value {
    Value::Array(Vec::new())
}

fn update_verb(method: UpdateMethod) -> HttpMethod {
    match method {
        UpdateMethod::Patch => HttpMethod::Patch,
        UpdateMethod::Put => HttpMethod::Put,
    }
}

fn to_value<S: Serialize + ?Sized>(data: &S) -> Result<Value, ApiError> {
    serde_json::to_value(data).map_err(|e| ApiError::SerializationError(e.to_string()))
}

/// Decodes `response` into schema `S` after checking that `field` is present.
fn unwrap_field<S: DeserializeOwned>(
    response: &HttpResponse,
    field: &'static str,
) -> Result<S, ApiError> {
    let value = decode_json(response)?;
    if is_falsy(&value) {
        warn!(field, "empty response");
        return Err(ApiError::EmptyResponse);
    }
    if value.get(field).map_or(true, Value::is_null) {
        warn!(field, "response is missing expected field");
        return Err(ApiError::MissingField(field));
    }
    serde_json::from_value(value).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// JSON values the remote API uses to signal "nothing here". Objects are
/// never falsy, even when empty.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => false,
    }
}
