//! A target URL plus query parameters, turned into one request at a time.
//!
//! # Design
//! `build_request` is pure: it derives the final URL (sheet injected, query
//! string appended) without touching the connection, which is what `SheetDb`
//! relies on. `make_request` keeps the stateful contract instead: it writes
//! the sheet into the stored parameters and the query string into the stored
//! URL before executing, so the rewritten URL stays observable via `url()`.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::form;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, FORM_CONTENT_TYPE};
use crate::transport::Transport;

/// Query parameters by name. Values are flattened like request bodies.
pub type QueryParams = BTreeMap<String, Value>;

/// Query key carrying the sheet (tab) name.
pub const SHEET_PARAM: &str = "sheet";

#[derive(Debug, Clone)]
pub struct Connection {
    url: String,
    query_params: QueryParams,
    sheet: Option<String>,
}

impl Connection {
    pub fn new(url: impl Into<String>, sheet: Option<String>) -> Self {
        Self {
            url: url.into(),
            query_params: QueryParams::new(),
            sheet,
        }
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    pub fn set_query_params(&mut self, params: QueryParams) {
        self.query_params = params;
    }

    pub fn query_params(&self) -> &QueryParams {
        &self.query_params
    }

    /// Merges `params` into the current set. On a key collision the new value
    /// wins.
    pub fn add_to_query_params<I, K, V>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.query_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    pub fn reset_query_params(&mut self) {
        self.query_params.clear();
    }

    /// Builds the request for `method` with `data` as the form body, leaving
    /// the connection untouched.
    pub fn build_request(&self, method: HttpMethod, data: &Value) -> HttpRequest {
        let params = self.effective_params();
        describe(method, with_query(&self.url, &params), data)
    }

    /// Executes `method` against the stored URL and decodes the JSON body.
    ///
    /// Unlike `build_request` this commits the sheet parameter and the query
    /// string to the connection first, so `url()` afterwards returns the URL
    /// that was actually requested.
    pub fn make_request<T: Transport>(
        &mut self,
        transport: &T,
        method: HttpMethod,
        data: &Value,
    ) -> Result<Value, ApiError> {
        self.query_params = self.effective_params();
        self.url = with_query(&self.url, &self.query_params);

        let request = describe(method, self.url.clone(), data);
        debug!(%method, url = %request.url, "sending request");
        let response = transport.execute(&request)?;
        decode_json(&response)
    }

    fn effective_params(&self) -> QueryParams {
        let mut params = self.query_params.clone();
        if let Some(sheet) = self.sheet.as_deref().filter(|s| !s.is_empty()) {
            params.insert(SHEET_PARAM.to_string(), Value::String(sheet.to_string()));
        }
        params
    }
}

fn describe(method: HttpMethod, url: String, data: &Value) -> HttpRequest {
    HttpRequest {
        method,
        url,
        headers: vec![("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string())],
        body: form::encode_data(data),
    }
}

fn with_query(url: &str, params: &QueryParams) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query = form::encode(params.iter().map(|(k, v)| (k.as_str(), v)));
    format!("{url}?{query}")
}

/// Checks the status and decodes the body as JSON of any shape.
pub fn decode_json(response: &HttpResponse) -> Result<Value, ApiError> {
    if !response.is_success() {
        if response.status == 404 {
            return Err(ApiError::NotFound);
        }
        return Err(ApiError::HttpError {
            status: response.status,
            body: response.body.clone(),
        });
    }
    serde_json::from_str(&response.body)
        .map_err(|e| ApiError::DeserializationError(e.to_string()))
}
