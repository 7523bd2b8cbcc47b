use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub mod form;

pub type Row = Map<String, Value>;

#[derive(Clone, Debug)]
pub struct Sheet {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Clone, Debug)]
pub struct Spreadsheet {
    pub name: String,
    pub sheets: Vec<Sheet>,
}

pub type Db = Arc<RwLock<HashMap<String, Spreadsheet>>>;
type Params = Query<HashMap<String, String>>;
type Reply = Result<Json<Value>, StatusCode>;

/// api_id of the document served by `app()`.
pub const DEMO_API_ID: &str = "58f61be4dda40";

/// Document with two sheets: `Sheet1` (id, name, age; two rows) and
/// `Sheet2` (id, city; one row).
pub fn demo_spreadsheet() -> Spreadsheet {
    let row = |pairs: &[(&str, &str)]| -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    };
    Spreadsheet {
        name: "Demo".to_string(),
        sheets: vec![
            Sheet {
                title: "Sheet1".to_string(),
                columns: vec!["id".into(), "name".into(), "age".into()],
                rows: vec![
                    row(&[("id", "1"), ("name", "Alice"), ("age", "30")]),
                    row(&[("id", "2"), ("name", "Bob"), ("age", "25")]),
                ],
            },
            Sheet {
                title: "Sheet2".to_string(),
                columns: vec!["id".into(), "city".into()],
                rows: vec![row(&[("id", "1"), ("city", "Warsaw")])],
            },
        ],
    }
}

pub fn app() -> Router {
    app_with(HashMap::from([(DEMO_API_ID.to_string(), demo_spreadsheet())]))
}

pub fn app_with(documents: HashMap<String, Spreadsheet>) -> Router {
    let db: Db = Arc::new(RwLock::new(documents));
    Router::new()
        .route("/api/v1/{api_id}", get(list_rows).post(create_rows))
        .route("/api/v1/{api_id}/keys", get(keys))
        .route("/api/v1/{api_id}/name", get(name))
        .route("/api/v1/{api_id}/count", get(count))
        .route("/api/v1/{api_id}/search", get(search))
        .route("/api/v1/{api_id}/search_or", get(search_or))
        .route(
            "/api/v1/{api_id}/batch_update",
            patch(batch_patch).put(batch_put),
        )
        .route(
            "/api/v1/{api_id}/{column}/{value}",
            patch(patch_rows).put(put_rows).delete(delete_rows),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn sheet_index(doc: &Spreadsheet, params: &HashMap<String, String>) -> Result<usize, StatusCode> {
    match params.get("sheet") {
        Some(title) => doc
            .sheets
            .iter()
            .position(|s| &s.title == title)
            .ok_or(StatusCode::NOT_FOUND),
        None if doc.sheets.is_empty() => Err(StatusCode::NOT_FOUND),
        None => Ok(0),
    }
}

/// Runs `f` against the selected sheet under a read lock.
async fn read_sheet<F>(db: &Db, api_id: &str, params: &HashMap<String, String>, f: F) -> Reply
where
    F: FnOnce(&Spreadsheet, &Sheet) -> Value,
{
    let docs = db.read().await;
    let doc = docs.get(api_id).ok_or(StatusCode::NOT_FOUND)?;
    let idx = sheet_index(doc, params)?;
    Ok(Json(f(doc, &doc.sheets[idx])))
}

/// Runs `f` against the selected sheet under a write lock.
async fn write_sheet<F>(db: &Db, api_id: &str, params: &HashMap<String, String>, f: F) -> Reply
where
    F: FnOnce(&mut Sheet) -> Result<Value, StatusCode>,
{
    let mut docs = db.write().await;
    let doc = docs.get_mut(api_id).ok_or(StatusCode::NOT_FOUND)?;
    let idx = sheet_index(doc, params)?;
    f(&mut doc.sheets[idx]).map(Json)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell_matches(row: &Row, column: &str, expected: &str, case_sensitive: bool) -> bool {
    let actual = row.get(column).map(cell_text).unwrap_or_default();
    if case_sensitive {
        actual == expected
    } else {
        actual.to_lowercase() == expected.to_lowercase()
    }
}

/// Keeps only known columns and fills the missing ones with "".
fn normalise(columns: &[String], input: &Row) -> Row {
    columns
        .iter()
        .map(|c| {
            let cell = input.get(c).map(cell_text).unwrap_or_default();
            (c.clone(), Value::String(cell))
        })
        .collect()
}

/// Applies `changes` to `row`. PUT blanks every column not in `changes`.
fn apply_changes(columns: &[String], row: &mut Row, changes: &Row, replace: bool) {
    for column in columns {
        match changes.get(column) {
            Some(v) => {
                row.insert(column.clone(), Value::String(cell_text(v)));
            }
            None if replace => {
                row.insert(column.clone(), Value::String(String::new()));
            }
            None => {}
        }
    }
}

fn update_where(sheet: &mut Sheet, column: &str, value: &str, changes: &Row, replace: bool) -> u64 {
    let columns = sheet.columns.clone();
    let mut updated = 0;
    for row in sheet.rows.iter_mut().filter(|r| cell_matches(r, column, value, true)) {
        apply_changes(&columns, row, changes, replace);
        updated += 1;
    }
    updated
}

/// The `data` field of a form body as a list of row objects.
fn data_rows(body: &str) -> Result<Vec<Row>, StatusCode> {
    match form::decode(body).get("data") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_object().cloned().ok_or(StatusCode::BAD_REQUEST))
            .collect(),
        Some(Value::Object(row)) => Ok(vec![row.clone()]),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

async fn list_rows(
    State(db): State<Db>,
    Path(api_id): Path<String>,
    Query(params): Params,
) -> Reply {
    read_sheet(&db, &api_id, &params, |_, sheet| json!(sheet.rows)).await
}

async fn keys(
    State(db): State<Db>,
    Path(api_id): Path<String>,
    Query(params): Params,
) -> Reply {
    read_sheet(&db, &api_id, &params, |_, sheet| json!(sheet.columns)).await
}

async fn name(
    State(db): State<Db>,
    Path(api_id): Path<String>,
    Query(params): Params,
) -> Reply {
    read_sheet(&db, &api_id, &params, |doc, _| json!({ "name": doc.name })).await
}

async fn count(
    State(db): State<Db>,
    Path(api_id): Path<String>,
    Query(params): Params,
) -> Reply {
    read_sheet(&db, &api_id, &params, |_, sheet| json!({ "rows": sheet.rows.len() })).await
}

async fn search(
    State(db): State<Db>,
    Path(api_id): Path<String>,
    Query(params): Params,
) -> Reply {
    search_rows(&db, &api_id, &params, true).await
}

async fn search_or(
    State(db): State<Db>,
    Path(api_id): Path<String>,
    Query(params): Params,
) -> Reply {
    search_rows(&db, &api_id, &params, false).await
}

async fn search_rows(db: &Db, api_id: &str, params: &HashMap<String, String>, all: bool) -> Reply {
    let case_sensitive = matches!(
        params.get("casesensitive").map(String::as_str),
        Some("true" | "1")
    );
    let conditions: Vec<(&String, &String)> = params
        .iter()
        .filter(|(k, _)| k.as_str() != "sheet" && k.as_str() != "casesensitive")
        .collect();
    debug!(api_id, ?conditions, case_sensitive, all, "search");
    read_sheet(db, api_id, params, |_, sheet| {
        let hits: Vec<&Row> = sheet
            .rows
            .iter()
            .filter(|row| {
                let mut matches = conditions
                    .iter()
                    .map(|(column, value)| cell_matches(row, column, value, case_sensitive));
                if all {
                    matches.all(|m| m)
                } else {
                    matches.any(|m| m)
                }
            })
            .collect();
        json!(hits)
    })
    .await
}

async fn create_rows(
    State(db): State<Db>,
    Path(api_id): Path<String>,
    Query(params): Params,
    body: String,
) -> Reply {
    let rows = data_rows(&body)?;
    write_sheet(&db, &api_id, &params, |sheet| {
        let columns = sheet.columns.clone();
        sheet.rows.extend(rows.iter().map(|r| normalise(&columns, r)));
        Ok(json!({ "created": rows.len() }))
    })
    .await
}

async fn patch_rows(
    State(db): State<Db>,
    Path((api_id, column, value)): Path<(String, String, String)>,
    Query(params): Params,
    body: String,
) -> Reply {
    update_rows(&db, &api_id, &column, &value, &params, &body, false).await
}

async fn put_rows(
    State(db): State<Db>,
    Path((api_id, column, value)): Path<(String, String, String)>,
    Query(params): Params,
    body: String,
) -> Reply {
    update_rows(&db, &api_id, &column, &value, &params, &body, true).await
}

async fn update_rows(
    db: &Db,
    api_id: &str,
    column: &str,
    value: &str,
    params: &HashMap<String, String>,
    body: &str,
    replace: bool,
) -> Reply {
    let rows = data_rows(body)?;
    let changes = rows.first().ok_or(StatusCode::BAD_REQUEST)?;
    write_sheet(db, api_id, params, |sheet| {
        let updated = update_where(sheet, column, value, changes, replace);
        Ok(json!({ "updated": updated }))
    })
    .await
}

async fn batch_patch(
    State(db): State<Db>,
    Path(api_id): Path<String>,
    Query(params): Params,
    body: String,
) -> Reply {
    batch_update(&db, &api_id, &params, &body, false).await
}

async fn batch_put(
    State(db): State<Db>,
    Path(api_id): Path<String>,
    Query(params): Params,
    body: String,
) -> Reply {
    batch_update(&db, &api_id, &params, &body, true).await
}

/// Each item names its target rows with `query: "column=value"`; the other
/// fields are the changes.
async fn batch_update(
    db: &Db,
    api_id: &str,
    params: &HashMap<String, String>,
    body: &str,
    replace: bool,
) -> Reply {
    let items = data_rows(body)?;
    write_sheet(db, api_id, params, |sheet| {
        let mut updated = 0;
        for mut item in items {
            let query = item
                .remove("query")
                .map(|q| cell_text(&q))
                .ok_or(StatusCode::BAD_REQUEST)?;
            let (column, value) = query.split_once('=').ok_or(StatusCode::BAD_REQUEST)?;
            updated += update_where(sheet, column, value, &item, replace);
        }
        Ok(json!({ "updated": updated }))
    })
    .await
}

async fn delete_rows(
    State(db): State<Db>,
    Path((api_id, column, value)): Path<(String, String, String)>,
    Query(params): Params,
) -> Reply {
    write_sheet(&db, &api_id, &params, |sheet| {
        let before = sheet.rows.len();
        sheet.rows.retain(|row| !cell_matches(row, &column, &value, true));
        Ok(json!({ "deleted": before - sheet.rows.len() }))
    })
    .await
}
