use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, DEMO_API_ID};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn uri(suffix: &str) -> String {
    format!("/api/v1/{DEMO_API_ID}{suffix}")
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn form_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

// --- reads ---

#[tokio::test]
async fn list_rows_of_first_sheet() {
    let resp = app().oneshot(get_request(&uri(""))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let rows = body_json(resp).await;
    assert_eq!(rows.as_array().map(Vec::len), Some(2));
    assert_eq!(rows[0]["name"], "Alice");
}

#[tokio::test]
async fn sheet_param_selects_sheet() {
    let resp = app().oneshot(get_request(&uri("/keys?sheet=Sheet2"))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!(["id", "city"]));
}

#[tokio::test]
async fn unknown_sheet_returns_404() {
    let resp = app().oneshot(get_request(&uri("/count?sheet=Nope"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_api_id_returns_404() {
    let resp = app().oneshot(get_request("/api/v1/missing/name")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn name_and_count() {
    let resp = app().oneshot(get_request(&uri("/name"))).await.unwrap();
    assert_eq!(body_json(resp).await, json!({"name": "Demo"}));

    let resp = app().oneshot(get_request(&uri("/count"))).await.unwrap();
    assert_eq!(body_json(resp).await, json!({"rows": 2}));
}

// --- search ---

#[tokio::test]
async fn search_is_case_insensitive_by_default() {
    let resp = app()
        .oneshot(get_request(&uri("/search?name=alice&casesensitive=false")))
        .await
        .unwrap();
    let rows = body_json(resp).await;
    assert_eq!(rows.as_array().map(Vec::len), Some(1));
    assert_eq!(rows[0]["id"], "1");
}

#[tokio::test]
async fn search_case_sensitive_excludes_mismatched_case() {
    let resp = app()
        .oneshot(get_request(&uri("/search?name=alice&casesensitive=true")))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn search_requires_all_and_search_or_any() {
    let query = "?name=Alice&age=25&casesensitive=true";

    let resp = app().oneshot(get_request(&uri(&format!("/search{query}")))).await.unwrap();
    assert_eq!(body_json(resp).await, json!([]));

    let resp = app().oneshot(get_request(&uri(&format!("/search_or{query}")))).await.unwrap();
    let rows = body_json(resp).await;
    assert_eq!(rows.as_array().map(Vec::len), Some(2));
}

// --- writes ---

#[tokio::test]
async fn create_without_data_returns_400() {
    let resp = app().oneshot(form_request("POST", &uri(""), "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_update_requires_query() {
    let resp = app()
        .oneshot(form_request("PATCH", &uri("/batch_update"), "data%5B0%5D%5Bname%5D=X"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_on_missing_row_reports_zero() {
    let resp = app()
        .oneshot(form_request("PATCH", &uri("/id/99"), "data%5B0%5D%5Bname%5D=X"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"updated": 0}));
}

// --- full lifecycle ---

#[tokio::test]
async fn row_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create two rows
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "POST",
            &uri(""),
            concat!(
                "data%5B0%5D%5Bid%5D=3&data%5B0%5D%5Bname%5D=Cid",
                "&data%5B1%5D%5Bid%5D=4&data%5B1%5D%5Bname%5D=Dee",
            ),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"created": 2}));

    // patch keeps age, put blanks it
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("PATCH", &uri("/id/1"), "data%5B0%5D%5Bname%5D=Alicia"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"updated": 1}));

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("PUT", &uri("/id/2"), "data%5B0%5D%5Bid%5D=2&data%5B0%5D%5Bname%5D=Bo"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"updated": 1}));

    // batch update by query
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "PATCH",
            &uri("/batch_update"),
            concat!(
                "data%5B0%5D%5Bquery%5D=id%3D3&data%5B0%5D%5Bage%5D=40",
                "&data%5B1%5D%5Bquery%5D=id%3D4&data%5B1%5D%5Bage%5D=41",
            ),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"updated": 2}));

    // list reflects every change
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&uri("")))
        .await
        .unwrap();
    assert_eq!(
        body_json(resp).await,
        json!([
            {"id": "1", "name": "Alicia", "age": "30"},
            {"id": "2", "name": "Bo", "age": ""},
            {"id": "3", "name": "Cid", "age": "40"},
            {"id": "4", "name": "Dee", "age": "41"},
        ])
    );

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("DELETE", &uri("/id/3"), ""))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"deleted": 1}));

    // count after delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&uri("/count")))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"rows": 3}));

    // other sheet untouched
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&uri("?sheet=Sheet2")))
        .await
        .unwrap();
    let body = body_bytes(resp).await;
    let rows: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(rows, json!([{"id": "1", "city": "Warsaw"}]));
}
