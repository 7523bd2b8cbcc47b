//! `UreqTransport` against a bare TCP server.
//!
//! # Design
//! Each test accepts exactly one connection on a random port, records the raw
//! request bytes and answers with a canned JSON body. This pins what actually
//! goes over the wire, which the mock server cannot show.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use serde_json::{json, Value};
use sheetdb_core::{Connection, HttpMethod, SheetDb, UpdateMethod, UreqTransport};

/// Serves `body` once and returns the base URL plus a handle yielding the raw
/// request that was received.
fn serve_once(body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        let head = format!(
            concat!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n",
                "Content-Length: {}\r\nConnection: close\r\n\r\n",
            ),
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(body.as_bytes()).unwrap();
        request
    });
    (format!("http://{addr}/api/v1"), handle)
}

/// Reads the request head and as many body bytes as `Content-Length` says.
fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut expected = None;
    loop {
        if let Some(total) = expected {
            if buf.len() >= total {
                break;
            }
        }
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if expected.is_none() {
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .map(|v| v.trim().parse::<usize>().unwrap())
                    .unwrap_or(0);
                expected = Some(end + 4 + length);
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[test]
fn reads_bodies_larger_than_ten_mebibytes() {
    let rows: Vec<Value> = (0..220_000)
        .map(|i| {
            json!({
                "id": format!("{i:06}"),
                "name": format!("row {i:06} of a large sheet"),
            })
        })
        .collect();
    let body = Value::Array(rows).to_string();
    assert!(body.len() > 10 * 1024 * 1024);

    let (base, server) = serve_once(body);
    let db = SheetDb::new("abc", None).with_base_url(&base);

    let rows = db.get().unwrap();
    assert_eq!(rows.as_array().map(Vec::len), Some(220_000));
    assert_eq!(rows[219_999]["id"], "219999");
    assert!(server.join().unwrap().starts_with("GET /api/v1/abc "));
}

#[test]
fn get_does_not_transmit_prepared_body() {
    let (base, server) = serve_once("[]".to_string());
    let mut conn = Connection::new(format!("{base}/abc"), None);

    let req = conn.build_request(HttpMethod::Get, &json!({"id": "1"}));
    assert_eq!(req.body, "data%5Bid%5D=1");
    let value = conn
        .make_request(&UreqTransport::new(), HttpMethod::Get, &json!({"id": "1"}))
        .unwrap();
    assert_eq!(value, json!([]));

    let raw = server.join().unwrap();
    assert!(raw.starts_with("GET /api/v1/abc "));
    assert!(raw.ends_with("\r\n\r\n"), "unexpected body in {raw:?}");
}

#[test]
fn patch_transmits_form_body() {
    let (base, server) = serve_once(r#"{"updated": 1}"#.to_string());
    let db = SheetDb::new("abc", None).with_base_url(&base);

    let updated = db
        .update("id", "1", &json!({"name": "Ann"}), UpdateMethod::Patch)
        .unwrap();
    assert_eq!(updated, 1);

    let raw = server.join().unwrap();
    assert!(raw.starts_with("PATCH /api/v1/abc/id/1 "));
    let lowered = raw.to_ascii_lowercase();
    assert!(lowered.contains("content-type: application/x-www-form-urlencoded"));
    assert!(raw.ends_with("\r\n\r\ndata%5B0%5D%5Bname%5D=Ann"));
}
