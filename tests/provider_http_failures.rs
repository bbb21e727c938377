use std::fs;
use std::io::Cursor;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use image::{ImageFormat, Rgb, RgbImage};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

use imaging_backend_core::api::server::build_router;
use imaging_backend_core::config::ServiceConfig;
use imaging_backend_core::providers::http::ProviderEndpoints;
use imaging_backend_core::providers::ProviderCredentials;

const BOUNDARY: &str = "imaging-provider-boundary";

#[derive(Debug, Clone)]
struct CannedReply {
    status: StatusCode,
    content_type: &'static str,
    body: Vec<u8>,
}

impl CannedReply {
    fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }
}

#[derive(Debug, Clone)]
struct SeenRequest {
    path: String,
    gemini_key: Option<String>,
    removebg_key: Option<String>,
    body: Vec<u8>,
}

struct MockProvider {
    gemini: CannedReply,
    removebg: CannedReply,
    seen: Mutex<Vec<SeenRequest>>,
}

async fn mock_handler(State(mock): State<Arc<MockProvider>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();
    let gemini_key = header_text(&parts.headers, "x-goog-api-key");
    let removebg_key = header_text(&parts.headers, "x-api-key");
    let body = to_bytes(body, usize::MAX)
        .await
        .expect("mock body should read")
        .to_vec();
    mock.seen.lock().expect("mock lock poisoned").push(SeenRequest {
        path: path.clone(),
        gemini_key,
        removebg_key,
        body,
    });

    let reply = if path.ends_with(":generateContent") {
        mock.gemini.clone()
    } else {
        mock.removebg.clone()
    };
    (
        reply.status,
        [(header::CONTENT_TYPE, reply.content_type)],
        reply.body,
    )
        .into_response()
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn start_mock(gemini: CannedReply, removebg: CannedReply) -> (SocketAddr, Arc<MockProvider>) {
    let mock = Arc::new(MockProvider {
        gemini,
        removebg,
        seen: Mutex::new(Vec::new()),
    });
    let app = Router::new().fallback(mock_handler).with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("mock listener should bind");
    let addr = listener.local_addr().expect("mock addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, mock)
}

fn app_against(addr: SocketAddr) -> (Router, PathBuf) {
    let media_root =
        std::env::temp_dir().join(format!("imaging_backend_core_http_{}", Uuid::new_v4()));
    let mut config = ServiceConfig::for_media_root(media_root.clone());
    config.credentials = ProviderCredentials {
        gemini_api_key: String::from("gemini-live-key"),
        remove_bg_api_key: String::from("removebg-live-key"),
    };
    config.endpoints = ProviderEndpoints {
        gemini_generate_content: Url::parse(
            format!("http://{addr}/v1beta/models/test-model:generateContent").as_str(),
        )
        .expect("mock gemini url"),
        remove_bg: Url::parse(format!("http://{addr}/v1.0/removebg").as_str())
            .expect("mock remove.bg url"),
    };
    config.provider_timeout = Duration::from_secs(5);
    (build_router(&config), media_root)
}

fn png_bytes() -> Vec<u8> {
    let image = RgbImage::from_pixel(6, 4, Rgb([10, 200, 30]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .expect("png should encode");
    out.into_inner()
}

async fn submit(app: Router, operation: &str, expected_status: StatusCode) -> Value {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"cat.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(png_bytes().as_slice());
    body.extend_from_slice(
        format!(
            "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"operation\"\r\n\r\n{operation}\r\n--{BOUNDARY}--\r\n"
        )
        .as_bytes(),
    );
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/myapp/process-image/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request should build");

    let response = app.oneshot(request).await.expect("request should succeed");
    assert_eq!(response.status(), expected_status);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    serde_json::from_slice(&bytes).expect("response should be json")
}

fn stored_files(root: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut names = entries
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();
    names
}

fn unused_reply() -> CannedReply {
    CannedReply::json(StatusCode::NOT_FOUND, json!({"error": "unexpected call"}))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn removebg_server_error_is_a_transport_failure() {
    let (addr, mock) = start_mock(
        unused_reply(),
        CannedReply {
            status: StatusCode::SERVICE_UNAVAILABLE,
            content_type: "text/plain",
            body: b"upstream busy".to_vec(),
        },
    )
    .await;
    let (app, media_root) = app_against(addr);

    let body = submit(app, "background_removal", StatusCode::BAD_REQUEST).await;

    let entry = &body["errors"]["__all__"][0];
    assert_eq!(entry["kind"], json!("transport"));
    let message = entry["message"].as_str().expect("message should be a string");
    assert!(
        message.starts_with("Background removal API request failed: HTTP 503"),
        "{message}"
    );
    assert!(message.ends_with("Check network or API key."));
    assert_eq!(body["image_original_url"], json!("/media/cat.png"));
    assert_eq!(stored_files(media_root.as_path()), vec!["cat.png"]);

    let seen = mock.seen.lock().expect("mock lock poisoned").clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/v1.0/removebg");
    assert_eq!(seen[0].removebg_key.as_deref(), Some("removebg-live-key"));
    let form = String::from_utf8_lossy(seen[0].body.as_slice());
    assert!(form.contains("name=\"image_file\""));
    assert!(form.contains("name=\"size\""));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn removebg_json_error_surfaces_its_title() {
    let (addr, _mock) = start_mock(
        unused_reply(),
        CannedReply::json(
            StatusCode::OK,
            json!({"errors": [{"title": "Could not identify foreground in image"}]}),
        ),
    )
    .await;
    let (app, media_root) = app_against(addr);

    let body = submit(app, "background_removal", StatusCode::BAD_REQUEST).await;

    assert_eq!(
        body["errors"]["__all__"],
        json!([{
            "kind": "upstream_contract",
            "message": "Background removal failed: Could not identify foreground in image."
        }])
    );
    assert_eq!(stored_files(media_root.as_path()), vec!["cat.png"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn removebg_image_reply_becomes_the_artifact() {
    let reply_png = png_bytes();
    let (addr, _mock) = start_mock(
        unused_reply(),
        CannedReply {
            status: StatusCode::OK,
            content_type: "image/png",
            body: reply_png.clone(),
        },
    )
    .await;
    let (app, media_root) = app_against(addr);

    let body = submit(app, "background_removal", StatusCode::OK).await;

    assert_eq!(
        body["processed_image_url"],
        json!("/media/processed_bg_removed_cat.png")
    );
    let stored = fs::read(media_root.join("processed_bg_removed_cat.png"))
        .expect("artifact should be stored");
    assert_eq!(stored, reply_png);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gemini_empty_candidates_is_an_upstream_contract_error() {
    let (addr, _mock) = start_mock(
        CannedReply::json(StatusCode::OK, json!({"candidates": []})),
        unused_reply(),
    )
    .await;
    let (app, _media_root) = app_against(addr);

    let body = submit(app, "image_captioning", StatusCode::BAD_REQUEST).await;

    assert_eq!(
        body["errors"]["__all__"],
        json!([{
            "kind": "upstream_contract",
            "message": "AI captioning failed: No description generated. Gemini API response might be empty or malformed."
        }])
    );
    assert_eq!(body["image_caption"], json!(null));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gemini_non_json_body_is_an_upstream_contract_error() {
    let (addr, _mock) = start_mock(
        CannedReply {
            status: StatusCode::OK,
            content_type: "text/html",
            body: b"<html>maintenance</html>".to_vec(),
        },
        unused_reply(),
    )
    .await;
    let (app, _media_root) = app_against(addr);

    let body = submit(app, "object_detection", StatusCode::BAD_REQUEST).await;

    let entry = &body["errors"]["__all__"][0];
    assert_eq!(entry["kind"], json!("upstream_contract"));
    assert!(entry["message"]
        .as_str()
        .expect("message should be a string")
        .starts_with("Error processing AI response: "));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gemini_success_sends_key_header_and_inline_image() {
    let (addr, mock) = start_mock(
        CannedReply::json(
            StatusCode::OK,
            json!({"candidates": [{"content": {"parts": [{"text": "A green rectangle."}]}}]}),
        ),
        unused_reply(),
    )
    .await;
    let (app, _media_root) = app_against(addr);

    let body = submit(app, "image_captioning", StatusCode::OK).await;
    assert_eq!(body["image_caption"], json!("A green rectangle."));

    let seen = mock.seen.lock().expect("mock lock poisoned").clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/v1beta/models/test-model:generateContent");
    assert_eq!(seen[0].gemini_key.as_deref(), Some("gemini-live-key"));
    let payload: Value = serde_json::from_slice(seen[0].body.as_slice()).expect("json payload");
    assert_eq!(
        payload["contents"][0]["parts"][0]["text"],
        json!("Describe this image in detail.")
    );
    assert_eq!(
        payload["contents"][0]["parts"][1]["inlineData"]["mimeType"],
        json!("image/png")
    );
}
