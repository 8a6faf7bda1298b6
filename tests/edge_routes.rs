//! End-to-end behavior of the edge router against an in-memory backend.

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

mod common;

use common::{body_bytes, body_json, get, header_str, test_app, test_config, upload, MockStorage};

const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-png";

#[tokio::test]
async fn test_single_upload_returns_descriptor() {
    let storage = MockStorage::new();
    let (app, _) = test_app(test_config(), storage.clone());

    let response = app
        .oneshot(upload(&[("cat.jpg", "image/jpeg", JPEG)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("no-store"));
    assert_eq!(header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body.get("errors").is_none());
    let file = &body["files"][0];
    assert_eq!(file["originalName"], "cat.jpg");
    assert_eq!(file["mimeType"], "image/jpeg");
    assert_eq!(file["sizeBytes"], JPEG.len() as u64);

    let generated = file["generatedName"].as_str().unwrap();
    assert!(generated.ends_with(".jpg"));
    assert!(generated.trim_end_matches(".jpg").chars().all(|c| c.is_ascii_digit()));
    assert_eq!(
        file["url"].as_str().unwrap(),
        format!("http://img.example.com/{}", generated)
    );
    assert!(storage.contains(generated));
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let storage = MockStorage::new();
    let (app, _) = test_app(test_config(), storage.clone());
    let big = vec![0u8; 15 * 1024 * 1024];

    let response = app
        .oneshot(upload(&[("huge.png", "image/png", &big)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["context"], "upload");
    assert_eq!(body["files"].as_array().unwrap().len(), 0);
    let error = body["errors"][0].as_str().unwrap();
    assert!(error.contains("huge.png"));
    assert!(error.contains("10 MB"));
    assert_eq!(storage.puts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_image_upload_is_rejected() {
    let storage = MockStorage::new();
    let (app, _) = test_app(test_config(), storage);

    let response = app
        .oneshot(upload(&[("notes.txt", "text/plain", b"hello")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["errors"][0].as_str().unwrap().starts_with("notes.txt"));
}

#[tokio::test]
async fn test_upload_without_files() {
    let (app, _) = test_app(test_config(), MockStorage::new());

    let response = app.oneshot(upload(&[])).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["context"], "upload");
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_partial_upload_failure() {
    let storage = MockStorage::new();
    storage.fail_puts_with(b"broken");
    let (app, _) = test_app(test_config(), storage.clone());

    let response = app
        .oneshot(upload(&[
            ("a.jpg", "image/jpeg", JPEG),
            ("b.png", "image/png", b"broken"),
            ("c.png", "image/png", PNG),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["files"].as_array().unwrap().len(), 2);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().starts_with("b.png"));
    assert_eq!(storage.puts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_upload_with_backend_down_is_bad_gateway() {
    let storage = MockStorage::new();
    storage.set_unreachable(true);
    let (app, _) = test_app(test_config(), storage);

    let response = app
        .oneshot(upload(&[("a.jpg", "image/jpeg", JPEG)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_listing_filters_directories_and_non_images() {
    let storage = MockStorage::new();
    storage.insert("vacation/beach.jpg", JPEG);
    storage.insert("vacation/sun set.png", PNG);
    storage.insert("vacation/notes.txt", b"text");
    storage.add_dir("vacation/day2");
    let (app, _) = test_app(test_config(), storage);

    let response = app.oneshot(get("/images/vacation")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("no-cache"));
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["name"], "beach.jpg");
    assert_eq!(files[0]["url"], "http://img.example.com/vacation/beach.jpg");
    assert_eq!(files[1]["url"], "http://img.example.com/vacation/sun%20set.png");
}

#[tokio::test]
async fn test_listing_is_cached_until_upload() {
    let storage = MockStorage::new();
    storage.insert("old.jpg", JPEG);
    let (app, _) = test_app(test_config(), storage.clone());

    let first = body_json(app.clone().oneshot(get("/images")).await.unwrap()).await;
    let second = body_json(app.clone().oneshot(get("/images/")).await.unwrap()).await;
    assert_eq!(first, second);
    assert_eq!(first["files"].as_array().unwrap().len(), 1);
    assert_eq!(storage.lists.load(Ordering::SeqCst), 1);

    let uploaded = app
        .clone()
        .oneshot(upload(&[("new.png", "image/png", PNG)]))
        .await
        .unwrap();
    assert_eq!(uploaded.status(), StatusCode::OK);

    let third = body_json(app.oneshot(get("/images")).await.unwrap()).await;
    assert_eq!(storage.lists.load(Ordering::SeqCst), 2);
    assert_eq!(third["files"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_listing_traversal_and_backend_failure() {
    let storage = MockStorage::new();
    let (app, _) = test_app(test_config(), storage.clone());

    let response = app.clone().oneshot(get("/images/../secret")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["context"], "getImages");

    storage.set_unreachable(true);
    let response = app.oneshot(get("/images/vacation")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["context"], "getImages");
}

#[tokio::test]
async fn test_carousel_page_embeds_subdir() {
    let (app, _) = test_app(test_config(), MockStorage::new());

    let response = app.oneshot(get("/carousel/vacation")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("no-store"));
    assert!(header_str(&response, header::CONTENT_TYPE).unwrap().starts_with("text/html"));
    let html = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
    assert!(html.contains(r#""vacation""#));
    assert!(!html.contains("{{SUBDIR}}"));
}

#[tokio::test]
async fn test_static_assets_and_upload_page() {
    let (app, _) = test_app(test_config(), MockStorage::new());

    for (path, content_type) in [
        ("/upload", "text/html"),
        ("/upload.html", "text/html"),
        ("/app.js", "application/javascript"),
        ("/styles.css", "text/css"),
        ("/robots.txt", "text/plain"),
        ("/favicon.ico", "image/x-icon"),
    ] {
        let response = app.clone().oneshot(get(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", path);
        assert!(
            header_str(&response, header::CONTENT_TYPE).unwrap().starts_with(content_type),
            "{}",
            path
        );
        assert_eq!(
            header_str(&response, header::CACHE_CONTROL),
            Some("public, max-age=3600")
        );
    }
}

#[tokio::test]
async fn test_root_redirects_away() {
    let (app, _) = test_app(test_config(), MockStorage::new());

    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(header_str(&response, header::LOCATION), Some("https://www.bing.com"));
}

#[tokio::test]
async fn test_root_serves_upload_page_when_mounted_at_root() {
    let mut config = test_config();
    config.site.upload_page_path = "/".to_string();
    let (app, _) = test_app(config, MockStorage::new());

    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, header::CONTENT_TYPE).unwrap().starts_with("text/html"));
}

#[tokio::test]
async fn test_preflight() {
    let (app, _) = test_app(test_config(), MockStorage::new());
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/upload")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
    assert_eq!(
        header_str(&response, header::ACCESS_CONTROL_ALLOW_METHODS),
        Some("GET, POST, OPTIONS")
    );
    assert_eq!(header_str(&response, header::ACCESS_CONTROL_MAX_AGE), Some("86400"));
}

#[tokio::test]
async fn test_unknown_path_uses_error_format() {
    let (app, _) = test_app(test_config(), MockStorage::new());

    let response = app.oneshot(get("/nothing/here.txt")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("no-store"));
    assert_eq!(header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 404);
    assert_eq!(body["context"], "route");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.max_requests = 3;
    let (app, _) = test_app(config, MockStorage::new());

    let from = |ip: &'static str| {
        Request::builder()
            .uri("/robots.txt")
            .header("cf-connecting-ip", ip)
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..3 {
        let response = app.clone().oneshot(from("203.0.113.7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let limited = app.clone().oneshot(from("203.0.113.7")).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header_str(&limited, header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
    let body = body_json(limited).await;
    assert_eq!(body["code"], 429);
    assert_eq!(body["context"], "main");

    let other = app.oneshot(from("198.51.100.1")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_image_served_from_edge_cache() {
    let storage = MockStorage::new();
    storage.insert("photos/cat.jpg", JPEG);
    let (app, state) = test_app(test_config(), storage.clone());

    let first = app.clone().oneshot(get("/photos/cat.jpg")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header_str(&first, header::CONTENT_TYPE), Some("image/jpeg"));
    assert_eq!(
        header_str(&first, header::CACHE_CONTROL),
        Some("public, max-age=31536000, immutable, stale-while-revalidate=86400")
    );
    let etag = header_str(&first, header::ETAG).unwrap().to_string();
    assert_eq!(body_bytes(first).await.as_ref(), JPEG);

    // the cache write is detached from the response
    for _ in 0..50 {
        if state.edge_cache.lookup("http://img.example.com/photos/cat.jpg").await.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let second = app.clone().oneshot(get("/photos/cat.jpg")).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header_str(&second, header::ETAG), Some(etag.as_str()));
    assert_eq!(body_bytes(second).await.as_ref(), JPEG);
    assert_eq!(storage.gets.load(Ordering::SeqCst), 1);

    let conditional = Request::builder()
        .uri("/photos/cat.jpg")
        .header(header::HOST, "img.example.com")
        .header(header::IF_NONE_MATCH, etag.as_str())
        .body(Body::empty())
        .unwrap();
    let not_modified = app.oneshot(conditional).await.unwrap();
    assert_eq!(not_modified.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(not_modified).await.is_empty());
}

#[tokio::test]
async fn test_missing_image_is_not_found() {
    let storage = MockStorage::new();
    let (app, _) = test_app(test_config(), storage.clone());

    let response = app.clone().oneshot(get("/ghost.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["context"], "getImage");

    storage.set_unreachable(true);
    let response = app.oneshot(get("/ghost.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_post_to_image_path_is_not_found() {
    let storage = MockStorage::new();
    storage.insert("cat.jpg", JPEG);
    let (app, _) = test_app(test_config(), storage);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/cat.jpg")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_declared_oversized_body_uses_error_format() {
    let mut config = test_config();
    config.upload.max_request_bytes = 2048;
    let storage = MockStorage::new();
    let (app, _) = test_app(config, storage.clone());

    let body = common::multipart_body(&[("big.png", "image/png", &[7u8; 8192])]);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(header::HOST, "img.example.com")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", common::BOUNDARY),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("no-store"));
    assert_eq!(header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], 413);
    assert_eq!(json["context"], "upload");
    assert_eq!(storage.puts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_request_timeout_uses_error_format() {
    let mut config = test_config();
    config.timeouts.request_secs = 1;
    let storage = MockStorage::new();
    storage.delay_puts(Duration::from_millis(1500));
    let (app, _) = test_app(config, storage);

    let response = app
        .oneshot(upload(&[("slow.jpg", "image/jpeg", JPEG)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("no-store"));
    let json = body_json(response).await;
    assert_eq!(json["code"], 408);
    assert_eq!(json["context"], "main");
}

fn list_from(host: &'static str, proto: Option<&'static str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri("/images/vacation")
        .header(header::HOST, host);
    if let Some(proto) = proto {
        builder = builder.header("x-forwarded-proto", proto);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_cached_listing_follows_each_origin() {
    let storage = MockStorage::new();
    storage.insert("vacation/beach.jpg", JPEG);
    let (app, _) = test_app(test_config(), storage.clone());

    let first = body_json(app.clone().oneshot(list_from("a.example.com", None)).await.unwrap()).await;
    let cached = body_json(
        app.oneshot(list_from("b.example.com", Some("https")))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(storage.lists.load(Ordering::SeqCst), 1);
    assert_eq!(first["files"][0]["url"], "http://a.example.com/vacation/beach.jpg");
    assert_eq!(cached["files"][0]["url"], "https://b.example.com/vacation/beach.jpg");

    // same answer as a cold cache for that origin
    let (fresh_app, _) = test_app(test_config(), storage);
    let uncached = body_json(
        fresh_app
            .oneshot(list_from("b.example.com", Some("https")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(cached, uncached);
}

#[tokio::test]
async fn test_upload_batches_respect_concurrency_and_count_rejections() {
    let mut config = test_config();
    config.upload.max_file_bytes = 1024;
    let concurrency = config.upload.concurrency;
    let storage = MockStorage::new();
    storage.delay_puts(Duration::from_millis(20));
    let (app, _) = test_app(config, storage.clone());

    let names: Vec<String> = (0..12).map(|i| format!("photo{}.jpg", i)).collect();
    let oversized = vec![1u8; 2048];
    let mut parts: Vec<common::FilePart<'_>> = names
        .iter()
        .map(|name| (name.as_str(), "image/jpeg", JPEG))
        .collect();
    parts.insert(3, ("notes.txt", "text/plain", b"hello"));
    parts.insert(9, ("huge.png", "image/png", &oversized));

    let response = app.oneshot(upload(&parts)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["files"].as_array().unwrap().len(), 12);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|e| e.as_str().unwrap().starts_with("notes.txt")));
    assert!(errors.iter().any(|e| e.as_str().unwrap().starts_with("huge.png")));

    assert_eq!(storage.puts.load(Ordering::SeqCst), 12);
    assert_eq!(storage.peak_in_flight.load(Ordering::SeqCst), concurrency);
}
