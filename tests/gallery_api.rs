//! End-to-end tests: boot the full router on an ephemeral port with a temp
//! media directory and database, then drive it through the HTTP client and
//! the browser-side controllers.

use bytes::Bytes;
use gallery::client::api::{ApiError, HttpImageApi, ImageApi, ImageUpload};
use gallery::client::feed::GalleryBrowser;
use gallery::client::upload_form::{FileCandidate, PreviewHandle, UploadForm};
use gallery::routes::routes::routes;
use gallery::services::{
    gallery_service::GalleryService, image_index::ImageIndex, media_store::MediaStore,
};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot a real png but close enough";

struct TestApp {
    base_url: String,
    api: HttpImageApi,
    _dir: tempfile::TempDir,
}

async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();

    let db_path = dir.path().join("gallery.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .unwrap(),
    );
    sqlx::migrate!("./migrations").run(&*db).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let index = ImageIndex::new(db);
    let media = MediaStore::new(dir.path().join("media"), base_url.clone());
    let service = GalleryService::new(index, media, 12, 100);
    let app = routes(5 * 1024 * 1024).with_state(service);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        api: HttpImageApi::new(base_url.clone()),
        base_url,
        _dir: dir,
    }
}

async fn upload(api: &HttpImageApi, filename: &str, title: &str, caption: &str) -> Uuid {
    api.upload_image(ImageUpload {
        payload: Bytes::from_static(PNG_BYTES),
        filename: filename.to_string(),
        content_type: "image/png".to_string(),
        title: title.to_string(),
        caption: caption.to_string(),
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn upload_then_list_round_trips() {
    let app = spawn_app().await;

    upload(&app.api, "first.png", "First", "the first one").await;
    upload(&app.api, "second.png", "Second", "").await;
    // blank title falls back to the filename
    upload(&app.api, "third.png", "", "").await;

    let images = app.api.list_images(1, 12).await.unwrap();
    assert_eq!(images.len(), 3);

    // newest first
    assert_eq!(images[0].title, "third.png");
    assert_eq!(images[1].title, "Second");
    assert_eq!(images[2].title, "First");
    assert_eq!(images[2].caption, "the first one");
    assert_eq!(images[1].caption, "");
    assert!(
        images
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at)
    );

    // the record URL serves the uploaded bytes
    let response = reqwest::get(&images[0].url).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "image/png"
    );
    assert_eq!(response.bytes().await.unwrap().as_ref(), PNG_BYTES);
}

#[tokio::test]
async fn listing_pages_are_disjoint_and_exhaust_at_the_end() {
    let app = spawn_app().await;
    for i in 0..25 {
        upload(&app.api, &format!("img-{i}.png"), &format!("Image {i}"), "").await;
    }

    let page1 = app.api.list_images(1, 12).await.unwrap();
    let page2 = app.api.list_images(2, 12).await.unwrap();
    let page3 = app.api.list_images(3, 12).await.unwrap();
    let page4 = app.api.list_images(4, 12).await.unwrap();

    assert_eq!(page1.len(), 12);
    assert_eq!(page2.len(), 12);
    assert_eq!(page3.len(), 1);
    assert!(page4.is_empty());

    let all: Vec<_> = page1.iter().chain(&page2).chain(&page3).collect();
    let mut ids: Vec<_> = all.iter().map(|image| image.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 25, "pages overlap or drop records");

    assert!(
        all.windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at)
    );
}

#[tokio::test]
async fn malformed_query_params_fall_back_to_defaults() {
    let app = spawn_app().await;
    for i in 0..15 {
        upload(&app.api, &format!("img-{i}.png"), "x", "").await;
    }

    let url = format!("{}/images?page=abc&limit=zzz", app.base_url);
    let body: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(body["images"].as_array().unwrap().len(), 12);

    // limit is clamped to the configured maximum rather than honored blindly
    let url = format!("{}/images?page=1&limit=100000", app.base_url);
    let body: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(body["images"].as_array().unwrap().len(), 15);
}

#[tokio::test]
async fn delete_removes_the_record_and_its_binary() {
    let app = spawn_app().await;
    let keep = upload(&app.api, "keep.png", "Keep", "").await;
    let victim = upload(&app.api, "victim.png", "Victim", "").await;

    let images = app.api.list_images(1, 12).await.unwrap();
    let victim_url = images
        .iter()
        .find(|image| image.id == victim)
        .unwrap()
        .url
        .clone();

    app.api.delete_image(victim).await.unwrap();

    let images = app.api.list_images(1, 12).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].id, keep);

    let response = reqwest::get(&victim_url).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn repeated_delete_returns_not_found() {
    let app = spawn_app().await;
    let id = upload(&app.api, "once.png", "Once", "").await;

    app.api.delete_image(id).await.unwrap();
    match app.api.delete_image(id).await {
        Err(ApiError::Rejected { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Image not found");
        }
        other => panic!("expected a 404 rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_ids_and_missing_files_are_client_errors() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .delete(format!("{}/images/not-a-uuid", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid image ID");

    let form = reqwest::multipart::Form::new().text("title", "no file here");
    let response = client
        .post(format!("{}/images", app.base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn oversized_request_bodies_are_rejected() {
    let app = spawn_app().await;

    let result = app
        .api
        .upload_image(ImageUpload {
            payload: Bytes::from(vec![0u8; 6 * 1024 * 1024]),
            filename: "big.png".to_string(),
            content_type: "image/png".to_string(),
            title: "Big".to_string(),
            caption: String::new(),
        })
        .await;

    match result {
        Err(ApiError::Rejected { status, .. }) => {
            assert!((400..500).contains(&status), "unexpected status {status}");
        }
        // the server may tear the connection down before the body finishes
        Err(ApiError::Transport(_)) => {}
        Ok(id) => panic!("oversized upload was accepted as {id}"),
    }

    let images = app.api.list_images(1, 12).await.unwrap();
    assert!(images.is_empty());
}

#[tokio::test]
async fn browser_controllers_drive_a_live_server() {
    let app = spawn_app().await;
    let api = Arc::new(HttpImageApi::new(app.base_url.clone()));

    // queue three files, caption one, submit the batch
    let mut form = UploadForm::new();
    form.add_files(
        ["a.png", "b.png", "c.png"]
            .into_iter()
            .map(|name| FileCandidate {
                filename: name.to_string(),
                content_type: "image/png".to_string(),
                payload: Bytes::from_static(PNG_BYTES),
                preview: PreviewHandle::noop(),
            })
            .collect(),
    )
    .unwrap();
    let first = form.items()[0].id();
    form.set_caption(first, "from the batch");

    let outcome = form.submit(api.as_ref()).await.unwrap();
    assert!(outcome.all_succeeded());
    assert_eq!(outcome.total, 3);
    assert!(form.items().is_empty());
    assert!(form.success());

    // walk the feed two records at a time
    let mut browser = GalleryBrowser::new(api, 2);
    browser.mount().await.unwrap();
    assert_eq!(browser.feed().images().len(), 2);

    browser.request_more().await.unwrap();
    assert_eq!(browser.feed().images().len(), 3);
    assert!(browser.feed().has_more());

    browser.request_more().await.unwrap();
    assert!(!browser.feed().has_more());

    // confirmed deletion drops the record locally and server-side
    let victim = browser.feed().images()[0].id;
    browser.delete(victim).await.unwrap();
    assert_eq!(browser.feed().images().len(), 2);
    assert!(browser.feed().images().iter().all(|image| image.id != victim));

    let remaining = app.api.list_images(1, 12).await.unwrap();
    assert_eq!(remaining.len(), 2);

    // refreshing starts over from page one with a fresh copy of the list
    browser.refresh().await.unwrap();
    assert_eq!(browser.feed().page(), 1);
    assert_eq!(browser.feed().images().len(), 2);
    assert!(browser.feed().has_more());
}

#[tokio::test]
async fn health_probes_respond() {
    let app = spawn_app().await;

    let response = reqwest::get(format!("{}/healthz", app.base_url)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = reqwest::get(format!("{}/readyz", app.base_url)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
