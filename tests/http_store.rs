//! Integration tests for the HTTP blob store
//!
//! A wiremock server plays a minimal blob service: it keeps whole blobs,
//! staged blocks and committed block lists in memory and serves them back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use blobxfer::{DEFAULT_BUFFER_SIZE, ProgressEvent, StoreConfig};
use tempfile::tempdir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const CHUNK_SIZE: usize = 64 * 1024;

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 241) as u8).collect()
}

#[derive(Default)]
struct BlobState {
    blobs: HashMap<String, Vec<u8>>,
    blocks: HashMap<(String, String), Vec<u8>>,
}

/// Handles Put Blob, Put Block and Put Block List
struct BlobWriter(Arc<Mutex<BlobState>>);

impl Respond for BlobWriter {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.0.lock().unwrap();
        let blob = request.url.path().to_string();
        let query: HashMap<String, String> = request.url.query_pairs().into_owned().collect();

        match query.get("comp").map(String::as_str) {
            Some("block") => {
                let id = query.get("blockid").cloned().unwrap_or_default();
                state.blocks.insert((blob, id), request.body.clone());
            }
            Some("blocklist") => {
                let xml = String::from_utf8_lossy(&request.body).into_owned();
                let mut data = Vec::new();
                for entry in xml.split("<Latest>").skip(1) {
                    let id = entry.split("</Latest>").next().unwrap_or_default();
                    match state.blocks.get(&(blob.clone(), id.to_string())) {
                        Some(block) => data.extend_from_slice(block),
                        None => {
                            return ResponseTemplate::new(400)
                                .insert_header("x-ms-error-code", "InvalidBlockList");
                        }
                    }
                }
                state.blocks.retain(|(name, _), _| name != &blob);
                state.blobs.insert(blob, data);
            }
            _ => {
                state.blobs.insert(blob, request.body.clone());
            }
        }
        ResponseTemplate::new(201)
    }
}

/// Handles Get Blob
struct BlobReader(Arc<Mutex<BlobState>>);

impl Respond for BlobReader {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let state = self.0.lock().unwrap();
        match state.blobs.get(request.url.path()) {
            Some(data) => ResponseTemplate::new(200).set_body_bytes(data.clone()),
            None => ResponseTemplate::new(404).insert_header("x-ms-error-code", "BlobNotFound"),
        }
    }
}

async fn blob_server() -> (MockServer, Arc<Mutex<BlobState>>) {
    let server = MockServer::start().await;
    let state = Arc::new(Mutex::new(BlobState::default()));
    Mock::given(method("PUT"))
        .respond_with(BlobWriter(Arc::clone(&state)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(BlobReader(Arc::clone(&state)))
        .mount(&server)
        .await;
    (server, state)
}

#[tokio::test]
async fn round_trip_through_http_store() {
    let (server, state) = blob_server().await;
    let config = StoreConfig {
        endpoint: server.uri(),
        chunk_size: CHUNK_SIZE,
        ..Default::default()
    };
    let dir = tempdir().unwrap();

    let sizes = [
        0,
        1,
        DEFAULT_BUFFER_SIZE,
        DEFAULT_BUFFER_SIZE + 1,
        5 * 1024 * 1024 + 17,
    ];
    for size in sizes {
        let name = format!("payload-{size}.bin");
        let source = dir.path().join(&name);
        let original = payload(size);
        std::fs::write(&source, &original).unwrap();

        let mut up: Vec<ProgressEvent> = Vec::new();
        let sent = blobxfer::upload_with_progress(&source, &config, |e| up.push(*e))
            .await
            .unwrap();
        assert_eq!(sent, size as u64, "size {size}");
        assert_eq!(
            state.lock().unwrap().blobs.get(&format!("/transfers/{name}")),
            Some(&original),
            "size {size}"
        );

        let dest = dir.path().join(format!("download_{name}"));
        let mut down: Vec<ProgressEvent> = Vec::new();
        let written = blobxfer::download_with_progress(&name, &dest, &config, |e| down.push(*e))
            .await
            .unwrap();
        assert_eq!(written, size as u64, "size {size}");
        assert_eq!(std::fs::read(&dest).unwrap(), original, "size {size}");

        if size == 0 {
            assert_eq!(up.len(), 1);
            assert_eq!(up[0].percentage, 0.0);
            assert!(down.is_empty());
            continue;
        }

        for events in [&up, &down] {
            assert!(events.windows(2).all(|w| w[0].transferred_bytes < w[1].transferred_bytes));
            let last = events.last().unwrap();
            assert_eq!(last.transferred_bytes, size as u64, "size {size}");
            assert_eq!(last.percentage, 100.0, "size {size}");
        }
        assert_eq!(up.len(), size.div_ceil(CHUNK_SIZE).max(1), "size {size}");
    }
}

#[tokio::test]
async fn missing_blob_download_is_not_found() {
    let (server, _state) = blob_server().await;
    let config = StoreConfig {
        endpoint: server.uri(),
        ..Default::default()
    };
    let dir = tempdir().unwrap();
    let dest = dir.path().join("ghost.bin");

    let err = blobxfer::download("ghost.bin", &dest, &config)
        .await
        .unwrap_err();
    match err {
        blobxfer::Error::RemoteTransfer {
            source: blobxfer::StoreError::NotFound(msg),
            ..
        } => assert!(msg.contains("BlobNotFound")),
        other => panic!("Expected NotFound, got {other:?}"),
    }
    assert!(!dest.exists());
}
