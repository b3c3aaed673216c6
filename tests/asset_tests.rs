//! Asset Pipeline Tests
//!
//! Tests for:
//! - Payload type detection
//! - Data URI decoding
//! - Loading glTF / GLB from memory and from disk
//! - Normalization to the canonical size
//! - Unsupported compression and corrupt payloads
//! - HTTP sources and status errors

mod common;

use std::sync::Arc;

use glam::Vec3;
use serde_json::json;

use anchorage::assets::io::decode_data_uri;
use anchorage::assets::loader::{ASSET_CONTENT_NAME, ASSET_ROOT_NAME};
use anchorage::assets::{AssetLoader, AssetSource, GeometryDecoder, PayloadKind, Prefab};
use anchorage::errors::LoadError;
use anchorage::utils::task::run_blocking;
use anchorage::scene::Scene;

use common::*;

const MIN: Vec3 = Vec3::new(-1.0, -2.0, -0.5);
const MAX: Vec3 = Vec3::new(3.0, 2.0, 0.5);

/// Instantiates a prefab and returns the world bounds of everything in it.
fn world_bounds(prefab: &Prefab) -> anchorage::BoundingBox {
    let mut scene = Scene::new();
    let root = scene.instantiate(prefab);
    scene.update_matrix_world();
    scene.world_bounding_box(root)
}

fn assert_normalized(prefab: &Prefab) {
    let root = &prefab.nodes[prefab.root_indices[0]];
    assert_eq!(prefab.root_indices.len(), 1);
    assert_eq!(root.name.as_deref(), Some(ASSET_ROOT_NAME));
    assert!(!root.visible, "wrapper starts hidden");

    let content = &prefab.nodes[root.children_indices[0]];
    assert_eq!(content.name.as_deref(), Some(ASSET_CONTENT_NAME));

    let bbox = world_bounds(prefab);
    let size = bbox.size();
    assert!(approx(size.max_element(), 0.3), "longest side is {}", size.max_element());
    assert!(approx_vec3(size, Vec3::new(0.3, 0.3, 0.075)));
    assert!(approx_vec3(bbox.center(), Vec3::ZERO));
}

// ============================================================================
// Payload detection
// ============================================================================

#[test]
fn content_type_wins_over_extension() {
    assert_eq!(
        PayloadKind::sniff(Some("model/gltf-binary"), "scene.gltf"),
        PayloadKind::Binary
    );
    assert_eq!(
        PayloadKind::sniff(Some("application/json; charset=utf-8"), "scene.glb"),
        PayloadKind::Text
    );
}

#[test]
fn extension_decides_without_content_type() {
    assert_eq!(PayloadKind::sniff(None, "chair.GLB"), PayloadKind::Binary);
    assert_eq!(PayloadKind::sniff(None, "chair.gltf?v=3"), PayloadKind::Text);
    assert_eq!(PayloadKind::sniff(Some("text/plain"), "chair"), PayloadKind::Unknown);
}

#[test]
fn unknown_resolves_by_magic() {
    assert_eq!(PayloadKind::Unknown.resolve(b"glTF\x02\0\0\0"), PayloadKind::Binary);
    assert_eq!(PayloadKind::Unknown.resolve(b"{\"asset\":{}}"), PayloadKind::Text);
    assert_eq!(PayloadKind::Text.resolve(b"glTF"), PayloadKind::Text);
}

#[test]
fn source_names() {
    let url = AssetSource::from("https://cdn.example.com/models/Chair.GLB?token=1#x");
    assert!(matches!(url, AssetSource::Url(_)));
    assert_eq!(url.file_name(), "Chair.GLB");
    assert_eq!(url.extension().as_deref(), Some("glb"));

    let path = AssetSource::from("assets/lamp.gltf");
    assert!(matches!(path, AssetSource::Path(_)));
    assert_eq!(path.extension().as_deref(), Some("gltf"));

    let bytes = AssetSource::bytes("upload", vec![0u8; 4]);
    assert_eq!(bytes.extension(), None);
}

// ============================================================================
// Data URIs
// ============================================================================

#[test]
fn data_uri_base64() {
    let bytes = decode_data_uri("data:application/octet-stream;base64,AAECAw==").unwrap();
    assert_eq!(bytes, vec![0, 1, 2, 3]);
}

#[test]
fn data_uri_percent_encoded() {
    let bytes = decode_data_uri("data:text/plain,hello%20world").unwrap();
    assert_eq!(bytes, b"hello world");
}

#[test]
fn data_uri_without_separator_fails() {
    assert!(matches!(
        decode_data_uri("data:application/octet-stream;base64"),
        Err(LoadError::DataUri(_))
    ));
}

// ============================================================================
// Loading & normalization
// ============================================================================

#[tokio::test]
async fn loads_gltf_from_memory() {
    let loader = AssetLoader::default();
    let prefab = loader
        .load_async(AssetSource::bytes("box.gltf", box_gltf(MIN, MAX)))
        .await
        .unwrap();
    assert_normalized(&prefab);
}

#[tokio::test]
async fn loads_glb_from_memory() {
    let loader = AssetLoader::default();
    let prefab = loader
        .load_async(AssetSource::bytes("box.glb", box_glb(MIN, MAX)))
        .await
        .unwrap();
    assert_normalized(&prefab);
}

#[tokio::test]
async fn mislabelled_payload_still_loads() {
    // Claims to be JSON but carries a GLB container.
    let loader = AssetLoader::default();
    let prefab = loader
        .load_async(AssetSource::bytes("box.gltf", box_glb(MIN, MAX)))
        .await
        .unwrap();
    assert_normalized(&prefab);
}

#[tokio::test]
async fn loads_gltf_with_sibling_buffer_from_disk() {
    let dir = std::env::temp_dir().join(format!("anchorage-asset-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let doc = box_document(MIN, MAX, json!({ "byteLength": 96, "uri": "box%20data.bin" }));
    std::fs::write(dir.join("box data.bin"), box_corner_bytes(MIN, MAX)).unwrap();
    std::fs::write(dir.join("box.gltf"), serde_json::to_vec(&doc).unwrap()).unwrap();

    let loader = AssetLoader::default();
    let result = loader.load_async(AssetSource::from(dir.join("box.gltf"))).await;
    std::fs::remove_dir_all(&dir).ok();

    assert_normalized(&result.unwrap());
}

#[test]
fn blocking_load_uses_the_asset_runtime() {
    let loader = AssetLoader::default();
    let prefab = loader
        .load(AssetSource::bytes("box.glb", box_glb(MIN, MAX)))
        .unwrap();
    assert_normalized(&prefab);
}

#[tokio::test]
async fn flat_asset_is_not_blown_up() {
    // A 2 x 0 x 1 quad: the zero extent counts as 1, so 2 is the longest side.
    let loader = AssetLoader::new(0.5);
    let prefab = loader
        .load_async(AssetSource::bytes(
            "quad.gltf",
            box_gltf(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 1.0)),
        ))
        .await
        .unwrap();

    let size = world_bounds(&prefab).size();
    assert!(approx_vec3(size, Vec3::new(0.5, 0.0, 0.25)));
}

// ============================================================================
// Failures
// ============================================================================

fn with_required(extension: &str) -> Vec<u8> {
    let data = base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        box_corner_bytes(MIN, MAX),
    );
    let mut doc = box_document(
        MIN,
        MAX,
        json!({ "byteLength": 96, "uri": format!("data:application/octet-stream;base64,{data}") }),
    );
    doc["extensionsUsed"] = json!([extension]);
    doc["extensionsRequired"] = json!([extension]);
    serde_json::to_vec(&doc).unwrap()
}

#[tokio::test]
async fn required_draco_is_rejected() {
    let loader = AssetLoader::default();
    let err = loader
        .load_async(AssetSource::bytes(
            "draco.gltf",
            with_required("KHR_draco_mesh_compression"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::DecoderUnavailable(_)), "{err}");
}

#[tokio::test]
async fn required_meshopt_fails_after_decoder_release() {
    let decoder = Arc::new(GeometryDecoder::new());
    let loader = AssetLoader::with_decoder(0.3, Arc::clone(&decoder));
    assert!(loader.dispose());
    assert!(!loader.dispose());
    assert!(decoder.is_disposed());

    let err = loader
        .load_async(AssetSource::bytes("packed.gltf", with_required("EXT_meshopt_compression")))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::DecoderUnavailable(_)), "{err}");
}

#[tokio::test]
async fn garbage_is_a_decode_error() {
    let loader = AssetLoader::default();
    let err = loader
        .load_async(AssetSource::bytes("junk.glb", b"definitely not a model".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Decode(_)), "{err}");
}

#[tokio::test]
async fn in_memory_document_cannot_reference_siblings() {
    let doc = box_document(MIN, MAX, json!({ "byteLength": 96, "uri": "box.bin" }));
    let loader = AssetLoader::default();
    let err = loader
        .load_async(AssetSource::bytes("box.gltf", serde_json::to_vec(&doc).unwrap()))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::UnsupportedSource(_)), "{err}");
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let loader = AssetLoader::default();
    let err = loader
        .load_async(AssetSource::from("/nonexistent/anchorage/model.glb"))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Io(_)), "{err}");
}

#[tokio::test]
async fn short_buffer_is_rejected() {
    let data = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [0u8; 12]);
    let doc = box_document(
        MIN,
        MAX,
        json!({ "byteLength": 96, "uri": format!("data:application/octet-stream;base64,{data}") }),
    );
    let loader = AssetLoader::default();
    let err = loader
        .load_async(AssetSource::bytes("short.gltf", serde_json::to_vec(&doc).unwrap()))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Decode(_)), "{err}");
}

#[test]
fn oversized_accessor_count_is_a_decode_error() {
    let mut doc: serde_json::Value = serde_json::from_slice(&box_gltf(MIN, MAX)).unwrap();
    doc["accessors"][0]["count"] = json!(u64::MAX / 4);

    let loader = AssetLoader::default();
    let err = futures::executor::block_on(
        loader.load_async(AssetSource::bytes("huge.gltf", serde_json::to_vec(&doc).unwrap())),
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::Decode(_)), "{err}");
}

#[cfg(feature = "meshopt")]
#[tokio::test]
async fn meshopt_view_with_inconsistent_count_is_a_decode_error() {
    let mut doc: serde_json::Value =
        serde_json::from_slice(&with_required("EXT_meshopt_compression")).unwrap();
    doc["bufferViews"][0]["extensions"] = json!({
        "EXT_meshopt_compression": {
            "buffer": 0,
            "byteLength": 96,
            "byteStride": 12,
            "count": u64::MAX / 8,
            "mode": "ATTRIBUTES"
        }
    });

    let loader = AssetLoader::default();
    let err = loader
        .load_async(AssetSource::bytes("packed.gltf", serde_json::to_vec(&doc).unwrap()))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Decode(_)), "{err}");
}

#[tokio::test]
async fn panicking_blocking_work_is_a_join_error() {
    let err = run_blocking(|| -> u32 { panic!("decode worker died") })
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::TaskJoin(_)), "{err}");
}

// ============================================================================
// HTTP
// ============================================================================

/// Serves fixed responses on a local port until the test process exits.
/// Returns the base URL.
#[cfg(feature = "http")]
fn serve(routes: Vec<(&'static str, u16, Vec<u8>)>) -> String {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                    break;
                }
            }

            let path = request_line.split_whitespace().nth(1).unwrap_or("/");
            let (status, body) = routes
                .iter()
                .find(|(p, ..)| *p == path)
                .map_or((404, &[][..]), |(_, status, body)| (*status, body.as_slice()));
            let reason = if status == 200 { "OK" } else { "Error" };

            let head = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: model/gltf+json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
        }
    });

    format!("http://{addr}")
}

#[cfg(feature = "http")]
#[tokio::test]
async fn loads_gltf_over_http() {
    let base = serve(vec![("/models/box.gltf", 200, box_gltf(MIN, MAX))]);
    let loader = AssetLoader::default();
    let prefab = loader
        .load_async(AssetSource::from(format!("{base}/models/box.gltf")))
        .await
        .unwrap();
    assert_normalized(&prefab);
}

#[cfg(feature = "http")]
#[tokio::test]
async fn non_success_status_is_reported_with_its_code() {
    let base = serve(vec![("/models/gone.glb", 410, Vec::new())]);
    let loader = AssetLoader::default();

    let err = loader
        .load_async(AssetSource::from(format!("{base}/models/gone.glb")))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::HttpStatus { status: 410 }), "{err}");

    let err = loader
        .load_async(AssetSource::from(format!("{base}/models/missing.glb")))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::HttpStatus { status: 404 }), "{err}");
}
