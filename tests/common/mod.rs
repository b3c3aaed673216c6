//! Shared fixtures: glTF documents built in memory and a scripted XR platform.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use glam::{Mat4, Vec3};
use serde_json::{Value, json};

use anchorage::errors::{SessionError, TrackingError};
use anchorage::settings::SessionInit;
use anchorage::utils::task::{PlatformFuture, TaskSpawner};
use anchorage::xr::{
    HitTestResult, HitTestSource, Pose, ReferenceSpace, ReferenceSpaceType, XrFrame, XrRuntime,
    XrSession, XrSessionMode,
};
use anchorage::{AssetSource, Renderer, Scene};

pub const EPSILON: f32 = 1e-4;

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

pub fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
}

/// Angle equality modulo a full turn.
pub fn approx_angle(a: f32, b: f32) -> bool {
    let d = (a - b).rem_euclid(std::f32::consts::TAU);
    d < EPSILON || std::f32::consts::TAU - d < EPSILON
}

// ============================================================================
// glTF fixtures
// ============================================================================

/// The 8 corners of an axis-aligned box, as little-endian f32 triples.
pub fn box_corner_bytes(min: Vec3, max: Vec3) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 * 12);
    for i in 0..8 {
        let x = if i & 1 == 0 { min.x } else { max.x };
        let y = if i & 2 == 0 { min.y } else { max.y };
        let z = if i & 4 == 0 { min.z } else { max.z };
        for v in [x, y, z] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    bytes
}

/// glTF JSON for one node with one box mesh. `buffer` is the buffer object
/// to use (with or without a `uri`).
pub fn box_document(min: Vec3, max: Vec3, buffer: Value) -> Value {
    json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "box", "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "buffers": [buffer],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 96 }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 8,
            "type": "VEC3",
            "min": [min.x, min.y, min.z],
            "max": [max.x, max.y, max.z]
        }]
    })
}

/// Self-contained glTF JSON (buffer embedded as a base64 data URI).
pub fn box_gltf(min: Vec3, max: Vec3) -> Vec<u8> {
    let data = base64::engine::general_purpose::STANDARD.encode(box_corner_bytes(min, max));
    let doc = box_document(
        min,
        max,
        json!({ "byteLength": 96, "uri": format!("data:application/octet-stream;base64,{data}") }),
    );
    serde_json::to_vec(&doc).unwrap()
}

/// GLB container with the JSON chunk and the binary chunk.
pub fn box_glb(min: Vec3, max: Vec3) -> Vec<u8> {
    let doc = box_document(min, max, json!({ "byteLength": 96 }));
    glb(&doc, &box_corner_bytes(min, max))
}

pub fn glb(doc: &Value, bin: &[u8]) -> Vec<u8> {
    let mut json_chunk = serde_json::to_vec(doc).unwrap();
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }
    let mut bin_chunk = bin.to_vec();
    while bin_chunk.len() % 4 != 0 {
        bin_chunk.push(0);
    }

    let total = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    out.extend_from_slice(&json_chunk);
    out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
    out.extend_from_slice(&bin_chunk);
    out
}

/// The default test asset: a 4 x 4 x 1 box centred at (1, 0, 0).
pub fn box_source() -> AssetSource {
    AssetSource::bytes(
        "box.gltf",
        box_gltf(Vec3::new(-1.0, -2.0, -0.5), Vec3::new(3.0, 2.0, 0.5)),
    )
}

// ============================================================================
// Renderer
// ============================================================================

#[derive(Debug, Default)]
pub struct RendererLog {
    pub sizes: Vec<(u32, u32)>,
    pub animation_loop: Option<bool>,
    pub renders: usize,
    pub disposals: usize,
    pub last_visible_nodes: usize,
}

#[derive(Clone, Default)]
pub struct MockRenderer {
    pub log: Arc<Mutex<RendererLog>>,
}

impl Renderer for MockRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        self.log.lock().unwrap().sizes.push((width, height));
    }

    fn set_animation_loop(&mut self, enabled: bool) {
        self.log.lock().unwrap().animation_loop = Some(enabled);
    }

    fn render(&mut self, scene: &Scene, _camera: &anchorage::Camera) {
        let visible = scene
            .nodes
            .keys()
            .filter(|&h| scene.is_visible_in_hierarchy(h))
            .count();
        let mut log = self.log.lock().unwrap();
        log.renders += 1;
        log.last_visible_nodes = visible;
    }

    fn dispose(&mut self) {
        self.log.lock().unwrap().disposals += 1;
    }
}

// ============================================================================
// Runtime
// ============================================================================

#[derive(Clone, Default)]
pub struct MockRuntime {
    pub requests: Arc<AtomicUsize>,
    pub removals: Arc<AtomicUsize>,
    pub last_init: Arc<Mutex<Option<SessionInit>>>,
    pub reject: bool,
}

impl XrRuntime for MockRuntime {
    fn request_session(&self, init: &SessionInit) -> Result<(), SessionError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_init.lock().unwrap() = Some(init.clone());
        if self.reject {
            Err(SessionError::Rejected("denied by test".into()))
        } else {
            Ok(())
        }
    }

    fn remove_entry_point(&self) {
        self.removals.fetch_add(1, Ordering::SeqCst);
    }

    fn is_session_supported(
        &self,
        mode: XrSessionMode,
    ) -> PlatformFuture<'static, Result<bool, SessionError>> {
        let result = if self.reject {
            Err(SessionError::Unsupported("support check failed".into()))
        } else {
            Ok(mode == XrSessionMode::ImmersiveAr)
        };
        Box::pin(futures::future::ready(result))
    }
}

// ============================================================================
// Session, source, frame
// ============================================================================

#[derive(Debug, Default)]
pub struct SessionCounters {
    pub space_requests: AtomicUsize,
    pub source_requests: AtomicUsize,
    pub cancels: AtomicUsize,
}

impl SessionCounters {
    pub fn space_requests(&self) -> usize {
        self.space_requests.load(Ordering::SeqCst)
    }

    pub fn source_requests(&self) -> usize {
        self.source_requests.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MockSession {
    pub counters: Arc<SessionCounters>,
    pub fail_space: bool,
}

impl MockSession {
    pub fn new() -> (Arc<Self>, Arc<SessionCounters>) {
        let session = Arc::new(Self::default());
        let counters = Arc::clone(&session.counters);
        (session, counters)
    }
}

pub struct MockSource {
    counters: Arc<SessionCounters>,
}

impl HitTestSource for MockSource {
    fn cancel(&mut self) {
        self.counters.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

impl XrSession for MockSession {
    fn request_reference_space(
        &self,
        kind: ReferenceSpaceType,
    ) -> PlatformFuture<'static, Result<ReferenceSpace, TrackingError>> {
        self.counters.space_requests.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_space {
            Err(TrackingError::ReferenceSpace("no viewer space".into()))
        } else {
            Ok(ReferenceSpace::new(kind, "viewer-space"))
        };
        Box::pin(futures::future::ready(result))
    }

    fn request_hit_test_source(
        &self,
        _space: ReferenceSpace,
    ) -> PlatformFuture<'static, Result<Box<dyn HitTestSource>, TrackingError>> {
        self.counters.source_requests.fetch_add(1, Ordering::SeqCst);
        let source: Box<dyn HitTestSource> = Box::new(MockSource {
            counters: Arc::clone(&self.counters),
        });
        Box::pin(futures::future::ready(Ok(source)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockFrame {
    pub viewer: Option<Pose>,
    pub hits: Vec<HitTestResult>,
}

impl MockFrame {
    pub fn hit_at(position: Vec3) -> Self {
        Self {
            viewer: None,
            hits: vec![HitTestResult::at(Mat4::from_translation(position))],
        }
    }

    pub fn miss() -> Self {
        Self::default()
    }

    pub fn with_viewer(mut self, pose: Pose) -> Self {
        self.viewer = Some(pose);
        self
    }
}

impl XrFrame for MockFrame {
    fn viewer_pose(&self) -> Option<Pose> {
        self.viewer
    }

    fn hit_test_results(&self, _source: &dyn HitTestSource) -> Vec<HitTestResult> {
        self.hits.clone()
    }
}

// ============================================================================
// Spawner that holds tasks until told to run them
// ============================================================================

#[derive(Default)]
pub struct ManualSpawner {
    queue: Mutex<Vec<PlatformFuture<'static, ()>>>,
}

impl ManualSpawner {
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn run_all(&self) {
        let tasks: Vec<_> = self.queue.lock().unwrap().drain(..).collect();
        for task in tasks {
            futures::executor::block_on(task);
        }
    }
}

impl TaskSpawner for ManualSpawner {
    fn spawn(&self, task: PlatformFuture<'static, ()>) {
        self.queue.lock().unwrap().push(task);
    }
}
