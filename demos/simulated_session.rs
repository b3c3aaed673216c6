//! Simulated AR session.
//!
//! Drives the engine through a scripted session without any XR hardware:
//! the surface appears, flickers out, comes back, gets placed, and is then
//! dragged, pinched and twisted.
//!
//! ```text
//! cargo run --example simulated_session [path/to/model.glb]
//! RUST_LOG=debug cargo run --example simulated_session
//! ```

use std::sync::Arc;

use anyhow::Context;
use base64::Engine as _;
use glam::{Mat4, Quat, Vec2, Vec3};

use anchorage::errors::{SessionError, TrackingError};
use anchorage::settings::SessionInit;
use anchorage::utils::{InlineSpawner, PlatformFuture};
use anchorage::{
    ArEngine, AssetSource, Camera, EngineEvent, EngineSettings, HitTestResult, HitTestSource,
    Pose, ReferenceSpace, ReferenceSpaceType, Renderer, Scene, TouchEvent, TouchPhase, TouchPoint,
    XrFrame, XrRuntime, XrSession, XrSessionMode, is_ar_supported,
};

// ============================================================================
// Simulated platform
// ============================================================================

/// Logs what a real renderer would draw.
struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        log::info!("renderer: {width}x{height}");
    }

    fn set_animation_loop(&mut self, enabled: bool) {
        log::info!("renderer: animation loop {}", if enabled { "on" } else { "off" });
    }

    fn render(&mut self, scene: &Scene, _camera: &Camera) {
        let visible = scene
            .nodes
            .keys()
            .filter(|&h| scene.is_visible_in_hierarchy(h))
            .count();
        log::trace!("renderer: {visible} visible nodes");
    }

    fn dispose(&mut self) {
        log::info!("renderer: disposed");
    }
}

struct SimRuntime;

impl XrRuntime for SimRuntime {
    fn request_session(&self, init: &SessionInit) -> Result<(), SessionError> {
        log::info!(
            "runtime: entry point installed (required {:?}, optional {:?})",
            init.required_features,
            init.optional_features
        );
        Ok(())
    }

    fn remove_entry_point(&self) {
        log::info!("runtime: entry point removed");
    }

    fn is_session_supported(
        &self,
        mode: XrSessionMode,
    ) -> PlatformFuture<'static, Result<bool, SessionError>> {
        Box::pin(futures::future::ready(Ok(mode == XrSessionMode::ImmersiveAr)))
    }
}

struct SimSession;

struct SimSource;

impl HitTestSource for SimSource {
    fn cancel(&mut self) {
        log::info!("session: hit-test source cancelled");
    }
}

impl XrSession for SimSession {
    fn request_reference_space(
        &self,
        kind: ReferenceSpaceType,
    ) -> PlatformFuture<'static, Result<ReferenceSpace, TrackingError>> {
        Box::pin(futures::future::ready(Ok(ReferenceSpace::new(kind, ()))))
    }

    fn request_hit_test_source(
        &self,
        _space: ReferenceSpace,
    ) -> PlatformFuture<'static, Result<Box<dyn HitTestSource>, TrackingError>> {
        let source: Box<dyn HitTestSource> = Box::new(SimSource);
        Box::pin(futures::future::ready(Ok(source)))
    }
}

/// One frame of the script: where the viewer is and what the floor reports.
struct SimFrame {
    viewer: Pose,
    floor: Option<Vec3>,
}

impl XrFrame for SimFrame {
    fn viewer_pose(&self) -> Option<Pose> {
        Some(self.viewer)
    }

    fn hit_test_results(&self, _source: &dyn HitTestSource) -> Vec<HitTestResult> {
        self.floor
            .map(|p| HitTestResult::at(Mat4::from_translation(p)))
            .into_iter()
            .collect()
    }
}

// ============================================================================
// Demo asset
// ============================================================================

/// A 1 x 2 x 1 box as self-contained glTF JSON.
fn demo_box() -> AssetSource {
    let mut bytes = Vec::with_capacity(96);
    for i in 0..8u8 {
        let corner = Vec3::new(
            f32::from(i & 1),
            f32::from((i >> 1) & 1) * 2.0,
            f32::from((i >> 2) & 1),
        );
        for v in corner.to_array() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    let data = base64::engine::general_purpose::STANDARD.encode(&bytes);

    let doc = serde_json::json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "crate", "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "buffers": [{
            "byteLength": 96,
            "uri": format!("data:application/octet-stream;base64,{data}")
        }],
        "bufferViews": [{ "buffer": 0, "byteLength": 96 }],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 8, "type": "VEC3",
            "min": [0.0, 0.0, 0.0], "max": [1.0, 2.0, 1.0]
        }]
    });

    AssetSource::bytes("crate.gltf", doc.to_string().into_bytes())
}

fn touch(phase: TouchPhase, points: &[(u64, f32, f32)]) -> TouchEvent {
    TouchEvent::new(
        phase,
        points
            .iter()
            .map(|&(id, x, y)| TouchPoint::new(id, Vec2::new(x, y))),
    )
}

fn report(engine: &mut ArEngine) {
    for event in engine.drain_events() {
        match event {
            EngineEvent::UiChanged(ui) => log::info!(
                "ui: place button {}, placed {}, session {}",
                ui.placement_affordance_visible,
                ui.asset_placed,
                ui.session_active
            ),
            EngineEvent::AssetLoaded => log::info!("asset loaded"),
            EngineEvent::LoadFailed(message) => log::error!("{message}"),
            EngineEvent::Placed => log::info!("asset placed"),
        }
    }
}

// ============================================================================
// Script
// ============================================================================

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let source = match std::env::args().nth(1) {
        Some(path) => AssetSource::from(path),
        None => demo_box(),
    };

    let runtime = SimRuntime;
    let supported = futures::executor::block_on(is_ar_supported(&runtime));
    log::info!("immersive AR supported: {supported}");

    let mut engine = ArEngine::new(
        Box::new(ConsoleRenderer),
        Box::new(runtime),
        EngineSettings::default(),
    )
    .with_spawner(Arc::new(InlineSpawner));

    engine.start(source).context("starting AR")?;
    engine.on_frame(None);
    report(&mut engine);
    anyhow::ensure!(engine.asset().is_some(), "asset did not load");

    engine.on_session_start(Arc::new(SimSession));

    let viewer = Pose::new(Vec3::new(0.0, 1.6, 0.0), Quat::from_rotation_x(-0.6));
    for i in 0..40u16 {
        let floor = match i {
            0..5 | 18..24 => None,
            _ => Some(Vec3::new(f32::from(i) * 0.01, 0.0, -1.5)),
        };
        engine.on_frame(Some(&SimFrame { viewer, floor }));
        report(&mut engine);
    }

    if engine.ui_state().placement_affordance_visible {
        engine.place();
        report(&mut engine);
    }

    let scripted = [
        touch(TouchPhase::Start, &[(1, 640.0, 500.0)]),
        touch(TouchPhase::Move, &[(1, 760.0, 540.0)]),
        touch(TouchPhase::Start, &[(1, 760.0, 540.0), (2, 860.0, 540.0)]),
        touch(TouchPhase::Move, &[(1, 740.0, 540.0), (2, 900.0, 580.0)]),
        touch(TouchPhase::End, &[(1, 740.0, 540.0)]),
        touch(TouchPhase::End, &[]),
    ];
    for event in &scripted {
        engine.on_touch(event);
        engine.on_frame(Some(&SimFrame { viewer, floor: None }));
    }

    if let Some(asset) = engine.asset() {
        let scene = engine.scene();
        log::info!(
            "final pose: position {}, scale {}, yaw {:.2} rad",
            asset.position(scene),
            asset.scale(scene),
            asset.rotation_y(scene)
        );
    }

    engine.on_session_end();
    engine.dispose();
    report(&mut engine);
    Ok(())
}
