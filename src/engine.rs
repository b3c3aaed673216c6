//! Engine Core Module
//!
//! [`ArEngine`] owns every piece of per-session state and is driven entirely
//! by host callbacks, all on one thread:
//!
//! - [`on_frame`](ArEngine::on_frame) once per display refresh
//! - [`on_touch`](ArEngine::on_touch) for every touch event
//! - [`on_session_start`](ArEngine::on_session_start) /
//!   [`on_session_end`](ArEngine::on_session_end) from the XR runtime
//!
//! Async work (asset loads, tracking acquisition) runs on a [`TaskSpawner`]
//! and reports back through a channel drained at the start of each frame, so
//! the frame loop never blocks and never observes a half-built asset.
//!
//! # Example
//!
//! ```rust,ignore
//! use anchorage::{ArEngine, EngineSettings};
//!
//! let mut engine = ArEngine::new(renderer, runtime, EngineSettings::default());
//! engine.start("https://example.com/chair.glb")?;
//!
//! // Host callbacks
//! engine.on_session_start(session);
//! engine.on_frame(Some(&frame));
//! engine.on_touch(&event);
//! if engine.ui_state().placement_affordance_visible {
//!     engine.place();
//! }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::assets::io::AssetSource;
use crate::assets::loader::AssetLoader;
use crate::assets::prefab::Prefab;
use crate::errors::{LoadError, SessionError, TrackingError};
use crate::gesture::{GestureMode, GestureRecognizer, TouchEvent};
use crate::placement::{PlacementMachine, PlacementState};
use crate::renderer::Renderer;
use crate::scene::{AssetNode, Camera, Scene};
use crate::settings::{EngineSettings, Viewport};
use crate::utils::task::{TaskSpawner, default_spawner};
use crate::xr::{
    HitTestController, HitTestPoll, HitTestSource, SessionLifecycle, SessionState, XrFrame,
    XrRuntime, XrSession,
};

// ============================================================================
// Output signals
// ============================================================================

/// The three booleans a host UI binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UiState {
    pub placement_affordance_visible: bool,
    pub asset_placed: bool,
    pub session_active: bool,
}

/// Notifications for the host, drained with [`ArEngine::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    UiChanged(UiState),
    AssetLoaded,
    /// A load failed; the message is meant for the user.
    LoadFailed(String),
    Placed,
}

/// Results of background work, tagged with the generation that started it.
enum Completion {
    AssetLoaded {
        generation: u64,
        result: Result<Prefab, LoadError>,
    },
    TrackingAcquired {
        session_generation: u64,
        result: Result<Box<dyn HitTestSource>, TrackingError>,
    },
}

/// Wrapper transform carried over when an asset is swapped after placement.
#[derive(Debug, Clone, Copy)]
struct RetainedPlacement {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    visible: bool,
}

// ============================================================================
// ArEngine
// ============================================================================

pub struct ArEngine {
    settings: EngineSettings,

    renderer: Option<Box<dyn Renderer>>,
    runtime: Box<dyn XrRuntime>,
    spawner: Arc<dyn TaskSpawner>,
    loader: AssetLoader,

    scene: Scene,
    camera: Camera,
    viewport: Viewport,

    session: SessionLifecycle,
    hit_test: HitTestController,
    placement: PlacementMachine,
    gestures: GestureRecognizer,

    asset: Option<AssetNode>,
    prefab: Option<Arc<Prefab>>,
    retained: Option<RetainedPlacement>,
    load_generation: u64,

    completion_tx: flume::Sender<Completion>,
    completion_rx: flume::Receiver<Completion>,
    events: VecDeque<EngineEvent>,
    ui: UiState,

    entry_point_installed: bool,
    disposed: bool,
}

impl ArEngine {
    /// Creates the engine and sizes the renderer and camera from
    /// `settings.viewport`.
    pub fn new(
        mut renderer: Box<dyn Renderer>,
        runtime: Box<dyn XrRuntime>,
        settings: EngineSettings,
    ) -> Self {
        let viewport = settings.viewport;
        renderer.set_size(viewport.width, viewport.height);

        let camera = Camera::from_settings(&settings.camera, viewport.aspect());
        let loader = AssetLoader::new(settings.canonical_size);
        let gestures = GestureRecognizer::new(settings.scale_range);
        let (completion_tx, completion_rx) = flume::unbounded();

        log::info!(
            "AR engine created ({}x{}, canonical size {})",
            viewport.width,
            viewport.height,
            settings.canonical_size
        );

        Self {
            settings,
            renderer: Some(renderer),
            runtime,
            spawner: default_spawner(),
            loader,
            scene: Scene::new(),
            camera,
            viewport,
            session: SessionLifecycle::new(),
            hit_test: HitTestController::new(),
            placement: PlacementMachine::new(),
            gestures,
            asset: None,
            prefab: None,
            retained: None,
            load_generation: 0,
            completion_tx,
            completion_rx,
            events: VecDeque::new(),
            ui: UiState::default(),
            entry_point_installed: false,
            disposed: false,
        }
    }

    /// Replaces the spawner background work runs on.
    #[must_use]
    pub fn with_spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Installs the AR entry point, enables the render callback and starts
    /// loading `asset`.
    pub fn start(&mut self, asset: impl Into<AssetSource>) -> Result<(), SessionError> {
        if self.disposed {
            return Err(SessionError::Rejected("engine has been disposed".to_string()));
        }

        self.runtime.request_session(&self.settings.session)?;
        self.entry_point_installed = true;

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_animation_loop(true);
        }

        self.load(asset);
        Ok(())
    }

    /// Loads (or reloads) an asset. The current asset is removed right away;
    /// results of earlier loads still in flight are discarded.
    pub fn load(&mut self, asset: impl Into<AssetSource>) {
        if self.disposed {
            log::warn!("Ignoring load on a disposed engine");
            return;
        }

        if let Some(previous) = self.asset.take() {
            if self.placement.is_placed() {
                self.retained = Some(self.capture_placement(previous));
            }
            previous.destroy(&mut self.scene);
        }
        self.prefab = None;

        self.load_generation += 1;
        let generation = self.load_generation;
        let source = asset.into();
        let loader = self.loader.clone();
        let tx = self.completion_tx.clone();

        log::debug!("Load #{generation} queued: {}", source.name());
        self.spawner.spawn(Box::pin(async move {
            let result = loader.load_async(source).await;
            // The receiver only disappears with the engine.
            let _ = tx.send(Completion::AssetLoaded { generation, result });
        }));
    }

    /// The platform started an AR session.
    pub fn on_session_start(&mut self, session: Arc<dyn XrSession>) {
        if self.disposed {
            return;
        }

        // A still-live source would belong to a session the platform never ended.
        self.hit_test.cancel();
        self.hit_test.reset();
        self.placement.reset();
        self.gestures.reset();
        self.retained = None;

        let generation = self.session.begin(session);

        if self.asset.is_none()
            && let Some(prefab) = self.prefab.clone()
        {
            self.instantiate_asset(&prefab);
        }

        log::info!("AR session #{generation} started");
        self.sync_ui();
    }

    /// The platform ended the AR session.
    pub fn on_session_end(&mut self) {
        if !self.session.end() {
            return;
        }

        self.hit_test.cancel();
        self.hit_test.reset();

        if let Some(asset) = self.asset.take() {
            asset.destroy(&mut self.scene);
        }
        self.placement.reset();
        self.gestures.reset();
        self.retained = None;

        log::info!("AR session #{} ended", self.session.generation());
        self.sync_ui();
    }

    /// Resizes the camera projection and the renderer.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
        self.camera.set_aspect(self.viewport.aspect());
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_size(width, height);
        }
    }

    /// Stops rendering, removes the entry point, releases the renderer and
    /// the geometry decoder. Safe to call any number of times.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }

        self.on_session_end();
        self.disposed = true;

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_animation_loop(false);
        }
        if self.entry_point_installed {
            self.runtime.remove_entry_point();
            self.entry_point_installed = false;
        }
        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose();
        }
        self.loader.dispose();

        log::info!("AR engine disposed");
    }

    // ========================================================================
    // Per-frame
    // ========================================================================

    /// Runs one frame. `frame` is `None` outside an AR session.
    pub fn on_frame(&mut self, frame: Option<&dyn XrFrame>) {
        if self.disposed {
            return;
        }

        self.drain_completions();

        if let Some(frame) = frame {
            if let Some(viewer) = frame.viewer_pose() {
                self.camera.update_from_viewer(viewer.position, viewer.orientation);
            }

            if !self.placement.is_placed() {
                self.request_tracking();
                self.track_surface(frame);
            }
        }

        self.scene.update_matrix_world();
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(&self.scene, &self.camera);
        }

        self.sync_ui();
    }

    fn request_tracking(&mut self) {
        if !self.session.is_active() {
            return;
        }
        let Some(session) = self.session.session() else {
            return;
        };
        let Some(acquire) = self.hit_test.request_if_needed(session) else {
            return;
        };

        let session_generation = self.session.generation();
        let tx = self.completion_tx.clone();
        log::debug!("Requesting hit-test source for session #{session_generation}");

        self.spawner.spawn(Box::pin(async move {
            let result = acquire.await;
            let _ = tx.send(Completion::TrackingAcquired {
                session_generation,
                result,
            });
        }));
    }

    fn track_surface(&mut self, frame: &dyn XrFrame) {
        let Some(asset) = self.asset else {
            return;
        };

        match self.hit_test.poll(frame) {
            HitTestPoll::NoSource => {}
            HitTestPoll::Hit(pose) => {
                if !self.gestures.is_active() {
                    asset.apply_pose(&mut self.scene, &pose);
                }
                asset.set_visible(&mut self.scene, true);
                self.placement.on_tracking(true);
            }
            HitTestPoll::Miss => {
                asset.set_visible(&mut self.scene, false);
                self.placement.on_tracking(false);
            }
        }
    }

    fn drain_completions(&mut self) {
        let pending: Vec<Completion> = self.completion_rx.try_iter().collect();

        for completion in pending {
            match completion {
                Completion::AssetLoaded { generation, result } => {
                    self.on_asset_loaded(generation, result);
                }
                Completion::TrackingAcquired {
                    session_generation,
                    result,
                } => self.on_tracking_acquired(session_generation, result),
            }
        }
    }

    fn on_asset_loaded(&mut self, generation: u64, result: Result<Prefab, LoadError>) {
        if generation != self.load_generation {
            log::debug!("Discarding stale load #{generation}");
            return;
        }

        match result {
            Ok(prefab) => {
                let prefab = Arc::new(prefab);
                self.instantiate_asset(&prefab);
                self.prefab = Some(prefab);
                self.events.push_back(EngineEvent::AssetLoaded);
            }
            Err(e) => {
                log::error!("Failed to load asset: {e}");
                self.events
                    .push_back(EngineEvent::LoadFailed(format!("Failed to load 3D model: {e}")));
            }
        }
    }

    fn on_tracking_acquired(
        &mut self,
        session_generation: u64,
        result: Result<Box<dyn HitTestSource>, TrackingError>,
    ) {
        let current = self.session.is_current(session_generation);

        match result {
            Ok(mut source) => {
                if current && !self.placement.is_placed() {
                    self.hit_test.install(source);
                } else {
                    log::debug!("Cancelling hit-test source that arrived too late");
                    source.cancel();
                }
            }
            Err(e) if current => log::error!("Surface tracking unavailable: {e}"),
            Err(e) => log::debug!("Ignoring tracking failure of a past session: {e}"),
        }
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Feeds one touch event to the gesture recognizer.
    pub fn on_touch(&mut self, event: &TouchEvent) {
        if self.disposed {
            return;
        }
        let target = self
            .asset
            .and_then(|asset| asset.transform_mut(&mut self.scene));
        self.gestures.handle(event, target, &self.camera, self.viewport);
    }

    /// Pins the previewed asset. Returns whether it was placed.
    pub fn place(&mut self) -> bool {
        if !self.placement.place(self.asset.is_some()) {
            return false;
        }

        self.hit_test.cancel();
        log::info!("Asset placed");
        self.events.push_back(EngineEvent::Placed);
        self.sync_ui();
        true
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn instantiate_asset(&mut self, prefab: &Prefab) {
        if let Some(previous) = self.asset.take() {
            previous.destroy(&mut self.scene);
        }

        let asset = AssetNode::instantiate(&mut self.scene, prefab);
        if let Some(retained) = self.retained.take() {
            if let Some(t) = asset.transform_mut(&mut self.scene) {
                t.position = retained.position;
                t.rotation = retained.rotation;
                t.scale = retained.scale;
            }
            asset.set_visible(&mut self.scene, retained.visible);
        }
        self.asset = Some(asset);
    }

    fn capture_placement(&self, asset: AssetNode) -> RetainedPlacement {
        let (position, rotation, scale) = asset
            .transform(&self.scene)
            .map_or((Vec3::ZERO, Quat::IDENTITY, Vec3::ONE), |t| {
                (t.position, t.rotation, t.scale)
            });
        RetainedPlacement {
            position,
            rotation,
            scale,
            visible: asset.is_visible(&self.scene),
        }
    }

    fn sync_ui(&mut self) {
        let session_active = self.session.is_active();
        let next = UiState {
            placement_affordance_visible: session_active
                && self.asset.is_some()
                && self.placement.affordance_visible(),
            asset_placed: self.placement.is_placed(),
            session_active,
        };

        if next != self.ui {
            self.ui = next;
            self.events.push_back(EngineEvent::UiChanged(next));
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn ui_state(&self) -> UiState {
        self.ui
    }

    /// Takes every event queued since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }

    #[inline]
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[inline]
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    #[must_use]
    pub fn asset(&self) -> Option<AssetNode> {
        self.asset
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    #[must_use]
    pub fn placement_state(&self) -> PlacementState {
        self.placement.state()
    }

    #[inline]
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    #[inline]
    #[must_use]
    pub fn gesture_mode(&self) -> GestureMode {
        self.gestures.mode()
    }

    /// Whether a hit-test source is currently live.
    #[inline]
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.hit_test.has_source()
    }

    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[inline]
    #[must_use]
    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }
}

impl Drop for ArEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}
