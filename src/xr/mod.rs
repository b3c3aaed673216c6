//! XR Platform Boundary
//!
//! Traits the host implements over its XR runtime (WebXR in a browser, a
//! native AR SDK, or a simulation in tests), plus the small value types that
//! cross the boundary.

pub mod session;

pub use hit_test::{HitTestController, HitTestPoll};
pub use session::{SessionLifecycle, SessionState};

use std::any::Any;

use glam::{Mat4, Quat, Vec3};

use crate::errors::{SessionError, TrackingError};
use crate::settings::SessionInit;
use crate::utils::task::{MaybeSend, MaybeSync, PlatformFuture};

// ============================================================================
// Value types
// ============================================================================

/// World-space rigid transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    #[must_use]
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Decomposes a pose matrix; any scale in it is dropped.
    #[must_use]
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (_, orientation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            orientation: orientation.normalize(),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// One surface intersection reported by a hit-test source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HitTestResult {
    /// Pose matrix in the session's reference space, when the platform can
    /// express one.
    pub pose: Option<Mat4>,
}

impl HitTestResult {
    #[must_use]
    pub fn at(pose: Mat4) -> Self {
        Self { pose: Some(pose) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XrSessionMode {
    ImmersiveAr,
    ImmersiveVr,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceSpaceType {
    Viewer,
    Local,
    LocalFloor,
}

/// Opaque platform object carried through the engine untouched.
pub trait PlatformObject: Any + MaybeSend {}
impl<T: Any + MaybeSend> PlatformObject for T {}

/// A reference space handed out by the platform.
pub struct ReferenceSpace {
    pub kind: ReferenceSpaceType,
    handle: Box<dyn PlatformObject>,
}

impl ReferenceSpace {
    pub fn new(kind: ReferenceSpaceType, handle: impl PlatformObject) -> Self {
        Self {
            kind,
            handle: Box::new(handle),
        }
    }

    /// The platform handle, if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let any: &dyn Any = self.handle.as_ref();
        any.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for ReferenceSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceSpace").field("kind", &self.kind).finish_non_exhaustive()
    }
}

// ============================================================================
// Platform traits
// ============================================================================

/// Per-session surface query. Must be cancelled exactly once.
pub trait HitTestSource: MaybeSend {
    fn cancel(&mut self);
}

/// Live AR session.
pub trait XrSession: MaybeSend + MaybeSync {
    fn request_reference_space(
        &self,
        kind: ReferenceSpaceType,
    ) -> PlatformFuture<'static, Result<ReferenceSpace, TrackingError>>;

    fn request_hit_test_source(
        &self,
        space: ReferenceSpace,
    ) -> PlatformFuture<'static, Result<Box<dyn HitTestSource>, TrackingError>>;
}

/// One display frame of a running session.
pub trait XrFrame {
    /// Viewer pose in world space, if tracking is available this frame.
    fn viewer_pose(&self) -> Option<Pose>;

    /// Results for `source`, best-ranked first.
    fn hit_test_results(&self, source: &dyn HitTestSource) -> Vec<HitTestResult>;
}

/// Entry point to the platform's XR runtime.
pub trait XrRuntime {
    /// Installs the "enter AR" entry point; the platform later reports the
    /// session through [`ArEngine::on_session_start`](crate::engine::ArEngine::on_session_start).
    fn request_session(&self, init: &SessionInit) -> Result<(), SessionError>;

    /// Removes whatever `request_session` installed.
    fn remove_entry_point(&self);

    fn is_session_supported(
        &self,
        mode: XrSessionMode,
    ) -> PlatformFuture<'static, Result<bool, SessionError>>;
}

/// Whether the runtime can start an immersive AR session. Support check failures
/// count as "no".
pub async fn is_ar_supported(runtime: &dyn XrRuntime) -> bool {
    match runtime.is_session_supported(XrSessionMode::ImmersiveAr).await {
        Ok(supported) => supported,
        Err(e) => {
            log::warn!("AR support check failed: {e}");
            false
        }
    }
}
