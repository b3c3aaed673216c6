//! Anchorage
//!
//! Surface-anchored AR placement for glTF assets: load and normalize a model,
//! preview it on real-world surfaces found by hit testing, pin it with one
//! action and keep moving, scaling and rotating it with touch gestures.
//!
//! The host supplies the platform through the [`xr`] traits and a
//! [`Renderer`]; [`ArEngine`] does the rest.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod app;
pub mod assets;
pub mod engine;
pub mod errors;
pub mod gesture;
pub mod placement;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod settings;
pub mod utils;
pub mod xr;

pub use assets::{AssetLoader, AssetSource, Prefab};
pub use engine::{ArEngine, EngineEvent, UiState};
pub use errors::{Error, LoadError, Result, SessionError, TrackingError};
pub use gesture::{GestureMode, GestureRecognizer, TouchEvent, TouchPhase, TouchPoint};
pub use placement::{PlacementMachine, PlacementState};
pub use renderer::Renderer;
pub use resources::{BoundingBox, Plane, Ray};
pub use scene::{AssetNode, Camera, Node, Scene, Transform};
pub use settings::EngineSettings;
pub use xr::{
    HitTestResult, HitTestSource, Pose, ReferenceSpace, ReferenceSpaceType, XrFrame, XrRuntime,
    XrSession, XrSessionMode, is_ar_supported,
};
