//! Asset Pipeline
//!
//! Source → bytes ([`io`]) → glTF document ([`loaders`]) → normalized
//! [`Prefab`] ([`loader`]), ready to be instantiated into a
//! [`Scene`](crate::scene::Scene).

pub mod decoder;
pub mod io;
pub mod loader;
pub mod loaders;
pub mod prefab;

pub use decoder::GeometryDecoder;
pub use io::{AssetReaderVariant, AssetSource, Payload};
pub use loader::{AssetLoader, PayloadKind, normalize};
pub use prefab::{Prefab, PrefabNode};
