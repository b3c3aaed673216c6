//! Asset Loader & Normalizer
//!
//! Fetches a glTF asset, decodes it off the frame loop and rescales it so its
//! longest bounding dimension equals the canonical size, centred on the
//! origin of a hidden wrapper node.

use std::sync::Arc;

use glam::Vec3;

use crate::assets::decoder::GeometryDecoder;
use crate::assets::io::{AssetReaderVariant, AssetSource};
use crate::assets::loaders;
use crate::assets::prefab::{Prefab, PrefabNode};
use crate::errors::LoadError;
use crate::settings::CANONICAL_SIZE;
use crate::utils::task::run_blocking;

/// Name of the wrapper node every normalized asset hangs under.
pub const ASSET_ROOT_NAME: &str = "asset_root";
/// Name of the node carrying the normalizing scale and offset.
pub const ASSET_CONTENT_NAME: &str = "asset_content";

const GLB_MAGIC: &[u8; 4] = b"glTF";

// ============================================================================
// Payload detection
// ============================================================================

/// How a fetched payload is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// GLB container.
    Binary,
    /// JSON document, external resources resolve against its location.
    Text,
    /// Nothing declared a type; decided by looking at the bytes.
    Unknown,
}

impl PayloadKind {
    /// Picks the decode path from the declared content type, then the file
    /// extension.
    #[must_use]
    pub fn sniff(content_type: Option<&str>, file_name: &str) -> Self {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());
        let ext = file_name
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match (mime.as_deref(), ext.as_deref()) {
            (Some("model/gltf-binary" | "application/octet-stream"), _) | (_, Some("glb")) => {
                Self::Binary
            }
            (Some("application/json" | "model/gltf+json"), _) | (_, Some("gltf")) => Self::Text,
            _ => Self::Unknown,
        }
    }

    /// Resolves `Unknown` against the payload itself.
    #[must_use]
    pub fn resolve(self, bytes: &[u8]) -> Self {
        match self {
            Self::Unknown if bytes.starts_with(GLB_MAGIC) => Self::Binary,
            Self::Unknown => Self::Text,
            known => known,
        }
    }
}

fn parse_payload(bytes: &[u8], kind: PayloadKind) -> Result<gltf::Gltf, LoadError> {
    match kind.resolve(bytes) {
        PayloadKind::Text if std::str::from_utf8(bytes).is_err() => {
            // Mislabelled binary: let the container parser have a go.
            log::warn!("Payload declared as glTF JSON is not UTF-8, trying binary decode");
            loaders::parse_document(bytes)
        }
        PayloadKind::Binary if !bytes.starts_with(GLB_MAGIC) => {
            log::warn!("Payload declared as GLB has no glTF magic, trying JSON decode");
            loaders::parse_document(bytes)
        }
        _ => loaders::parse_document(bytes),
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Wraps `prefab` so its longest dimension is `canonical_size` and its
/// bounding-box centre sits at the wrapper origin.
///
/// Zero extents count as 1 so flat or degenerate assets are not blown up;
/// an asset with no geometry keeps scale `canonical_size` and no offset.
/// The wrapper is hidden.
#[must_use]
pub fn normalize(mut prefab: Prefab, canonical_size: f32) -> Prefab {
    let bbox = prefab.bounding_box();
    let size = bbox.size();
    let center = bbox.center();

    let extent = |v: f32| if v > 0.0 { v } else { 1.0 };
    let max_dim = extent(size.x).max(extent(size.y)).max(extent(size.z));
    let scale = canonical_size / max_dim;

    let mut content = PrefabNode::with_name(ASSET_CONTENT_NAME);
    content.transform.scale = Vec3::splat(scale);
    content.transform.position = -center * scale;
    content.children_indices = std::mem::take(&mut prefab.root_indices);
    let content_index = prefab.push(content);

    let mut wrapper = PrefabNode::with_name(ASSET_ROOT_NAME);
    wrapper.visible = false;
    wrapper.children_indices = vec![content_index];
    let wrapper_index = prefab.push(wrapper);
    prefab.root_indices = vec![wrapper_index];

    log::debug!("Asset normalized: size {size}, center {center}, scale {scale}");
    prefab
}

// ============================================================================
// AssetLoader
// ============================================================================

/// Loads and normalizes glTF assets.
///
/// Cheap to clone; clones share the compressed-geometry decoder.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    decoder: Arc<GeometryDecoder>,
    canonical_size: f32,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new(CANONICAL_SIZE)
    }
}

impl AssetLoader {
    #[must_use]
    pub fn new(canonical_size: f32) -> Self {
        Self::with_decoder(canonical_size, Arc::new(GeometryDecoder::new()))
    }

    #[must_use]
    pub fn with_decoder(canonical_size: f32, decoder: Arc<GeometryDecoder>) -> Self {
        Self {
            decoder,
            canonical_size,
        }
    }

    #[inline]
    #[must_use]
    pub fn decoder(&self) -> &Arc<GeometryDecoder> {
        &self.decoder
    }

    #[inline]
    #[must_use]
    pub fn canonical_size(&self) -> f32 {
        self.canonical_size
    }

    /// Releases the shared decoder. Returns `true` the first time only.
    pub fn dispose(&self) -> bool {
        self.decoder.dispose()
    }

    /// Blocking load on the shared asset runtime.
    ///
    /// Must not be called from inside an async context.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(&self, source: impl Into<AssetSource>) -> Result<Prefab, LoadError> {
        crate::utils::task::get_asset_runtime().block_on(self.load_async(source.into()))
    }

    /// Fetches, decodes and normalizes an asset.
    pub async fn load_async(&self, source: AssetSource) -> Result<Prefab, LoadError> {
        log::info!("Loading asset: {}", source.name());

        let reader = AssetReaderVariant::from_source(&source)?;
        let payload = reader.read_source(&source).await?;
        let kind = PayloadKind::sniff(payload.content_type.as_deref(), source.file_name());
        log::debug!(
            "Fetched {} bytes (content type {:?}, decoding as {kind:?})",
            payload.bytes.len(),
            payload.content_type
        );

        let bytes = payload.bytes;
        let gltf = run_blocking(move || parse_payload(&bytes, kind)).await??;
        loaders::check_extensions(&gltf, &self.decoder)?;

        let buffers = loaders::load_buffers(&gltf, &reader).await?;

        let decoder = Arc::clone(&self.decoder);
        let canonical_size = self.canonical_size;
        let prefab = run_blocking(move || {
            loaders::build_prefab(&gltf, &buffers, &decoder).map(|p| normalize(p, canonical_size))
        })
        .await??;

        log::info!("Asset ready: {} ({} nodes)", source.name(), prefab.nodes.len());
        Ok(prefab)
    }
}
