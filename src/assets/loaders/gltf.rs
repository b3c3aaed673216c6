//! glTF 2.0 → [`Prefab`]
//!
//! Builds a handle-free node/mesh graph from a parsed document. Only what the
//! placement engine needs survives: hierarchy, local TRS, names and the
//! vertex positions/indices used for bounds. Materials and textures are the
//! host renderer's business.

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::assets::decoder::{GeometryDecoder, MESHOPT_EXTENSION, MeshoptView};
use crate::assets::io::AssetReaderVariant;
use crate::assets::prefab::{Prefab, PrefabNode};
use crate::errors::LoadError;
use crate::resources::geometry::BoundingBox;
use crate::resources::mesh::{Mesh, Primitive};

pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Extensions that change how geometry must be read; anything else in
/// `extensionsRequired` only affects appearance.
const GEOMETRY_EXTENSIONS: &[&str] = &[MESHOPT_EXTENSION, "KHR_mesh_quantization"];

// ============================================================================
// Document parsing
// ============================================================================

/// Parses a glTF JSON document or a GLB container without strict
/// validation, matching what lenient web viewers accept.
pub fn parse_document(bytes: &[u8]) -> Result<gltf::Gltf, LoadError> {
    // A UTF-8 BOM in front of the JSON trips serde.
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    Ok(gltf::Gltf::from_slice_without_validation(bytes)?)
}

/// Fails early for required extensions no decoder here can honour.
pub fn check_extensions(gltf: &gltf::Gltf, decoder: &GeometryDecoder) -> Result<(), LoadError> {
    let required: Vec<&str> = gltf.extensions_required().collect();

    if required.contains(&DRACO_EXTENSION) {
        return Err(LoadError::DecoderUnavailable(format!(
            "{DRACO_EXTENSION} is required but no Draco decoder is available"
        )));
    }

    if required.contains(&MESHOPT_EXTENSION) && !decoder.is_available() {
        return Err(LoadError::DecoderUnavailable(format!(
            "{MESHOPT_EXTENSION} is required but the geometry decoder is not available"
        )));
    }

    let cosmetic: Vec<_> = required
        .iter()
        .filter(|ext| !GEOMETRY_EXTENSIONS.contains(ext))
        .collect();
    if !cosmetic.is_empty() {
        log::warn!("glTF requires extensions that only affect appearance: {cosmetic:?}");
    }

    if gltf.extensions_used().any(|ext| ext == DRACO_EXTENSION) {
        log::warn!("{DRACO_EXTENSION} is used but not required, reading uncompressed fallback data");
    }

    Ok(())
}

// ============================================================================
// Buffers
// ============================================================================

/// Resolves every buffer: the GLB binary chunk, `data:` URIs and relative
/// URIs through `reader`. Meshopt fallback buffers stay empty.
pub async fn load_buffers(
    gltf: &gltf::Gltf,
    reader: &AssetReaderVariant,
) -> Result<Vec<Vec<u8>>, LoadError> {
    let mut blob = gltf.blob.clone();
    let mut buffers = Vec::with_capacity(gltf.buffers().count());

    for buffer in gltf.buffers() {
        let is_fallback = buffer
            .extension_value(MESHOPT_EXTENSION)
            .and_then(|ext| ext.get("fallback"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let data = match buffer.source() {
            _ if is_fallback => Vec::new(),
            gltf::buffer::Source::Bin => blob.take().ok_or_else(|| {
                LoadError::Decode(format!(
                    "buffer {} refers to a missing GLB binary chunk",
                    buffer.index()
                ))
            })?,
            gltf::buffer::Source::Uri(uri) => reader.read_bytes(uri).await?,
        };

        if data.len() < buffer.length() && !is_fallback {
            return Err(LoadError::Decode(format!(
                "buffer {} holds {} bytes, {} declared",
                buffer.index(),
                data.len(),
                buffer.length()
            )));
        }
        buffers.push(data);
    }

    Ok(buffers)
}

/// Decodes all meshopt-compressed buffer views, keyed by view index.
fn decode_compressed_views(
    gltf: &gltf::Gltf,
    buffers: &[Vec<u8>],
    decoder: &GeometryDecoder,
) -> Result<FxHashMap<usize, Vec<u8>>, LoadError> {
    let mut decoded = FxHashMap::default();

    for view in gltf.views() {
        let Some(value) = view.extension_value(MESHOPT_EXTENSION) else {
            continue;
        };

        if !decoder.is_available() {
            let fallback_len = buffers.get(view.buffer().index()).map_or(0, Vec::len);
            if view
                .offset()
                .checked_add(view.length())
                .is_some_and(|end| end <= fallback_len)
            {
                log::warn!(
                    "Buffer view {} is meshopt-compressed, reading its uncompressed fallback",
                    view.index()
                );
                continue;
            }
            return Err(LoadError::DecoderUnavailable(format!(
                "buffer view {} is meshopt-compressed and has no fallback data",
                view.index()
            )));
        }

        let ext: MeshoptView = serde_json::from_value(value.clone()).map_err(|e| {
            LoadError::Decode(format!("invalid {MESHOPT_EXTENSION} on view {}: {e}", view.index()))
        })?;
        let source = buffers.get(ext.buffer).ok_or_else(|| {
            LoadError::Decode(format!("meshopt source buffer {} does not exist", ext.buffer))
        })?;

        if ext.count.checked_mul(ext.byte_stride) != Some(view.length()) {
            return Err(LoadError::Decode(format!(
                "meshopt view {} decodes to {} x {} bytes, expected {}",
                view.index(),
                ext.count,
                ext.byte_stride,
                view.length()
            )));
        }

        decoded.insert(view.index(), decoder.decode_view(&ext, source)?);
    }

    Ok(decoded)
}

// ============================================================================
// Accessor reading
// ============================================================================

struct BufferData<'a> {
    buffers: &'a [Vec<u8>],
    decoded: FxHashMap<usize, Vec<u8>>,
}

impl BufferData<'_> {
    fn view_bytes(&self, view: &gltf::buffer::View) -> Result<&[u8], LoadError> {
        if let Some(bytes) = self.decoded.get(&view.index()) {
            return Ok(bytes);
        }

        let buffer = self.buffers.get(view.buffer().index()).ok_or_else(|| {
            LoadError::Decode(format!("buffer {} does not exist", view.buffer().index()))
        })?;
        view.offset()
            .checked_add(view.length())
            .and_then(|end| buffer.get(view.offset()..end))
            .ok_or_else(|| LoadError::Decode(format!("buffer view {} is out of range", view.index())))
    }

    /// Element byte slices of a non-sparse accessor; `None` when there is no
    /// backing view.
    fn elements<'s>(
        &'s self,
        accessor: &gltf::Accessor,
    ) -> Result<Option<impl Iterator<Item = &'s [u8]> + 's>, LoadError> {
        let Some(view) = accessor.view() else {
            return Ok(None);
        };

        let bytes = self.view_bytes(&view)?;
        let element_size = accessor.size();
        let stride = view.stride().unwrap_or(element_size);
        let offset = accessor.offset();
        let count = accessor.count();

        // Every element ends at or before the last one, so checking that
        // single range covers the slicing below.
        if count > 0 {
            let last_end = stride
                .checked_mul(count - 1)
                .and_then(|v| v.checked_add(offset))
                .and_then(|v| v.checked_add(element_size));
            if last_end.is_none_or(|end| end > bytes.len()) {
                return Err(LoadError::Decode(format!(
                    "accessor {} reads past the end of its buffer view",
                    accessor.index()
                )));
            }
        }

        Ok(Some((0..count).map(move |i| {
            let start = offset + i * stride;
            &bytes[start..start + element_size]
        })))
    }
}

fn component(bytes: &[u8], data_type: gltf::accessor::DataType, normalized: bool) -> f32 {
    use gltf::accessor::DataType;

    match data_type {
        DataType::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        DataType::I8 => dequantize(f32::from(bytes[0] as i8), data_type, normalized),
        DataType::U8 => dequantize(f32::from(bytes[0]), data_type, normalized),
        DataType::I16 => {
            dequantize(f32::from(i16::from_le_bytes([bytes[0], bytes[1]])), data_type, normalized)
        }
        DataType::U16 => {
            dequantize(f32::from(u16::from_le_bytes([bytes[0], bytes[1]])), data_type, normalized)
        }
        DataType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
    }
}

/// Maps a raw integer value into its normalized float range.
fn dequantize(value: f32, data_type: gltf::accessor::DataType, normalized: bool) -> f32 {
    use gltf::accessor::DataType;

    if !normalized {
        return value;
    }
    match data_type {
        DataType::I8 => (value / 127.0).max(-1.0),
        DataType::U8 => value / 255.0,
        DataType::I16 => (value / 32767.0).max(-1.0),
        DataType::U16 => value / 65535.0,
        _ => value,
    }
}

fn read_positions(
    data: &BufferData,
    accessor: &gltf::Accessor,
) -> Result<Option<Vec<Vec3>>, LoadError> {
    if accessor.dimensions() != gltf::accessor::Dimensions::Vec3 {
        return Err(LoadError::Decode(format!(
            "POSITION accessor {} is not VEC3",
            accessor.index()
        )));
    }
    if accessor.sparse().is_some() {
        return Ok(None);
    }

    let data_type = accessor.data_type();
    let normalized = accessor.normalized();
    let comp = data_type.size();

    let Some(elements) = data.elements(accessor)? else {
        return Ok(None);
    };

    Ok(Some(
        elements
            .map(|e| {
                Vec3::new(
                    component(&e[0..], data_type, normalized),
                    component(&e[comp..], data_type, normalized),
                    component(&e[2 * comp..], data_type, normalized),
                )
            })
            .collect(),
    ))
}

fn read_indices(data: &BufferData, accessor: &gltf::Accessor) -> Result<Option<Vec<u32>>, LoadError> {
    use gltf::accessor::DataType;

    if accessor.sparse().is_some() {
        return Ok(None);
    }
    let data_type = accessor.data_type();
    let Some(elements) = data.elements(accessor)? else {
        return Ok(None);
    };

    let indices = match data_type {
        DataType::U8 => elements.map(|e| u32::from(e[0])).collect(),
        DataType::U16 => elements.map(|e| u32::from(u16::from_le_bytes([e[0], e[1]]))).collect(),
        DataType::U32 => elements
            .map(|e| u32::from_le_bytes([e[0], e[1], e[2], e[3]]))
            .collect(),
        other => {
            return Err(LoadError::Decode(format!(
                "index accessor {} has invalid component type {other:?}",
                accessor.index()
            )));
        }
    };
    Ok(Some(indices))
}

/// Declared `min`/`max` of a position accessor.
fn declared_bounds(accessor: &gltf::Accessor) -> BoundingBox {
    let to_vec3 = |value: Option<Value>| -> Option<Vec3> {
        let arr = value?;
        let arr = arr.as_array()?;
        let get = |i: usize| arr.get(i).and_then(Value::as_f64).map(|v| v as f32);
        let (data_type, normalized) = (accessor.data_type(), accessor.normalized());
        Some(Vec3::new(
            dequantize(get(0)?, data_type, normalized),
            dequantize(get(1)?, data_type, normalized),
            dequantize(get(2)?, data_type, normalized),
        ))
    };

    match (to_vec3(accessor.min()), to_vec3(accessor.max())) {
        (Some(min), Some(max)) => BoundingBox::new(min, max),
        _ => BoundingBox::empty(),
    }
}

// ============================================================================
// Prefab construction
// ============================================================================

/// Builds the raw (un-normalized) prefab of the document's default scene.
pub fn build_prefab(
    gltf: &gltf::Gltf,
    buffers: &[Vec<u8>],
    decoder: &GeometryDecoder,
) -> Result<Prefab, LoadError> {
    let data = BufferData {
        buffers,
        decoded: decode_compressed_views(gltf, buffers, decoder)?,
    };

    let mut meshes: FxHashMap<usize, Mesh> = FxHashMap::default();
    let mut prefab = Prefab::new();

    // Prefab indices mirror glTF node indices.
    for node in gltf.nodes() {
        let mut prefab_node = PrefabNode::new();
        prefab_node.name = Some(
            node.name()
                .map_or_else(|| format!("Node_{}", node.index()), str::to_string),
        );

        let (t, r, s) = node.transform().decomposed();
        prefab_node.transform.position = Vec3::from_array(t);
        prefab_node.transform.rotation = Quat::from_array(r);
        prefab_node.transform.scale = Vec3::from_array(s);

        prefab_node.children_indices = node.children().map(|c| c.index()).collect();

        if let Some(mesh) = node.mesh() {
            let engine_mesh = match meshes.get(&mesh.index()) {
                Some(m) => m.clone(),
                None => {
                    let m = build_mesh(&data, &mesh)?;
                    meshes.insert(mesh.index(), m.clone());
                    m
                }
            };
            prefab_node.mesh = Some(engine_mesh);
        }

        prefab.push(prefab_node);
    }

    prefab.root_indices = match gltf.default_scene().or_else(|| gltf.scenes().next()) {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => {
            // No scene declared: every node nobody lists as a child is a root.
            let mut is_child = vec![false; prefab.nodes.len()];
            for node in &prefab.nodes {
                for &c in &node.children_indices {
                    if let Some(flag) = is_child.get_mut(c) {
                        *flag = true;
                    }
                }
            }
            (0..prefab.nodes.len()).filter(|&i| !is_child[i]).collect()
        }
    };

    log::debug!(
        "glTF converted: {} nodes, {} meshes, {} roots",
        prefab.nodes.len(),
        meshes.len(),
        prefab.root_indices.len()
    );

    Ok(prefab)
}

fn build_mesh(data: &BufferData, mesh: &gltf::Mesh) -> Result<Mesh, LoadError> {
    let mut primitives = Vec::new();

    for primitive in mesh.primitives() {
        let Some(accessor) = primitive.get(&gltf::Semantic::Positions) else {
            log::warn!("Primitive {} of mesh {} has no POSITION", primitive.index(), mesh.index());
            continue;
        };

        let engine_primitive = match read_positions(data, &accessor)? {
            Some(positions) => {
                let indices = match primitive.indices() {
                    Some(idx) => read_indices(data, &idx)?,
                    None => None,
                };
                Primitive::new(positions, indices)
            }
            None => Primitive::from_bounds(declared_bounds(&accessor)),
        };
        primitives.push(engine_primitive);
    }

    Ok(Mesh::new(mesh.name().map(str::to_string), primitives))
}
