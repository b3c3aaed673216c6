//! Compressed Geometry Decoder
//!
//! Companion decoder for `EXT_meshopt_compression` buffer views, backed by
//! the `meshopt` crate when the `meshopt` feature is enabled.
//!
//! The decoder is shared by every load an engine starts and is released with
//! the engine; once disposed, assets that need it fail with
//! [`LoadError::DecoderUnavailable`].

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;

use crate::errors::LoadError;

/// Name of the glTF extension handled here.
pub const MESHOPT_EXTENSION: &str = "EXT_meshopt_compression";

/// `EXT_meshopt_compression` payload of a buffer view.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshoptView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: usize,
    pub count: usize,
    pub mode: MeshoptMode,
    #[serde(default)]
    pub filter: MeshoptFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeshoptMode {
    Attributes,
    Triangles,
    Indices,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeshoptFilter {
    #[default]
    None,
    Octahedral,
    Quaternion,
    Exponential,
}

/// Decoder handle with an explicit release.
#[derive(Debug, Default)]
pub struct GeometryDecoder {
    disposed: AtomicBool,
}

impl GeometryDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether compressed views can currently be decoded.
    #[must_use]
    pub fn is_available(&self) -> bool {
        cfg!(feature = "meshopt") && !self.is_disposed()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Releases the decoder. Returns `true` only for the call that released it.
    pub fn dispose(&self) -> bool {
        let released = !self.disposed.swap(true, Ordering::AcqRel);
        if released {
            log::debug!("Geometry decoder released");
        }
        released
    }

    /// Decodes one compressed buffer view. `source` is the whole buffer the
    /// extension points at.
    pub fn decode_view(&self, view: &MeshoptView, source: &[u8]) -> Result<Vec<u8>, LoadError> {
        if !self.is_available() {
            return Err(LoadError::DecoderUnavailable(
                "meshopt decoder is not available".to_string(),
            ));
        }

        let end = view
            .byte_offset
            .checked_add(view.byte_length)
            .ok_or_else(|| LoadError::Decode("meshopt view range overflows".to_string()))?;
        let encoded = source.get(view.byte_offset..end).ok_or_else(|| {
            LoadError::Decode(format!(
                "meshopt view {}..{end} exceeds buffer of {} bytes",
                view.byte_offset,
                source.len()
            ))
        })?;

        decode_encoded(view, encoded)
    }
}

#[cfg(feature = "meshopt")]
fn decode_encoded(view: &MeshoptView, encoded: &[u8]) -> Result<Vec<u8>, LoadError> {
    use meshopt::encoding::{decode_index_buffer, decode_vertex_buffer};

    let meshopt_err = |e: meshopt::Error| LoadError::Decode(format!("meshopt: {e:?}"));

    macro_rules! decode_strided {
        ($($n:literal),*) => {
            match view.byte_stride {
                $($n => decode_vertex_buffer::<[u8; $n]>(encoded, view.count)
                    .map(|v| v.concat())
                    .map_err(meshopt_err)?,)*
                other => {
                    return Err(LoadError::Decode(format!(
                        "unsupported meshopt vertex stride {other}"
                    )))
                }
            }
        };
    }

    match view.mode {
        MeshoptMode::Attributes => {
            let mut data = decode_strided!(4, 8, 12, 16, 20, 24, 28, 32);
            match view.filter {
                MeshoptFilter::None => {}
                MeshoptFilter::Exponential => apply_exponential_filter(&mut data),
                other => {
                    return Err(LoadError::DecoderUnavailable(format!(
                        "meshopt filter {other:?} is not supported"
                    )));
                }
            }
            Ok(data)
        }
        MeshoptMode::Triangles => match view.byte_stride {
            2 => Ok(decode_index_buffer::<u16>(encoded, view.count)
                .map_err(meshopt_err)?
                .into_iter()
                .flat_map(u16::to_le_bytes)
                .collect()),
            4 => Ok(decode_index_buffer::<u32>(encoded, view.count)
                .map_err(meshopt_err)?
                .into_iter()
                .flat_map(u32::to_le_bytes)
                .collect()),
            other => Err(LoadError::Decode(format!(
                "unsupported meshopt index stride {other}"
            ))),
        },
        MeshoptMode::Indices => Err(LoadError::DecoderUnavailable(
            "meshopt INDICES mode is not supported".to_string(),
        )),
    }
}

#[cfg(not(feature = "meshopt"))]
fn decode_encoded(_view: &MeshoptView, _encoded: &[u8]) -> Result<Vec<u8>, LoadError> {
    Err(LoadError::DecoderUnavailable(
        "built without the `meshopt` feature".to_string(),
    ))
}

/// Expands 32-bit (8-bit exponent, 24-bit mantissa) values to `f32` in place.
#[cfg(feature = "meshopt")]
fn apply_exponential_filter(data: &mut [u8]) {
    for chunk in data.chunks_exact_mut(4) {
        let v = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let exponent = v >> 24;
        let mantissa = (v << 8) >> 8;
        let value = mantissa as f32 * 2f32.powi(exponent);
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

#[cfg(all(test, feature = "meshopt"))]
mod tests {
    use super::*;

    #[test]
    fn exponential_filter_expands_mantissa() {
        // mantissa 3, exponent -1 => 1.5
        let raw = (3i32 & 0x00FF_FFFF) | ((-1i32) << 24);
        let mut data = raw.to_le_bytes().to_vec();
        apply_exponential_filter(&mut data);
        let value = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        assert!((value - 1.5).abs() < 1e-6);
    }

    #[test]
    fn dispose_reports_first_release_only() {
        let decoder = GeometryDecoder::new();
        assert!(decoder.is_available());
        assert!(decoder.dispose());
        assert!(!decoder.dispose());
        assert!(!decoder.is_available());
    }
}
