pub mod gltf;

pub use self::gltf::{build_prefab, check_extensions, load_buffers, parse_document};
