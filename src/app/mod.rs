//! Host integration helpers.

#[cfg(feature = "winit")]
pub mod input_adapter;
