//! Graphics seam between the pipeline and the driver.
//!
//! - `backend` defines [`GraphicsBackend`], the handful of operations the
//!   pipeline issues, plus the std140 [`PassBlock`] uploaded per draw.
//! - `gl` implements it for OpenGL 3.3 core through `glow`.
//! - `mock` (tests only) records every call so pipeline behaviour can be
//!   asserted without a context.

mod backend;
mod gl;
#[cfg(test)]
pub(crate) mod mock;

pub use backend::{size_vec4, GraphicsBackend, PassBlock, TextureDesc, TextureFormat};
pub use gl::GlowBackend;
