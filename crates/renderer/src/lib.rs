//! Multi-pass shader pipeline for passchain.
//!
//! A preset (see the `preset` crate) names an ordered list of slang shaders.
//! Each is transpiled by the `slang` crate, wrapped in a fixed GLSL 330
//! preamble and compiled into a [`Pass`]. A [`Pipeline`] owns the passes and
//! the preset's named textures and renders them in order every frame:
//!
//! ```text
//!   Original ──▶ pass 0 ──▶ target 0 ──▶ pass 1 ──▶ … ──▶ pass N-1 ──▶ screen
//!       │                      │                              ▲
//!       └──────────────────────┴──── Original / PassK ────────┘
//! ```
//!
//! Every GPU call goes through [`GraphicsBackend`](gpu::GraphicsBackend);
//! [`GlowBackend`](gpu::GlowBackend) implements it for OpenGL 3.3 core.
//! [`PipelineHost`] keeps the active pipeline and swaps it atomically on
//! reload.

mod audio;
mod compile;
mod error;
pub mod gpu;
mod host;
mod pass;
mod pipeline;
mod textures;
mod timing;
mod types;

pub use audio::{
    AudioSource, AudioTexture, LiveCapture, SyntheticGenerator, AUDIO_TEXTURE_HEIGHT,
    AUDIO_TEXTURE_WIDTH, AUDIO_WINDOW,
};
pub use error::{PipelineError, ResourceError, ShaderError, ShaderStage};
pub use host::PipelineHost;
pub use pass::{Pass, SamplerSource};
pub use pipeline::{compute_output_sizes, Pipeline};
pub use textures::{load_image_texture, placeholder_texture, NamedTexture};
pub use timing::{PassTimingReport, TimingReport};
pub use types::{
    AudioBinding, FrameInputs, PipelineOptions, TextureBinding, DEFAULT_TIMING_WINDOW,
    MAX_PARAMETERS,
};
