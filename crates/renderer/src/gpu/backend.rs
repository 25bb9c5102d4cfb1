use std::fmt::Debug;

use bytemuck::{Pod, Zeroable};
use preset::FilterMode;

use crate::error::{ResourceError, ShaderError};

/// Per-pass size block uploaded before every draw (std140, four `vec4`s).
///
/// Each vector is `(width, height, 1/width, 1/height)`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct PassBlock {
    pub source_size: [f32; 4],
    pub original_size: [f32; 4],
    pub output_size: [f32; 4],
    pub final_viewport_size: [f32; 4],
}

/// Expands a pixel size into the `vec4` layout shaders expect.
pub fn size_vec4((width, height): (u32, u32)) -> [f32; 4] {
    let w = width as f32;
    let h = height as f32;
    let inv = |v: f32| if v > 0.0 { 1.0 / v } else { 0.0 };
    [w, h, inv(w), inv(h)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// Four 8-bit channels, used for images and render targets.
    Rgba8,
    /// One 32-bit float channel, used for the audio texture.
    R32Float,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8 | TextureFormat::R32Float => 4,
        }
    }
}

/// Shape of a 2D texture. Wrapping is always clamp-to-edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: FilterMode,
}

/// The graphics operations the pipeline needs.
///
/// Every call happens on the thread that owns the context. Handles are plain
/// values; ownership lives in the pipeline objects that created them.
pub trait GraphicsBackend {
    type Program: Copy + PartialEq + Debug;
    type Texture: Copy + PartialEq + Debug;
    type Framebuffer: Copy + PartialEq + Debug;
    type UniformLocation: Clone + Debug;
    type Query: Copy + Debug;

    /// Compiles both stages and links them, returning driver diagnostics on failure.
    fn create_program(&mut self, vertex: &str, fragment: &str)
        -> Result<Self::Program, ShaderError>;
    fn delete_program(&mut self, program: Self::Program);
    fn use_program(&mut self, program: Option<Self::Program>);
    /// `None` when the program has no active uniform with this name.
    fn uniform_location(
        &mut self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;
    /// Attaches the named uniform block to `binding`. Returns false if the
    /// program has no such active block.
    fn bind_uniform_block(&mut self, program: Self::Program, block: &str, binding: u32) -> bool;

    fn set_uniform_i32(&mut self, location: &Self::UniformLocation, value: i32);
    fn set_uniform_f32(&mut self, location: &Self::UniformLocation, value: f32);
    fn set_uniform_vec4(&mut self, location: &Self::UniformLocation, value: [f32; 4]);
    fn write_pass_block(&mut self, block: &PassBlock);

    fn create_texture(
        &mut self,
        desc: &TextureDesc,
        pixels: Option<&[u8]>,
    ) -> Result<Self::Texture, ResourceError>;
    /// Replaces the full contents of a texture created with the same `desc`.
    fn update_texture(&mut self, texture: Self::Texture, desc: &TextureDesc, pixels: &[u8]);
    fn delete_texture(&mut self, texture: Self::Texture);
    fn bind_texture(&mut self, unit: u32, texture: Option<Self::Texture>);

    fn create_framebuffer(
        &mut self,
        color: Self::Texture,
    ) -> Result<Self::Framebuffer, ResourceError>;
    fn framebuffer_complete(&mut self, framebuffer: Self::Framebuffer) -> bool;
    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);
    /// `None` targets the default presentation surface.
    fn bind_framebuffer(&mut self, framebuffer: Option<Self::Framebuffer>);

    fn set_viewport(&mut self, width: u32, height: u32);
    fn draw_fullscreen(&mut self);

    /// `None` when elapsed-time queries are unsupported.
    fn create_timer(&mut self) -> Option<Self::Query>;
    fn delete_timer(&mut self, query: Self::Query);
    fn begin_timer(&mut self, query: Self::Query);
    fn end_timer(&mut self);
    /// Elapsed nanoseconds if the result is already available.
    fn timer_result(&mut self, query: Self::Query) -> Option<u64>;
}
