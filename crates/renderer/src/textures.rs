use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::imageops::flip_vertical_in_place;
use image::RgbaImage;
use preset::{FilterMode, TextureSpec};

use crate::error::ResourceError;
use crate::gpu::{GraphicsBackend, TextureDesc, TextureFormat};
use crate::types::TextureBinding;

const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// A static side input declared by the preset.
///
/// `texture` is `None` when the image could not be loaded; binds then
/// resolve to no texture and the size reads as 1×1.
#[derive(Debug)]
pub struct NamedTexture<B: GraphicsBackend> {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) texture: Option<B::Texture>,
    pub(crate) size: (u32, u32),
}

impl<B: GraphicsBackend> NamedTexture<B> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.texture.is_some()
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub(crate) fn dispose(self, gpu: &mut B) {
        if let Some(texture) = self.texture {
            gpu.delete_texture(texture);
        }
    }
}

/// Loads every declared texture. Failures degrade to absent entries with a
/// warning and never abort the load.
pub(crate) fn load_named_textures<B: GraphicsBackend>(
    gpu: &mut B,
    specs: &[TextureSpec],
) -> Vec<NamedTexture<B>> {
    specs
        .iter()
        .map(|spec| {
            let mut entry = NamedTexture {
                name: spec.name.clone(),
                path: spec.path.clone(),
                texture: None,
                size: (1, 1),
            };
            if !is_supported(&spec.path) {
                tracing::warn!(
                    texture = %spec.name,
                    path = %spec.path.display(),
                    "unsupported texture format; skipping"
                );
                return entry;
            }
            match load_image_texture(gpu, &spec.path) {
                Ok(binding) => {
                    tracing::debug!(
                        texture = %spec.name,
                        width = binding.width,
                        height = binding.height,
                        "loaded named texture"
                    );
                    entry.texture = binding.texture;
                    entry.size = binding.size();
                }
                Err(error) => {
                    tracing::warn!(
                        texture = %spec.name,
                        path = %spec.path.display(),
                        error = %format!("{error:#}"),
                        "failed to load named texture; binding nothing"
                    );
                }
            }
            entry
        })
        .collect()
}

pub(crate) fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Decodes an image into RGBA8 rows ordered bottom-up.
pub(crate) fn decode_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?;
    let mut rgba = image.to_rgba8();
    flip_vertical_in_place(&mut rgba);
    Ok(rgba)
}

/// Decodes and uploads an image with linear filtering.
pub fn load_image_texture<B: GraphicsBackend>(
    gpu: &mut B,
    path: &Path,
) -> Result<TextureBinding<B::Texture>> {
    let rgba = decode_image(path)?;
    let (width, height) = rgba.dimensions();
    let texture = upload_rgba(gpu, width, height, rgba.as_raw())
        .with_context(|| format!("failed to upload {}", path.display()))?;
    Ok(TextureBinding::new(texture, width, height))
}

/// Opaque red 1×1 texture standing in for a missing `Original` image.
pub fn placeholder_texture<B: GraphicsBackend>(
    gpu: &mut B,
) -> Result<TextureBinding<B::Texture>, ResourceError> {
    let texture = upload_rgba(gpu, 1, 1, &[255, 0, 0, 255])?;
    Ok(TextureBinding::new(texture, 1, 1))
}

fn upload_rgba<B: GraphicsBackend>(
    gpu: &mut B,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<B::Texture, ResourceError> {
    let desc = TextureDesc {
        width,
        height,
        format: TextureFormat::Rgba8,
        filter: FilterMode::Linear,
    };
    gpu.create_texture(&desc, Some(pixels))
}
