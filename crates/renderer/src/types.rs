/// Upper bound on `#pragma parameter` declarations honoured per pass.
pub const MAX_PARAMETERS: usize = 256;

/// Samples collected before a pass's average GPU time is logged.
pub const DEFAULT_TIMING_WINDOW: u32 = 60;

/// Knobs fixed for the lifetime of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Wrap each pass draw in an elapsed-time query.
    pub profiling: bool,
    pub timing_window: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            profiling: false,
            timing_window: DEFAULT_TIMING_WINDOW,
        }
    }
}

/// A texture handle paired with the size reported to shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding<T> {
    pub texture: Option<T>,
    pub width: u32,
    pub height: u32,
}

impl<T> TextureBinding<T> {
    pub fn new(texture: T, width: u32, height: u32) -> Self {
        Self {
            texture: Some(texture),
            width,
            height,
        }
    }

    /// No texture bound; shaders see a 1×1 size.
    pub fn empty() -> Self {
        Self {
            texture: None,
            width: 1,
            height: 1,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// The externally owned audio texture as seen by the `sound` sampler.
///
/// The texture is only bound when `enabled` is set and a handle is present,
/// but the dimensions are always reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioBinding<T> {
    pub texture: Option<T>,
    pub width: u32,
    pub height: u32,
    pub enabled: bool,
}

impl<T: Copy> AudioBinding<T> {
    pub fn disabled(width: u32, height: u32) -> Self {
        Self {
            texture: None,
            width,
            height,
            enabled: false,
        }
    }

    pub(crate) fn resolved(&self) -> Option<T> {
        if self.enabled {
            self.texture
        } else {
            None
        }
    }
}

/// Everything the pipeline needs from the host for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<T> {
    /// Presentation surface size in pixels.
    pub viewport: (u32, u32),
    /// Seconds since start.
    pub time: f32,
    /// Seconds since the previous frame.
    pub delta: f32,
    pub frame: i32,
    pub original: TextureBinding<T>,
    pub audio: AudioBinding<T>,
}
