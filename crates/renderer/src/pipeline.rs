use preset::{FilterMode, PresetPlan, ScalePolicy};

use crate::error::{PipelineError, ResourceError};
use crate::gpu::{size_vec4, GraphicsBackend, TextureDesc, TextureFormat};
use crate::pass::{pass_block, Pass, RenderTarget, SamplerSource};
use crate::textures::{load_named_textures, NamedTexture};
use crate::timing::{PassTimingReport, TimingReport};
use crate::types::{AudioBinding, FrameInputs, PipelineOptions, TextureBinding};

/// An ordered chain of compiled passes plus the named textures they sample.
///
/// Built all-or-nothing by [`Pipeline::build`] and released as a whole by
/// [`Pipeline::dispose`].
#[derive(Debug)]
pub struct Pipeline<B: GraphicsBackend> {
    passes: Vec<Pass<B>>,
    textures: Vec<NamedTexture<B>>,
    options: PipelineOptions,
    viewport: Option<(u32, u32)>,
    /// Last texture bound per unit; `None` means the unit's state is unknown.
    bound: Vec<Option<Option<B::Texture>>>,
}

impl<B: GraphicsBackend> Pipeline<B> {
    /// Loads named textures and compiles every pass.
    ///
    /// Texture problems only produce warnings. Any pass failure releases
    /// everything allocated so far and returns the error.
    pub fn build(
        gpu: &mut B,
        plan: &PresetPlan,
        options: &PipelineOptions,
    ) -> Result<Self, PipelineError> {
        let textures = load_named_textures(gpu, &plan.textures);
        let pass_count = plan.pass_count();
        let mut passes: Vec<Pass<B>> = Vec::with_capacity(pass_count);

        for spec in &plan.passes {
            match Pass::build(gpu, spec, pass_count, &textures, options) {
                Ok(pass) => passes.push(pass),
                Err(error) => {
                    tracing::debug!(
                        pass = spec.index,
                        built = passes.len(),
                        "releasing partially built pipeline"
                    );
                    for pass in passes {
                        pass.dispose(gpu);
                    }
                    for texture in textures {
                        texture.dispose(gpu);
                    }
                    return Err(error);
                }
            }
        }

        tracing::info!(
            passes = passes.len(),
            textures = textures.len(),
            loaded = textures.iter().filter(|t| t.is_loaded()).count(),
            "pipeline built"
        );

        Ok(Self {
            passes,
            textures,
            options: *options,
            viewport: None,
            bound: Vec::new(),
        })
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn pass(&self, index: usize) -> Option<&Pass<B>> {
        self.passes.get(index)
    }

    pub fn passes(&self) -> &[Pass<B>] {
        &self.passes
    }

    pub fn textures(&self) -> &[NamedTexture<B>] {
        &self.textures
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Sets a tunable in every pass declaring it. Returns how many passes
    /// matched.
    pub fn set_parameter(&mut self, name: &str, value: f32) -> usize {
        self.passes
            .iter_mut()
            .map(|pass| pass.set_parameter(name, value))
            .filter(|matched| *matched)
            .count()
    }

    /// Renders one frame into the default framebuffer.
    pub fn render(&mut self, gpu: &mut B, inputs: &FrameInputs<B::Texture>) {
        let Some(last) = self.passes.len().checked_sub(1) else {
            return;
        };
        let viewport = (inputs.viewport.0.max(1), inputs.viewport.1.max(1));
        self.prepare_targets(gpu, viewport);

        let original = inputs.original;
        let mut source = original;
        let mut framebuffer = None;
        let mut program = None;
        let window = self.options.timing_window;

        for index in 0..self.passes.len() {
            let (earlier, rest) = self.passes.split_at_mut(index);
            let pass = &mut rest[0];
            let is_last = index == last;

            let target = if is_last {
                None
            } else {
                pass.target.as_ref().map(|target| target.framebuffer)
            };
            if framebuffer != Some(target) {
                gpu.bind_framebuffer(target);
                framebuffer = Some(target);
            }
            let output = if is_last { viewport } else { pass.output_size };
            gpu.set_viewport(output.0, output.1);

            if program != Some(pass.program) {
                gpu.use_program(Some(pass.program));
                program = Some(pass.program);
            }

            let block = pass_block(source.size(), original.size(), output, viewport);
            pass.upload_frame_uniforms(gpu, inputs.time, inputs.delta, inputs.frame, &block);
            pass.upload_parameters(gpu);

            for slot in &pass.samplers {
                let binding = resolve_sampler(
                    slot.source,
                    &source,
                    &original,
                    earlier,
                    &self.textures,
                    &inputs.audio,
                );
                bind_cached(gpu, &mut self.bound, slot.unit, binding.texture);
                if let Some(location) = &slot.size_location {
                    gpu.set_uniform_vec4(location, size_vec4(binding.size()));
                }
            }

            match pass.timer {
                Some(query) => {
                    gpu.begin_timer(query);
                    gpu.draw_fullscreen();
                    gpu.end_timer();
                    if let Some(elapsed) = gpu.timer_result(query) {
                        if let Some(average) = pass.timing.record(elapsed, window) {
                            tracing::info!(
                                pass = index,
                                average_ms = %format!("{average:.3}"),
                                samples = window,
                                "pass GPU time"
                            );
                        }
                    }
                }
                None => gpu.draw_fullscreen(),
            }

            if !is_last {
                source = TextureBinding {
                    texture: pass.target.as_ref().map(|target| target.texture),
                    width: output.0,
                    height: output.1,
                };
            }
        }

        gpu.bind_framebuffer(None);
        gpu.use_program(None);
    }

    /// Per-pass GPU timings gathered so far.
    pub fn timing_report(&self) -> TimingReport {
        TimingReport {
            profiling: self.options.profiling,
            passes: self
                .passes
                .iter()
                .filter(|pass| pass.timer.is_some())
                .map(|pass| PassTimingReport {
                    index: pass.index(),
                    shader: pass.shader_path().to_path_buf(),
                    average_ms: pass.timing.average_ms(),
                    lifetime_average_ms: pass.timing.lifetime_average_ms(),
                    samples: pass.timing.window_samples(),
                    total_samples: pass.timing.total_samples(),
                })
                .collect(),
        }
    }

    /// Releases every program, render target, timer and named texture.
    pub fn dispose(self, gpu: &mut B) {
        let passes = self.passes.len();
        for pass in self.passes {
            pass.dispose(gpu);
        }
        for texture in self.textures {
            texture.dispose(gpu);
        }
        tracing::debug!(passes, "pipeline disposed");
    }

    /// Resizes render targets when the viewport differs from the last frame.
    fn prepare_targets(&mut self, gpu: &mut B, viewport: (u32, u32)) {
        if self.viewport == Some(viewport) {
            return;
        }
        let policies: Vec<ScalePolicy> = self.passes.iter().map(|pass| pass.spec.scale).collect();
        let sizes = compute_output_sizes(&policies, viewport);
        let last = self.passes.len().saturating_sub(1);

        for (index, (pass, size)) in self.passes.iter_mut().zip(sizes).enumerate() {
            pass.output_size = size;
            if index == last {
                continue;
            }
            if pass.target.as_ref().is_some_and(|target| target.size == size) {
                continue;
            }
            if let Some(old) = pass.target.take() {
                old.dispose(gpu);
            }
            match create_target(gpu, size, pass.spec.filter) {
                Ok(target) => pass.target = Some(target),
                Err(error) => {
                    tracing::error!(pass = index, error = %error, "failed to allocate render target");
                }
            }
        }

        tracing::debug!(
            width = viewport.0,
            height = viewport.1,
            "render targets sized for viewport"
        );
        self.viewport = Some(viewport);
        self.bound.clear();
    }
}

/// Output size of every pass for a viewport. The last entry is always the
/// viewport itself.
pub fn compute_output_sizes(policies: &[ScalePolicy], viewport: (u32, u32)) -> Vec<(u32, u32)> {
    let mut sizes = Vec::with_capacity(policies.len());
    let mut previous = viewport;
    for (index, policy) in policies.iter().enumerate() {
        let size = if index + 1 == policies.len() {
            viewport
        } else {
            policy.output_size(viewport, previous)
        };
        sizes.push(size);
        previous = size;
    }
    sizes
}

fn create_target<B: GraphicsBackend>(
    gpu: &mut B,
    size: (u32, u32),
    filter: FilterMode,
) -> Result<RenderTarget<B>, ResourceError> {
    let desc = TextureDesc {
        width: size.0,
        height: size.1,
        format: TextureFormat::Rgba8,
        filter,
    };
    let texture = gpu.create_texture(&desc, None)?;
    let framebuffer = match gpu.create_framebuffer(texture) {
        Ok(framebuffer) => framebuffer,
        Err(error) => {
            gpu.delete_texture(texture);
            return Err(error);
        }
    };
    if !gpu.framebuffer_complete(framebuffer) {
        tracing::error!(
            width = size.0,
            height = size.1,
            "render target framebuffer incomplete; rendering anyway"
        );
    }
    Ok(RenderTarget {
        texture,
        framebuffer,
        size,
    })
}

fn resolve_sampler<B: GraphicsBackend>(
    source: SamplerSource,
    current: &TextureBinding<B::Texture>,
    original: &TextureBinding<B::Texture>,
    earlier: &[Pass<B>],
    textures: &[NamedTexture<B>],
    audio: &AudioBinding<B::Texture>,
) -> TextureBinding<B::Texture> {
    match source {
        SamplerSource::Source => *current,
        SamplerSource::Original => *original,
        SamplerSource::Pass(k) => match earlier.get(k) {
            Some(pass) => TextureBinding {
                texture: pass.target.as_ref().map(|target| target.texture),
                width: pass.output_size.0,
                height: pass.output_size.1,
            },
            None => TextureBinding::empty(),
        },
        SamplerSource::Named(i) => match textures.get(i) {
            Some(named) => TextureBinding {
                texture: named.texture,
                width: named.size.0,
                height: named.size.1,
            },
            None => TextureBinding::empty(),
        },
        SamplerSource::Audio => TextureBinding {
            texture: audio.resolved(),
            width: audio.width,
            height: audio.height,
        },
    }
}

fn bind_cached<B: GraphicsBackend>(
    gpu: &mut B,
    bound: &mut Vec<Option<Option<B::Texture>>>,
    unit: u32,
    texture: Option<B::Texture>,
) {
    let slot = unit as usize;
    if bound.len() <= slot {
        bound.resize(slot + 1, None);
    }
    if bound[slot] == Some(texture) {
        return;
    }
    gpu.bind_texture(unit, texture);
    bound[slot] = Some(texture);
}
