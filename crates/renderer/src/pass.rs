use std::path::Path;

use preset::{FilterMode, PassSpec, ScalePolicy};
use slang::Parameter;

use crate::compile::{wrap_fragment, PASS_BLOCK_BINDING, PASS_BLOCK_NAME, VERTEX_SHADER};
use crate::error::PipelineError;
use crate::gpu::{size_vec4, GraphicsBackend, PassBlock};
use crate::textures::NamedTexture;
use crate::timing::PassTiming;
use crate::types::{PipelineOptions, MAX_PARAMETERS};

/// Where a sampler's texture comes from at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerSource {
    /// Output of the previous pass, or the base input for pass 0.
    Source,
    /// The pipeline's base input, identical for every pass.
    Original,
    /// Output of an earlier pass.
    Pass(usize),
    /// Index into the pipeline's named textures.
    Named(usize),
    /// The externally supplied audio texture (`sound`).
    Audio,
}

#[derive(Debug)]
pub(crate) struct SamplerSlot<B: GraphicsBackend> {
    pub(crate) source: SamplerSource,
    pub(crate) name: String,
    pub(crate) unit: u32,
    pub(crate) size_location: Option<B::UniformLocation>,
}

#[derive(Debug)]
pub(crate) struct ParameterSlot<B: GraphicsBackend> {
    pub(crate) parameter: Parameter,
    pub(crate) value: f32,
    pub(crate) last_uploaded: Option<f32>,
    pub(crate) location: Option<B::UniformLocation>,
}

/// Per-frame uniforms outside the pass block. Every entry is optional.
#[derive(Debug)]
pub(crate) struct FrameLocations<B: GraphicsBackend> {
    pub(crate) time: Option<B::UniformLocation>,
    pub(crate) frame_time: Option<B::UniformLocation>,
    pub(crate) frame_count: Option<B::UniformLocation>,
    pub(crate) frame_direction: Option<B::UniformLocation>,
    pub(crate) source_size: Option<B::UniformLocation>,
    pub(crate) original_size: Option<B::UniformLocation>,
    pub(crate) output_size: Option<B::UniformLocation>,
    pub(crate) final_viewport_size: Option<B::UniformLocation>,
}

impl<B: GraphicsBackend> FrameLocations<B> {
    fn resolve(gpu: &mut B, program: B::Program) -> Self {
        let mut lookup = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| gpu.uniform_location(program, name))
        };
        Self {
            time: lookup(&["Time", "iTime"]),
            frame_time: lookup(&["FrameTime", "iTimeDelta"]),
            frame_count: lookup(&["FrameCount", "iFrame"]),
            frame_direction: lookup(&["FrameDirection"]),
            source_size: lookup(&["SourceSize"]),
            original_size: lookup(&["OriginalSize"]),
            output_size: lookup(&["OutputSize"]),
            final_viewport_size: lookup(&["FinalViewportSize"]),
        }
    }
}

/// Offscreen colour target owned by every pass except the last.
#[derive(Debug)]
pub(crate) struct RenderTarget<B: GraphicsBackend> {
    pub(crate) texture: B::Texture,
    pub(crate) framebuffer: B::Framebuffer,
    pub(crate) size: (u32, u32),
}

impl<B: GraphicsBackend> RenderTarget<B> {
    pub(crate) fn dispose(self, gpu: &mut B) {
        gpu.delete_framebuffer(self.framebuffer);
        gpu.delete_texture(self.texture);
    }
}

/// One compiled stage of the chain.
#[derive(Debug)]
pub struct Pass<B: GraphicsBackend> {
    pub(crate) spec: PassSpec,
    pub(crate) program: B::Program,
    pub(crate) locations: FrameLocations<B>,
    pub(crate) parameters: Vec<ParameterSlot<B>>,
    pub(crate) samplers: Vec<SamplerSlot<B>>,
    pub(crate) target: Option<RenderTarget<B>>,
    pub(crate) output_size: (u32, u32),
    pub(crate) timer: Option<B::Query>,
    pub(crate) timing: PassTiming,
}

impl<B: GraphicsBackend> Pass<B> {
    /// Reads, transpiles, compiles and introspects one pass.
    ///
    /// Sampler candidates are tried in a fixed order (`Source`, `Original`,
    /// `Pass0..PassN-1`, named textures, `sound`) and the ones the program
    /// actually uses get consecutive texture units.
    pub(crate) fn build(
        gpu: &mut B,
        spec: &PassSpec,
        pass_count: usize,
        textures: &[NamedTexture<B>],
        options: &PipelineOptions,
    ) -> Result<Self, PipelineError> {
        let index = spec.index;
        let raw = std::fs::read_to_string(&spec.shader).map_err(|source| {
            PipelineError::ShaderRead {
                index,
                path: spec.shader.clone(),
                source,
            }
        })?;
        let transpiled = slang::transpile(&raw);
        let fragment = wrap_fragment(&transpiled.source);
        let program =
            gpu.create_program(VERTEX_SHADER, &fragment)
                .map_err(|source| PipelineError::Shader {
                    index,
                    path: spec.shader.clone(),
                    source,
                })?;

        if !gpu.bind_uniform_block(program, PASS_BLOCK_NAME, PASS_BLOCK_BINDING) {
            tracing::debug!(pass = index, "pass block optimised out");
        }

        let locations = FrameLocations::resolve(gpu, program);
        let parameters = resolve_parameters(gpu, program, index, transpiled.parameters);
        let samplers = resolve_samplers(gpu, program, pass_count, textures);

        gpu.use_program(Some(program));
        for sampler in &samplers {
            if let Some(location) = gpu.uniform_location(program, &sampler.name) {
                gpu.set_uniform_i32(&location, sampler.unit as i32);
            }
        }
        gpu.use_program(None);

        let timer = if options.profiling {
            gpu.create_timer()
        } else {
            None
        };

        tracing::debug!(
            pass = index,
            shader = %spec.shader.display(),
            samplers = samplers.len(),
            parameters = parameters.len(),
            timer = timer.is_some(),
            "built pass"
        );

        Ok(Self {
            spec: spec.clone(),
            program,
            locations,
            parameters,
            samplers,
            target: None,
            output_size: (1, 1),
            timer,
            timing: PassTiming::default(),
        })
    }

    pub fn index(&self) -> usize {
        self.spec.index
    }

    pub fn shader_path(&self) -> &Path {
        &self.spec.shader
    }

    pub fn filter(&self) -> FilterMode {
        self.spec.filter
    }

    pub fn scale(&self) -> &ScalePolicy {
        &self.spec.scale
    }

    pub fn program(&self) -> B::Program {
        self.program
    }

    /// Size this pass rendered at on the latest frame.
    pub fn output_size(&self) -> (u32, u32) {
        self.output_size
    }

    pub fn has_render_target(&self) -> bool {
        self.target.is_some()
    }

    /// Bound samplers with their texture unit, in unit order.
    pub fn samplers(&self) -> impl Iterator<Item = (SamplerSource, u32)> + '_ {
        self.samplers.iter().map(|slot| (slot.source, slot.unit))
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&Parameter, f32)> + '_ {
        self.parameters
            .iter()
            .map(|slot| (&slot.parameter, slot.value))
    }

    /// Changes a tunable. The value is uploaded on the next frame.
    /// Returns false if the pass declares no such parameter.
    pub fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        match self
            .parameters
            .iter_mut()
            .find(|slot| slot.parameter.name == name)
        {
            Some(slot) => {
                slot.value = value;
                true
            }
            None => false,
        }
    }

    /// Uploads frame clocks and the four size vectors.
    pub(crate) fn upload_frame_uniforms(
        &self,
        gpu: &mut B,
        time: f32,
        delta: f32,
        frame: i32,
        block: &PassBlock,
    ) {
        let loc = &self.locations;
        if let Some(location) = &loc.time {
            gpu.set_uniform_f32(location, time);
        }
        if let Some(location) = &loc.frame_time {
            gpu.set_uniform_f32(location, delta);
        }
        if let Some(location) = &loc.frame_count {
            gpu.set_uniform_i32(location, frame);
        }
        if let Some(location) = &loc.frame_direction {
            gpu.set_uniform_f32(location, 1.0);
        }

        gpu.write_pass_block(block);
        let plain = [
            (&loc.source_size, block.source_size),
            (&loc.original_size, block.original_size),
            (&loc.output_size, block.output_size),
            (&loc.final_viewport_size, block.final_viewport_size),
        ];
        for (location, value) in plain {
            if let Some(location) = location {
                gpu.set_uniform_vec4(location, value);
            }
        }
    }

    /// Uploads parameters whose value differs from the last upload.
    pub(crate) fn upload_parameters(&mut self, gpu: &mut B) {
        for slot in &mut self.parameters {
            let Some(location) = &slot.location else {
                continue;
            };
            if slot.last_uploaded == Some(slot.value) {
                continue;
            }
            gpu.set_uniform_f32(location, slot.value);
            slot.last_uploaded = Some(slot.value);
        }
    }

    pub(crate) fn dispose(self, gpu: &mut B) {
        if let Some(target) = self.target {
            target.dispose(gpu);
        }
        if let Some(timer) = self.timer {
            gpu.delete_timer(timer);
        }
        gpu.delete_program(self.program);
    }
}

fn resolve_parameters<B: GraphicsBackend>(
    gpu: &mut B,
    program: B::Program,
    index: usize,
    mut declared: Vec<Parameter>,
) -> Vec<ParameterSlot<B>> {
    if declared.len() > MAX_PARAMETERS {
        tracing::warn!(
            pass = index,
            declared = declared.len(),
            max = MAX_PARAMETERS,
            "too many parameters; ignoring the rest"
        );
        declared.truncate(MAX_PARAMETERS);
    }
    declared
        .into_iter()
        .map(|parameter| ParameterSlot {
            location: gpu.uniform_location(program, &parameter.name),
            value: parameter.default,
            last_uploaded: None,
            parameter,
        })
        .collect()
}

fn resolve_samplers<B: GraphicsBackend>(
    gpu: &mut B,
    program: B::Program,
    pass_count: usize,
    textures: &[NamedTexture<B>],
) -> Vec<SamplerSlot<B>> {
    let mut candidates = vec![
        (SamplerSource::Source, "Source".to_string()),
        (SamplerSource::Original, "Original".to_string()),
    ];
    candidates.extend((0..pass_count).map(|k| (SamplerSource::Pass(k), format!("Pass{k}"))));
    candidates.extend(
        textures
            .iter()
            .enumerate()
            .map(|(i, texture)| (SamplerSource::Named(i), texture.name.clone())),
    );
    candidates.push((SamplerSource::Audio, "sound".to_string()));

    let mut samplers = Vec::new();
    for (source, name) in candidates {
        if gpu.uniform_location(program, &name).is_none() {
            continue;
        }
        let size_location = gpu.uniform_location(program, &format!("{name}Size"));
        samplers.push(SamplerSlot {
            source,
            unit: samplers.len() as u32,
            name,
            size_location,
        });
    }
    samplers
}

/// Size vectors the pass block carries for one draw.
pub(crate) fn pass_block(
    source: (u32, u32),
    original: (u32, u32),
    output: (u32, u32),
    viewport: (u32, u32),
) -> PassBlock {
    PassBlock {
        source_size: size_vec4(source),
        original_size: size_vec4(original),
        output_size: size_vec4(output),
        final_viewport_size: size_vec4(viewport),
    }
}
