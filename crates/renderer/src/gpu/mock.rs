use std::collections::{BTreeSet, HashMap};

use super::backend::{GraphicsBackend, PassBlock, TextureDesc, TextureFormat};
use crate::error::{ResourceError, ShaderError, ShaderStage};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    UseProgram(Option<u32>),
    SetI32 { program: u32, name: String, value: i32 },
    SetF32 { program: u32, name: String, value: f32 },
    SetVec4 { program: u32, name: String, value: [f32; 4] },
    WritePassBlock(PassBlock),
    CreateTexture { id: u32, width: u32, height: u32, format: TextureFormat },
    UpdateTexture { id: u32, pixels: Vec<u8> },
    BindTexture { unit: u32, texture: Option<u32> },
    CreateFramebuffer { id: u32, color: u32 },
    BindFramebuffer(Option<u32>),
    Viewport(u32, u32),
    Draw,
    BeginTimer(u32),
    EndTimer,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MockLocation {
    program: u32,
    name: String,
}

/// Backend that hands out integer handles and records what it is asked to do.
///
/// A uniform is "active" when the user part of the fragment source (after
/// `#line 1`) mentions it as a whole word, mimicking the driver dropping
/// unused uniforms.
#[derive(Debug, Default)]
pub(crate) struct MockBackend {
    pub calls: Vec<Call>,
    /// Compilation fails for fragments containing this text.
    pub fail_fragment_containing: Option<String>,
    /// Result reported by every timer query.
    pub timer_ns: Option<u64>,
    pub incomplete_framebuffers: bool,
    pub fail_textures: bool,
    next_id: u32,
    programs: HashMap<u32, String>,
    pub live_programs: BTreeSet<u32>,
    pub live_textures: BTreeSet<u32>,
    pub live_framebuffers: BTreeSet<u32>,
    pub live_timers: BTreeSet<u32>,
    pub deleted: Vec<u32>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn live_resources(&self) -> usize {
        self.live_programs.len()
            + self.live_textures.len()
            + self.live_framebuffers.len()
            + self.live_timers.len()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn texture_binds(&self) -> Vec<(u32, Option<u32>)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::BindTexture { unit, texture } => Some((*unit, *texture)),
                _ => None,
            })
            .collect()
    }

    /// Values written to the named sampler uniforms, in call order.
    pub fn sampler_units(&self, program: u32) -> Vec<(String, i32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::SetI32 {
                    program: p,
                    name,
                    value,
                } if *p == program => Some((name.clone(), *value)),
                _ => None,
            })
            .collect()
    }

    pub fn float_uploads(&self, name: &str) -> Vec<f32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::SetF32 { name: n, value, .. } if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn pass_blocks(&self) -> Vec<PassBlock> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::WritePassBlock(block) => Some(*block),
                _ => None,
            })
            .collect()
    }

    /// Fragment source after the preamble, as handed to `create_program`.
    pub fn fragment_body(&self, program: u32) -> Option<&str> {
        self.programs.get(&program).map(String::as_str)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

fn mentions(haystack: &str, word: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    haystack.match_indices(word).any(|(at, _)| {
        let before = haystack[..at].chars().next_back();
        let after = haystack[at + word.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

impl GraphicsBackend for MockBackend {
    type Program = u32;
    type Texture = u32;
    type Framebuffer = u32;
    type UniformLocation = MockLocation;
    type Query = u32;

    fn create_program(&mut self, _vertex: &str, fragment: &str) -> Result<u32, ShaderError> {
        if let Some(needle) = &self.fail_fragment_containing {
            if fragment.contains(needle.as_str()) {
                return Err(ShaderError::Compile {
                    stage: ShaderStage::Fragment,
                    log: format!("0:1(1): error: syntax error near '{needle}'"),
                });
            }
        }
        let id = self.next();
        let body = fragment
            .split_once("#line 1\n")
            .map_or(fragment, |(_, body)| body);
        self.programs.insert(id, body.to_string());
        self.live_programs.insert(id);
        Ok(id)
    }

    fn delete_program(&mut self, program: u32) {
        assert!(self.live_programs.remove(&program), "double delete {program}");
        self.deleted.push(program);
    }

    fn use_program(&mut self, program: Option<u32>) {
        self.calls.push(Call::UseProgram(program));
    }

    fn uniform_location(&mut self, program: u32, name: &str) -> Option<MockLocation> {
        let body = self.programs.get(&program)?;
        mentions(body, name).then(|| MockLocation {
            program,
            name: name.to_string(),
        })
    }

    fn bind_uniform_block(&mut self, program: u32, _block: &str, _binding: u32) -> bool {
        self.programs.contains_key(&program)
    }

    fn set_uniform_i32(&mut self, location: &MockLocation, value: i32) {
        let (program, name) = (location.program, location.name.clone());
        self.calls.push(Call::SetI32 {
            program,
            name,
            value,
        });
    }

    fn set_uniform_f32(&mut self, location: &MockLocation, value: f32) {
        let (program, name) = (location.program, location.name.clone());
        self.calls.push(Call::SetF32 {
            program,
            name,
            value,
        });
    }

    fn set_uniform_vec4(&mut self, location: &MockLocation, value: [f32; 4]) {
        let (program, name) = (location.program, location.name.clone());
        self.calls.push(Call::SetVec4 {
            program,
            name,
            value,
        });
    }

    fn write_pass_block(&mut self, block: &PassBlock) {
        self.calls.push(Call::WritePassBlock(*block));
    }

    fn create_texture(
        &mut self,
        desc: &TextureDesc,
        pixels: Option<&[u8]>,
    ) -> Result<u32, ResourceError> {
        if self.fail_textures {
            return Err(ResourceError::new("texture", "out of memory"));
        }
        if let Some(pixels) = pixels {
            let expected =
                desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel();
            assert_eq!(pixels.len(), expected, "pixel payload size");
        }
        let id = self.next();
        self.live_textures.insert(id);
        self.calls.push(Call::CreateTexture {
            id,
            width: desc.width,
            height: desc.height,
            format: desc.format,
        });
        Ok(id)
    }

    fn update_texture(&mut self, texture: u32, _desc: &TextureDesc, pixels: &[u8]) {
        self.calls.push(Call::UpdateTexture {
            id: texture,
            pixels: pixels.to_vec(),
        });
    }

    fn delete_texture(&mut self, texture: u32) {
        assert!(self.live_textures.remove(&texture), "double delete {texture}");
        self.deleted.push(texture);
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<u32>) {
        self.calls.push(Call::BindTexture { unit, texture });
    }

    fn create_framebuffer(&mut self, color: u32) -> Result<u32, ResourceError> {
        let id = self.next();
        self.live_framebuffers.insert(id);
        self.calls.push(Call::CreateFramebuffer { id, color });
        Ok(id)
    }

    fn framebuffer_complete(&mut self, _framebuffer: u32) -> bool {
        !self.incomplete_framebuffers
    }

    fn delete_framebuffer(&mut self, framebuffer: u32) {
        assert!(
            self.live_framebuffers.remove(&framebuffer),
            "double delete {framebuffer}"
        );
        self.deleted.push(framebuffer);
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<u32>) {
        self.calls.push(Call::BindFramebuffer(framebuffer));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Viewport(width, height));
    }

    fn draw_fullscreen(&mut self) {
        self.calls.push(Call::Draw);
    }

    fn create_timer(&mut self) -> Option<u32> {
        let id = self.next();
        self.live_timers.insert(id);
        Some(id)
    }

    fn delete_timer(&mut self, query: u32) {
        assert!(self.live_timers.remove(&query), "double delete {query}");
        self.deleted.push(query);
    }

    fn begin_timer(&mut self, query: u32) {
        self.calls.push(Call::BeginTimer(query));
    }

    fn end_timer(&mut self) {
        self.calls.push(Call::EndTimer);
    }

    fn timer_result(&mut self, _query: u32) -> Option<u64> {
        self.timer_ns
    }
}
