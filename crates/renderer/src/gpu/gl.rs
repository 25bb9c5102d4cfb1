use glow::HasContext;
use preset::FilterMode;

use super::backend::{GraphicsBackend, PassBlock, TextureDesc, TextureFormat};
use crate::compile::PASS_BLOCK_BINDING;
use crate::error::{ResourceError, ShaderError, ShaderStage};

/// OpenGL 3.3 core implementation of [`GraphicsBackend`] on top of `glow`.
///
/// The context must stay current on the calling thread for the lifetime of
/// the backend.
pub struct GlowBackend {
    gl: glow::Context,
    vertex_array: glow::NativeVertexArray,
    pass_buffer: glow::NativeBuffer,
    /// Texture uploads happen on this unit so sampler bindings survive them.
    upload_unit: u32,
}

impl GlowBackend {
    pub fn new(gl: glow::Context) -> Result<Self, ResourceError> {
        unsafe {
            let vertex_array = gl
                .create_vertex_array()
                .map_err(|err| ResourceError::new("vertex array", err))?;
            let pass_buffer = gl
                .create_buffer()
                .map_err(|err| ResourceError::new("pass uniform buffer", err))?;

            gl.bind_buffer(glow::UNIFORM_BUFFER, Some(pass_buffer));
            gl.buffer_data_size(
                glow::UNIFORM_BUFFER,
                std::mem::size_of::<PassBlock>() as i32,
                glow::DYNAMIC_DRAW,
            );
            gl.bind_buffer(glow::UNIFORM_BUFFER, None);
            gl.bind_buffer_base(glow::UNIFORM_BUFFER, PASS_BLOCK_BINDING, Some(pass_buffer));

            // Core profiles refuse to draw without a bound vertex array.
            gl.bind_vertex_array(Some(vertex_array));
            gl.disable(glow::DEPTH_TEST);

            let units = gl.get_parameter_i32(glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS);
            let upload_unit = (units.max(1) - 1) as u32;

            tracing::debug!(
                version = %gl.get_parameter_string(glow::VERSION),
                renderer = %gl.get_parameter_string(glow::RENDERER),
                texture_units = units,
                "initialised OpenGL backend"
            );

            Ok(Self {
                gl,
                vertex_array,
                pass_buffer,
                upload_unit,
            })
        }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    pub fn clear(&mut self, rgba: [f32; 4]) {
        unsafe {
            self.gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Releases the objects owned by the backend itself.
    pub fn dispose(self) {
        unsafe {
            self.gl.bind_vertex_array(None);
            self.gl.delete_vertex_array(self.vertex_array);
            self.gl.delete_buffer(self.pass_buffer);
        }
    }

    unsafe fn compile_stage(
        &self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<glow::NativeShader, ShaderError> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let shader = self.gl.create_shader(kind).map_err(ShaderError::Create)?;
        self.gl.shader_source(shader, source);
        self.gl.compile_shader(shader);
        if !self.gl.get_shader_compile_status(shader) {
            let log = self.gl.get_shader_info_log(shader);
            self.gl.delete_shader(shader);
            return Err(ShaderError::Compile { stage, log });
        }
        Ok(shader)
    }
}

fn pixel_layout(format: TextureFormat) -> (u32, u32, u32) {
    match format {
        TextureFormat::Rgba8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        TextureFormat::R32Float => (glow::R32F, glow::RED, glow::FLOAT),
    }
}

fn filter_mode(filter: FilterMode) -> i32 {
    match filter {
        FilterMode::Linear => glow::LINEAR as i32,
        FilterMode::Nearest => glow::NEAREST as i32,
    }
}

impl GraphicsBackend for GlowBackend {
    type Program = glow::NativeProgram;
    type Texture = glow::NativeTexture;
    type Framebuffer = glow::NativeFramebuffer;
    type UniformLocation = glow::NativeUniformLocation;
    type Query = glow::NativeQuery;

    fn create_program(
        &mut self,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self::Program, ShaderError> {
        unsafe {
            let vs = self.compile_stage(ShaderStage::Vertex, vertex)?;
            let fs = match self.compile_stage(ShaderStage::Fragment, fragment) {
                Ok(fs) => fs,
                Err(err) => {
                    self.gl.delete_shader(vs);
                    return Err(err);
                }
            };

            let program = match self.gl.create_program() {
                Ok(program) => program,
                Err(err) => {
                    self.gl.delete_shader(vs);
                    self.gl.delete_shader(fs);
                    return Err(ShaderError::Create(err));
                }
            };
            self.gl.attach_shader(program, vs);
            self.gl.attach_shader(program, fs);
            self.gl.link_program(program);
            self.gl.detach_shader(program, vs);
            self.gl.detach_shader(program, fs);
            self.gl.delete_shader(vs);
            self.gl.delete_shader(fs);

            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(ShaderError::Link { log });
            }
            Ok(program)
        }
    }

    fn delete_program(&mut self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&mut self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn uniform_location(
        &mut self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn bind_uniform_block(&mut self, program: Self::Program, block: &str, binding: u32) -> bool {
        unsafe {
            match self.gl.get_uniform_block_index(program, block) {
                Some(index) => {
                    self.gl.uniform_block_binding(program, index, binding);
                    true
                }
                None => false,
            }
        }
    }

    fn set_uniform_i32(&mut self, location: &Self::UniformLocation, value: i32) {
        unsafe { self.gl.uniform_1_i32(Some(location), value) }
    }

    fn set_uniform_f32(&mut self, location: &Self::UniformLocation, value: f32) {
        unsafe { self.gl.uniform_1_f32(Some(location), value) }
    }

    fn set_uniform_vec4(&mut self, location: &Self::UniformLocation, [x, y, z, w]: [f32; 4]) {
        unsafe { self.gl.uniform_4_f32(Some(location), x, y, z, w) }
    }

    fn write_pass_block(&mut self, block: &PassBlock) {
        unsafe {
            self.gl
                .bind_buffer(glow::UNIFORM_BUFFER, Some(self.pass_buffer));
            self.gl
                .buffer_sub_data_u8_slice(glow::UNIFORM_BUFFER, 0, bytemuck::bytes_of(block));
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, None);
        }
    }

    fn create_texture(
        &mut self,
        desc: &TextureDesc,
        pixels: Option<&[u8]>,
    ) -> Result<Self::Texture, ResourceError> {
        let (internal, format, ty) = pixel_layout(desc.format);
        let filter = filter_mode(desc.filter);
        unsafe {
            let texture = self
                .gl
                .create_texture()
                .map_err(|err| ResourceError::new("texture", err))?;
            self.gl.active_texture(glow::TEXTURE0 + self.upload_unit);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                desc.width as i32,
                desc.height as i32,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            Ok(texture)
        }
    }

    fn update_texture(&mut self, texture: Self::Texture, desc: &TextureDesc, pixels: &[u8]) {
        let (_, format, ty) = pixel_layout(desc.format);
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + self.upload_unit);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                desc.width as i32,
                desc.height as i32,
                format,
                ty,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    fn delete_texture(&mut self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<Self::Texture>) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, texture);
        }
    }

    fn create_framebuffer(
        &mut self,
        color: Self::Texture,
    ) -> Result<Self::Framebuffer, ResourceError> {
        unsafe {
            let framebuffer = self
                .gl
                .create_framebuffer()
                .map_err(|err| ResourceError::new("framebuffer", err))?;
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(color),
                0,
            );
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            Ok(framebuffer)
        }
    }

    fn framebuffer_complete(&mut self, framebuffer: Self::Framebuffer) -> bool {
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                tracing::debug!(status = %format!("0x{status:x}"), "framebuffer status");
            }
            status == glow::FRAMEBUFFER_COMPLETE
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer) {
        unsafe { self.gl.delete_framebuffer(framebuffer) }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<Self::Framebuffer>) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        unsafe { self.gl.viewport(0, 0, width as i32, height as i32) }
    }

    fn draw_fullscreen(&mut self) {
        unsafe { self.gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4) }
    }

    fn create_timer(&mut self) -> Option<Self::Query> {
        unsafe { self.gl.create_query().ok() }
    }

    fn delete_timer(&mut self, query: Self::Query) {
        unsafe { self.gl.delete_query(query) }
    }

    fn begin_timer(&mut self, query: Self::Query) {
        unsafe { self.gl.begin_query(glow::TIME_ELAPSED, query) }
    }

    fn end_timer(&mut self) {
        unsafe { self.gl.end_query(glow::TIME_ELAPSED) }
    }

    fn timer_result(&mut self, query: Self::Query) -> Option<u64> {
        unsafe {
            let available = self
                .gl
                .get_query_parameter_u32(query, glow::QUERY_RESULT_AVAILABLE);
            (available != 0)
                .then(|| u64::from(self.gl.get_query_parameter_u32(query, glow::QUERY_RESULT)))
        }
    }
}
