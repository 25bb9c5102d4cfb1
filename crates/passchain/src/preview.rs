use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version,
};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasRawWindowHandle;
use renderer::gpu::{GlowBackend, GraphicsBackend};
use renderer::{
    load_image_texture, placeholder_texture, AudioSource, AudioTexture, FrameInputs,
    PipelineHost, PipelineOptions, SyntheticGenerator, TextureBinding,
};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowBuilder};

use crate::cli::{Args, AudioMode};

/// Everything the window owns. Surface and context are declared before the
/// window so they drop first.
struct Preview {
    gl_surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    window: Window,
    gpu: GlowBackend,
    host: PipelineHost<GlowBackend>,
    original: TextureBinding<glow::NativeTexture>,
    audio_source: AudioSource,
    audio_texture: AudioTexture<GlowBackend>,
    preset: PathBuf,
    timing_report: Option<PathBuf>,
    start: Instant,
    last_frame: Instant,
    frame: i32,
}

pub fn run_preview(args: &Args) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let title = args
        .preset
        .file_name()
        .map(|name| format!("passchain - {}", name.to_string_lossy()))
        .unwrap_or_else(|| "passchain".to_string());
    let window_builder = WindowBuilder::new()
        .with_title(title)
        .with_inner_size(PhysicalSize::new(args.size.0, args.size.1));

    let template = ConfigTemplateBuilder::new()
        .with_alpha_size(8)
        .with_depth_size(0);
    let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));
    let (window, gl_config) = display_builder
        .build(&event_loop, template, |configs| {
            configs
                .reduce(|a, b| if b.num_samples() < a.num_samples() { b } else { a })
                .expect("display offers no GL configs")
        })
        .map_err(|err| anyhow!("failed to build GL display: {err}"))?;
    let window = window.context("GL display did not create a window")?;

    let raw_window_handle = window.raw_window_handle();
    let gl_display = gl_config.display();
    let context_attributes = ContextAttributesBuilder::new()
        .with_profile(GlProfile::Core)
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(raw_window_handle));
    let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
        .context("failed to create an OpenGL 3.3 core context")?;

    let size = window.inner_size();
    let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window_handle,
        non_zero(size.width),
        non_zero(size.height),
    );
    let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes) }
        .context("failed to create window surface")?;
    let gl_context = not_current
        .make_current(&gl_surface)
        .context("failed to make GL context current")?;
    if let Err(err) =
        gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN))
    {
        tracing::warn!(error = %err, "vsync unavailable");
    }

    let gl = unsafe {
        glow::Context::from_loader_function_cstr(|name| gl_display.get_proc_address(name))
    };
    let mut gpu = GlowBackend::new(gl).context("failed to initialise OpenGL backend")?;

    let original = match &args.image {
        Some(path) => load_image_texture(&mut gpu, path)?,
        None => placeholder_texture(&mut gpu)?,
    };
    tracing::debug!(
        width = original.width,
        height = original.height,
        "original input ready"
    );

    let audio_source = match args.audio {
        AudioMode::None => AudioSource::Disabled,
        AudioMode::Synthetic => AudioSource::Synthetic(SyntheticGenerator::new()),
    };
    let audio_texture = AudioTexture::new(&mut gpu).context("failed to create audio texture")?;

    let mut host = PipelineHost::new(PipelineOptions {
        profiling: args.profile,
        timing_window: args.timing_window,
    });
    host.load(&mut gpu, &args.preset)
        .with_context(|| format!("failed to load preset {}", args.preset.display()))?;

    let now = Instant::now();
    let mut preview = Some(Preview {
        gl_surface,
        gl_context,
        window,
        gpu,
        host,
        original,
        audio_source,
        audio_texture,
        preset: args.preset.clone(),
        timing_report: args.timing_report.clone(),
        start: now,
        last_frame: now,
        frame: 0,
    });

    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop
        .run(move |event, elwt| {
            if let Event::LoopExiting = event {
                if let Some(state) = preview.take() {
                    state.shutdown();
                }
                return;
            }
            let Some(state) = preview.as_mut() else {
                return;
            };
            match event {
                Event::WindowEvent { window_id, event } if window_id == state.window.id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                        WindowEvent::Resized(size) => state.resize(size),
                        WindowEvent::KeyboardInput { event, .. }
                            if event.state == ElementState::Pressed && !event.repeat =>
                        {
                            match event.physical_key {
                                PhysicalKey::Code(KeyCode::KeyR) => state.reload(),
                                PhysicalKey::Code(KeyCode::Escape) => elwt.exit(),
                                _ => {}
                            }
                        }
                        WindowEvent::RedrawRequested => {
                            if let Err(err) = state.render() {
                                tracing::error!("{err:?}");
                                elwt.exit();
                            }
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => state.window.request_redraw(),
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop terminated with error: {err}"))
}

impl Preview {
    fn render(&mut self) -> Result<()> {
        let now = Instant::now();
        let time = now.duration_since(self.start).as_secs_f32();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.audio_texture
            .update(&mut self.gpu, &mut self.audio_source);

        let size = self.window.inner_size();
        let inputs = FrameInputs {
            viewport: (size.width.max(1), size.height.max(1)),
            time,
            delta,
            frame: self.frame,
            original: self.original,
            audio: self.audio_texture.binding(),
        };
        self.gpu.clear([0.0, 0.0, 0.0, 1.0]);
        self.host.render_frame(&mut self.gpu, &inputs);
        self.gl_surface
            .swap_buffers(&self.gl_context)
            .context("failed to swap buffers")?;
        self.frame = self.frame.wrapping_add(1);
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gl_surface
            .resize(&self.gl_context, non_zero(size.width), non_zero(size.height));
        tracing::debug!(width = size.width, height = size.height, "window resized");
        self.window.request_redraw();
    }

    fn reload(&mut self) {
        tracing::info!(preset = %self.preset.display(), "reloading preset");
        if let Err(err) = self.host.load(&mut self.gpu, &self.preset) {
            tracing::error!(error = %err, "reload failed; keeping current pipeline");
        }
    }

    fn shutdown(mut self) {
        if let Some(path) = &self.timing_report {
            if let Err(err) = self.host.dump_gpu_timing(path) {
                tracing::warn!("failed to write GPU timing report: {err:#}");
            }
        }
        self.host.dispose(&mut self.gpu);
        self.audio_texture.dispose(&mut self.gpu);
        if let Some(texture) = self.original.texture {
            self.gpu.delete_texture(texture);
        }
        self.gpu.dispose();
        tracing::info!(frames = self.frame, "preview closed");
    }
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}
