use std::path::Path;

use anyhow::Result;
use preset::PresetPlan;

use crate::error::PipelineError;
use crate::gpu::GraphicsBackend;
use crate::pipeline::Pipeline;
use crate::timing::TimingReport;
use crate::types::{FrameInputs, PipelineOptions};

/// Holds the active pipeline and swaps it on reload.
///
/// A new pipeline is built completely before the old one is released, so a
/// failed reload leaves the running chain untouched.
#[derive(Debug)]
pub struct PipelineHost<B: GraphicsBackend> {
    pipeline: Option<Pipeline<B>>,
    options: PipelineOptions,
}

impl<B: GraphicsBackend> PipelineHost<B> {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            pipeline: None,
            options,
        }
    }

    /// Parses the preset and builds its pipeline, replacing the active one
    /// only on success.
    pub fn load(&mut self, gpu: &mut B, preset_path: &Path) -> Result<(), PipelineError> {
        let plan = PresetPlan::load(preset_path)?;
        let pipeline = Pipeline::build(gpu, &plan, &self.options)?;
        let passes = pipeline.pass_count();
        if let Some(previous) = self.pipeline.replace(pipeline) {
            previous.dispose(gpu);
        }
        tracing::info!(
            preset = %preset_path.display(),
            passes,
            "preset loaded"
        );
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn pipeline(&self) -> Option<&Pipeline<B>> {
        self.pipeline.as_ref()
    }

    pub fn pipeline_mut(&mut self) -> Option<&mut Pipeline<B>> {
        self.pipeline.as_mut()
    }

    /// Renders one frame. Does nothing while no pipeline is active.
    pub fn render_frame(&mut self, gpu: &mut B, inputs: &FrameInputs<B::Texture>) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.render(gpu, inputs);
        }
    }

    pub fn timing_report(&self) -> TimingReport {
        self.pipeline
            .as_ref()
            .map(Pipeline::timing_report)
            .unwrap_or_else(|| TimingReport {
                profiling: self.options.profiling,
                passes: Vec::new(),
            })
    }

    /// Writes the current per-pass GPU timings as JSON.
    pub fn dump_gpu_timing(&self, path: &Path) -> Result<()> {
        self.timing_report().write_json(path)
    }

    pub fn dispose(&mut self, gpu: &mut B) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.dispose(gpu);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::gpu::mock::{Call, MockBackend};
    use crate::types::{AudioBinding, TextureBinding};

    fn frame() -> FrameInputs<u32> {
        FrameInputs {
            viewport: (64, 64),
            time: 0.0,
            delta: 0.0,
            frame: 0,
            original: TextureBinding::empty(),
            audio: AudioBinding::disabled(512, 2),
        }
    }

    fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    const SHADER: &str = "void main() { FragColor = texture(Source, vTexCoord); }\n";

    #[test]
    fn failed_reload_keeps_previous_pipeline() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.slang", SHADER);
        write(&dir, "bad.slang", "void main() { oops }\n");
        let good = write(&dir, "good.slangp", "shaders = 2\nshader0 = a.slang\nshader1 = a.slang\n");
        let bad = write(&dir, "bad.slangp", "shaders = 1\nshader0 = bad.slang\n");
        let missing_count = write(&dir, "empty.slangp", "shader0 = a.slang\n");

        let mut gpu = MockBackend::new();
        gpu.fail_fragment_containing = Some("oops".into());
        let mut host = PipelineHost::new(PipelineOptions::default());
        assert!(!host.is_active());
        host.load(&mut gpu, &good).unwrap();
        let programs: Vec<u32> = host
            .pipeline()
            .unwrap()
            .passes()
            .iter()
            .map(|pass| pass.program())
            .collect();

        let err = host.load(&mut gpu, &bad).unwrap_err();
        assert!(matches!(err, PipelineError::Shader { index: 0, .. }));
        let err = host.load(&mut gpu, &missing_count).unwrap_err();
        assert!(matches!(err, PipelineError::Preset(_)));
        let err = host.load(&mut gpu, &dir.path().join("nope.slangp")).unwrap_err();
        assert!(err.to_string().contains("nope.slangp"));

        assert!(host.is_active());
        let pipeline = host.pipeline().unwrap();
        assert_eq!(pipeline.pass_count(), 2);
        for (pass, program) in pipeline.passes().iter().zip(&programs) {
            assert_eq!(pass.program(), *program);
            assert!(gpu.live_programs.contains(program));
        }

        gpu.clear_calls();
        host.render_frame(&mut gpu, &frame());
        assert_eq!(gpu.count(|call| *call == Call::Draw), 2);
    }

    #[test]
    fn successful_reload_disposes_old_pipeline_once() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.slang", SHADER);
        let first = write(&dir, "first.slangp", "shaders = 2\nshader0 = a.slang\nshader1 = a.slang\n");
        let second = write(&dir, "second.slangp", "shaders = 1\nshader0 = a.slang\n");

        let mut gpu = MockBackend::new();
        let mut host = PipelineHost::new(PipelineOptions::default());
        host.load(&mut gpu, &first).unwrap();
        host.render_frame(&mut gpu, &frame());
        let before = gpu.live_resources();
        assert_eq!(before, 4);

        host.load(&mut gpu, &second).unwrap();
        assert_eq!(gpu.deleted.len(), 4);
        assert_eq!(gpu.live_resources(), 1);

        host.dispose(&mut gpu);
        assert!(!host.is_active());
        assert_eq!(gpu.live_resources(), 0);
        host.dispose(&mut gpu);
        assert_eq!(gpu.deleted.len(), 5);
    }

    #[test]
    fn timing_dump_without_pipeline_is_empty() {
        let dir = TempDir::new().unwrap();
        let host: PipelineHost<MockBackend> = PipelineHost::new(PipelineOptions::default());
        let path = dir.path().join("timing.json");
        host.dump_gpu_timing(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["passes"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn render_without_pipeline_is_a_no_op() {
        let mut gpu = MockBackend::new();
        let mut host = PipelineHost::new(PipelineOptions::default());
        host.render_frame(&mut gpu, &frame());
        assert!(gpu.calls.is_empty());
    }
}
