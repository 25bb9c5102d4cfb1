use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use preset::{FilterMode, PresetPlan, ScaleType};

/// Validates a preset without a GPU: every pass is read and transpiled and a
/// summary is printed to stdout.
pub fn run_check(preset: &Path) -> Result<()> {
    let plan = PresetPlan::load(preset)
        .with_context(|| format!("failed to load preset {}", preset.display()))?;
    let summary = summarise(&plan)?;
    print!("{summary}");
    tracing::info!(passes = plan.pass_count(), "preset check passed");
    Ok(())
}

fn summarise(plan: &PresetPlan) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "passes: {}", plan.pass_count());

    for spec in &plan.passes {
        let source = fs::read_to_string(&spec.shader).with_context(|| {
            format!(
                "pass {}: failed to read shader {}",
                spec.index,
                spec.shader.display()
            )
        })?;
        let transpiled = slang::transpile(&source);

        let filter = match spec.filter {
            FilterMode::Linear => "linear",
            FilterMode::Nearest => "nearest",
        };
        let scale_type = match spec.scale.scale_type {
            ScaleType::Viewport => "viewport",
            ScaleType::Source => "source",
        };
        let _ = writeln!(
            out,
            "pass {}: {} filter={} scale_type={} scale={}",
            spec.index,
            spec.shader.display(),
            filter,
            scale_type,
            describe_scale(spec.scale.scale, spec.scale.scale_x, spec.scale.scale_y),
        );
        for parameter in &transpiled.parameters {
            let _ = writeln!(
                out,
                "  parameter {} = {} ({})",
                parameter.name, parameter.default, parameter.description
            );
        }
    }

    for texture in &plan.textures {
        let status = if texture.path.is_file() {
            "ok"
        } else {
            "missing"
        };
        let _ = writeln!(
            out,
            "texture {}: {} [{}]",
            texture.name,
            texture.path.display(),
            status
        );
    }
    Ok(out)
}

fn describe_scale(scale: f32, scale_x: Option<f32>, scale_y: Option<f32>) -> String {
    match (scale_x, scale_y) {
        (None, None) => format!("{scale}"),
        (x, y) => {
            let axis = |v: Option<f32>| v.map_or_else(|| format!("{scale}"), |v| format!("{v}"));
            format!("{}x{}", axis(x), axis(y))
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn summary_lists_passes_parameters_and_textures() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("glow.slang"),
            "#pragma parameter GLOW \"Glow strength\" 0.25 0.0 1.0 0.05\nvoid main() {}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("chain.slangp"),
            "shaders = 2\nshader0 = glow.slang\nfilter_linear0 = false\nscale_type0 = source\nscale_x0 = 0.5\n\
             shader1 = glow.slang\ntextures = lut\nlut = lut.png\n",
        )
        .unwrap();
        let plan = PresetPlan::load(dir.path().join("chain.slangp")).unwrap();
        let summary = summarise(&plan).unwrap();

        assert!(summary.starts_with("passes: 2\n"));
        assert!(summary.contains("filter=nearest scale_type=source scale=0.5x1"));
        assert!(summary.contains("  parameter GLOW = 0.25 (Glow strength)"));
        assert!(summary.contains("texture lut:"));
        assert!(summary.contains("[missing]"));
    }

    #[test]
    fn unreadable_shader_names_the_pass() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("chain.slangp"), "shaders = 1\nshader0 = gone.slang\n").unwrap();
        let plan = PresetPlan::load(dir.path().join("chain.slangp")).unwrap();
        let err = summarise(&plan).unwrap_err();
        assert!(format!("{err:#}").contains("pass 0"));
    }
}
