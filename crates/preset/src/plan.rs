use std::path::{Path, PathBuf};

use crate::table::{unquote, Preset};
use crate::{PresetError, MAX_PASSES, MAX_TEXTURES};

/// Sampling filter applied to a pass's render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Linear,
    Nearest,
}

/// What a pass's output size is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleType {
    /// Scale relative to the live viewport.
    #[default]
    Viewport,
    /// Scale relative to the previous pass's output.
    Source,
}

/// Per-pass output sizing rule.
///
/// `scale_x`/`scale_y` take precedence per axis; otherwise the uniform
/// `scale` factor applies. Non-positive factors are treated as absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePolicy {
    pub scale_type: ScaleType,
    pub scale: f32,
    pub scale_x: Option<f32>,
    pub scale_y: Option<f32>,
}

impl Default for ScalePolicy {
    fn default() -> Self {
        Self {
            scale_type: ScaleType::Viewport,
            scale: 1.0,
            scale_x: None,
            scale_y: None,
        }
    }
}

impl ScalePolicy {
    /// Computes the output size for a pass given the live viewport and the
    /// previous pass's output (the viewport for the first pass).
    ///
    /// Results are floored and never smaller than 1×1.
    pub fn output_size(&self, viewport: (u32, u32), source: (u32, u32)) -> (u32, u32) {
        let (base_w, base_h) = match self.scale_type {
            ScaleType::Viewport => viewport,
            ScaleType::Source => source,
        };
        let uniform = (self.scale > 0.0).then_some(self.scale);
        let factor_x = self.scale_x.filter(|f| *f > 0.0).or(uniform);
        let factor_y = self.scale_y.filter(|f| *f > 0.0).or(uniform);
        (scale_axis(base_w, factor_x), scale_axis(base_h, factor_y))
    }
}

fn scale_axis(base: u32, factor: Option<f32>) -> u32 {
    let scaled = match factor {
        Some(factor) => (f64::from(base) * f64::from(factor)).floor() as u32,
        None => base,
    };
    scaled.max(1)
}

/// One validated pass declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PassSpec {
    pub index: usize,
    pub shader: PathBuf,
    pub filter: FilterMode,
    pub scale: ScalePolicy,
}

/// One named side-input texture declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSpec {
    pub name: String,
    pub path: PathBuf,
}

/// Typed, validated view of a [`Preset`].
#[derive(Debug, Clone, PartialEq)]
pub struct PresetPlan {
    pub passes: Vec<PassSpec>,
    pub textures: Vec<TextureSpec>,
}

impl PresetPlan {
    /// Reads the preset at `path` and plans it relative to its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        let path = path.as_ref();
        let preset = Preset::load(path)?;
        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Self::from_preset(&preset, base_dir)
    }

    pub fn from_preset(preset: &Preset, base_dir: &Path) -> Result<Self, PresetError> {
        let count = pass_count(preset)?;
        let textures = texture_specs(preset, base_dir)?;

        let mut passes = Vec::with_capacity(count);
        for index in 0..count {
            passes.push(pass_spec(preset, base_dir, index)?);
        }

        Ok(Self { passes, textures })
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }
}

fn pass_count(preset: &Preset) -> Result<usize, PresetError> {
    let raw = preset
        .get("shaders")
        .ok_or(PresetError::MissingPassCount)?
        .trim();
    let count: i64 = raw
        .parse()
        .map_err(|_| PresetError::InvalidPassCount(raw.to_string()))?;
    if count < 1 {
        return Err(PresetError::InvalidPassCount(raw.to_string()));
    }
    let count = count as usize;
    if count > MAX_PASSES {
        return Err(PresetError::TooManyPasses {
            count,
            max: MAX_PASSES,
        });
    }
    Ok(count)
}

fn pass_spec(preset: &Preset, base_dir: &Path, index: usize) -> Result<PassSpec, PresetError> {
    let shader_key = format!("shader{index}");
    let shader = preset
        .get(&shader_key)
        .ok_or_else(|| PresetError::MissingKey(shader_key.clone()))?;

    let filter = match preset
        .get(&format!("filter_linear{index}"))
        .and_then(parse_bool)
    {
        Some(false) => FilterMode::Nearest,
        _ => FilterMode::Linear,
    };

    let scale_type = match preset.get(&format!("scale_type{index}")) {
        None => ScaleType::Viewport,
        Some(raw) => {
            let raw = unquote(raw.trim()).trim();
            if raw.eq_ignore_ascii_case("source") {
                ScaleType::Source
            } else {
                if !raw.is_empty() && !raw.eq_ignore_ascii_case("viewport") {
                    tracing::warn!(
                        pass = index,
                        value = raw,
                        "unknown scale_type; using viewport"
                    );
                }
                ScaleType::Viewport
            }
        }
    };

    let scale = parse_float(preset.get(&format!("scale{index}"))).unwrap_or(1.0);
    let scale_x = parse_float(preset.get(&format!("scale_x{index}"))).filter(|v| *v > 0.0);
    let scale_y = parse_float(preset.get(&format!("scale_y{index}"))).filter(|v| *v > 0.0);

    Ok(PassSpec {
        index,
        shader: resolve_path(base_dir, shader),
        filter,
        scale: ScalePolicy {
            scale_type,
            scale,
            scale_x,
            scale_y,
        },
    })
}

fn texture_specs(preset: &Preset, base_dir: &Path) -> Result<Vec<TextureSpec>, PresetError> {
    let Some(list) = preset.get("textures") else {
        return Ok(Vec::new());
    };

    let mut specs: Vec<TextureSpec> = Vec::new();
    for name in list.split(';').map(str::trim).filter(|n| !n.is_empty()) {
        let Some(path) = preset.get(name) else {
            tracing::warn!(texture = name, "preset lists texture but no path was provided");
            continue;
        };
        if specs.iter().any(|spec| spec.name == name) {
            tracing::debug!(texture = name, "duplicate texture declaration ignored");
            continue;
        }
        if specs.len() == MAX_TEXTURES {
            return Err(PresetError::TooManyTextures { max: MAX_TEXTURES });
        }
        specs.push(TextureSpec {
            name: name.to_string(),
            path: resolve_path(base_dir, path),
        });
    }
    Ok(specs)
}

fn resolve_path(base_dir: &Path, value: &str) -> PathBuf {
    let relative = Path::new(unquote(value.trim()));
    if relative.is_absolute() {
        relative.to_path_buf()
    } else {
        base_dir.join(relative)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw == "1" || raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if raw == "0" || raw.eq_ignore_ascii_case("false") || raw.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

fn parse_float(raw: Option<&str>) -> Option<f32> {
    raw?.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn plan(text: &str) -> Result<PresetPlan, PresetError> {
        PresetPlan::from_preset(&Preset::parse(text), Path::new("/presets"))
    }

    #[test]
    fn plans_passes_with_defaults() {
        let plan = plan("shaders = 2\nshader0 = a.slang\nshader1 = /abs/b.slang").unwrap();
        assert_eq!(plan.pass_count(), 2);
        assert_eq!(plan.passes[0].shader, PathBuf::from("/presets/a.slang"));
        assert_eq!(plan.passes[1].shader, PathBuf::from("/abs/b.slang"));
        assert_eq!(plan.passes[0].filter, FilterMode::Linear);
        assert_eq!(plan.passes[0].scale, ScalePolicy::default());
        assert!(plan.textures.is_empty());
    }

    #[test]
    fn reads_per_pass_fields() {
        let plan = plan(
            "shaders=1\nshader0=a.slang\nfilter_linear0=NO\nscale_type0=\"Source\"\nscale0=0.5\nscale_x0=0.25\nscale_y0=0",
        )
        .unwrap();
        let pass = &plan.passes[0];
        assert_eq!(pass.filter, FilterMode::Nearest);
        assert_eq!(pass.scale.scale_type, ScaleType::Source);
        assert_eq!(pass.scale.scale, 0.5);
        assert_eq!(pass.scale.scale_x, Some(0.25));
        assert_eq!(pass.scale.scale_y, None);
    }

    #[test]
    fn unknown_filter_and_scale_type_fall_back() {
        let plan =
            plan("shaders=1\nshader0=a\nfilter_linear0=maybe\nscale_type0=absolute\nscale0=x")
                .unwrap();
        let pass = &plan.passes[0];
        assert_eq!(pass.filter, FilterMode::Linear);
        assert_eq!(pass.scale.scale_type, ScaleType::Viewport);
        assert_eq!(pass.scale.scale, 1.0);
    }

    #[test]
    fn rejects_missing_or_invalid_pass_count() {
        assert!(matches!(plan("shader0=a"), Err(PresetError::MissingPassCount)));
        assert!(matches!(
            plan("shaders=0\nshader0=a"),
            Err(PresetError::InvalidPassCount(v)) if v == "0"
        ));
        assert!(matches!(
            plan("shaders=two"),
            Err(PresetError::InvalidPassCount(_))
        ));
        assert!(matches!(
            plan("shaders=33"),
            Err(PresetError::TooManyPasses { count: 33, max: 32 })
        ));
    }

    #[test]
    fn rejects_missing_shader_key() {
        let err = plan("shaders=2\nshader0=a.slang").unwrap_err();
        assert!(matches!(err, PresetError::MissingKey(ref key) if key == "shader1"));
        assert_eq!(err.to_string(), "preset is missing 'shader1'");
    }

    #[test]
    fn accepts_pass_count_at_cap() {
        let mut text = format!("shaders={MAX_PASSES}\n");
        for index in 0..MAX_PASSES {
            text.push_str(&format!("shader{index}=p{index}.slang\n"));
        }
        assert_eq!(plan(&text).unwrap().pass_count(), MAX_PASSES);
    }

    #[test]
    fn collects_named_textures() {
        let plan = plan(
            "shaders=1\nshader0=a\ntextures=\"noise; lut ;;ghost;noise\"\nnoise=tex/noise.png\nlut=\"/lut.png\"",
        )
        .unwrap();
        assert_eq!(
            plan.textures,
            vec![
                TextureSpec {
                    name: "noise".into(),
                    path: PathBuf::from("/presets/tex/noise.png"),
                },
                TextureSpec {
                    name: "lut".into(),
                    path: PathBuf::from("/lut.png"),
                },
            ]
        );
    }

    #[test]
    fn rejects_too_many_textures() {
        let names: Vec<String> = (0..=MAX_TEXTURES).map(|i| format!("t{i}")).collect();
        let mut text = format!("shaders=1\nshader0=a\ntextures=\"{}\"\n", names.join(";"));
        for name in &names {
            text.push_str(&format!("{name}={name}.png\n"));
        }
        assert!(matches!(
            plan(&text),
            Err(PresetError::TooManyTextures { max: MAX_TEXTURES })
        ));
    }

    #[test]
    fn viewport_scaling_matches_expected_sizes() {
        let half = ScalePolicy {
            scale: 0.5,
            ..ScalePolicy::default()
        };
        assert_eq!(half.output_size((1920, 1080), (1, 1)), (960, 540));

        let split = ScalePolicy {
            scale_x: Some(0.25),
            scale_y: Some(1.0),
            ..ScalePolicy::default()
        };
        assert_eq!(split.output_size((1920, 1080), (1, 1)), (480, 1080));

        let tiny = ScalePolicy {
            scale: 0.0001,
            ..ScalePolicy::default()
        };
        assert_eq!(tiny.output_size((1920, 1080), (1, 1)), (1, 1));
    }

    #[test]
    fn source_scaling_uses_previous_output() {
        let policy = ScalePolicy {
            scale_type: ScaleType::Source,
            scale: 2.0,
            ..ScalePolicy::default()
        };
        assert_eq!(policy.output_size((1920, 1080), (320, 200)), (640, 400));
    }

    #[test]
    fn load_resolves_relative_to_preset_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let preset_path = dir.path().join("chain.slangp");
        fs::write(&preset_path, "shaders = 1\nshader0 = shaders/pass.slang\n").unwrap();

        let plan = PresetPlan::load(&preset_path).unwrap();
        assert_eq!(plan.passes[0].shader, dir.path().join("shaders/pass.slang"));
    }
}
