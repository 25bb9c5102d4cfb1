//! Rewrites RetroArch-style "slang" shaders into plain GLSL 330 fragment
//! bodies.
//!
//! This is a targeted textual rewrite, not a compiler. It keeps the fragment
//! stage, flattens `layout(...)`-qualified uniform blocks into loose
//! uniforms, and drops declarations the renderer's preamble already provides.
//! `#pragma parameter` lines are left in place and reported separately.
//!
//! ```
//! let shader = "#version 450\n\
//!     #pragma parameter GAIN \"Gain\" 1.5 0.0 4.0 0.1\n\
//!     layout(std140, set = 0, binding = 0) uniform UBO { vec4 OutputSize; float GAIN; } global;\n\
//!     #pragma stage fragment\n\
//!     layout(location = 0) out vec4 FragColor;\n\
//!     void main() { FragColor = vec4(global.GAIN); }\n";
//!
//! let out = slang::transpile(shader);
//! assert!(out.source.contains("uniform float GAIN;"));
//! assert!(out.source.contains("FragColor = vec4(GAIN);"));
//! assert!(!out.source.contains("out vec4 FragColor"));
//! assert_eq!(out.parameters[0].default, 1.5);
//! ```

mod params;
mod rewrite;
mod scan;
mod stage;

pub use params::{parse_parameters, Parameter};
pub use stage::{extract_fragment_stage, strip_version_directive};

/// Names the renderer's fragment preamble declares itself.
pub const BUILTIN_NAMES: [&str; 9] = [
    "Source",
    "Original",
    "SourceSize",
    "OriginalSize",
    "OutputSize",
    "FinalViewportSize",
    "FrameCount",
    "FrameTime",
    "FrameDirection",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Result of [`transpile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transpiled {
    pub source: String,
    pub parameters: Vec<Parameter>,
}

/// Extracts the fragment stage and rewrites its declarations.
///
/// Running the output through `transpile` again leaves it unchanged.
pub fn transpile(source: &str) -> Transpiled {
    let fragment = extract_fragment_stage(source);
    let source = rewrite::rewrite_layouts(&fragment);
    let parameters = parse_parameters(&source);
    Transpiled { source, parameters }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRT: &str = r#"#version 450

#pragma parameter CURVE "Curvature" 0.1 0.0 0.5 0.01
#pragma parameter MASK "Mask strength" 0.3 0.0 1.0 0.05

layout(push_constant) uniform Push
{
   vec4 SourceSize;
   vec4 OutputSize;
   uint FrameCount;
   float CURVE;
} params;

layout(std140, set = 0, binding = 0) uniform UBO
{
   mat4 MVP;
   float MASK;
} global;

#pragma stage vertex
layout(location = 0) in vec4 Position;
layout(location = 1) in vec2 TexCoord;
layout(location = 0) out vec2 vTexCoord;

void main()
{
   gl_Position = global.MVP * Position;
   vTexCoord = TexCoord;
}

#pragma stage fragment
layout(location = 0) in vec2 vTexCoord;
layout(location = 1) in vec2 warped;
layout(location = 0) out vec4 FragColor;
layout(set = 0, binding = 2) uniform sampler2D Source;
layout(set = 0, binding = 3) uniform sampler2D Pass0;

void main()
{
   // params.CURVE stays commented
   vec2 uv = vTexCoord * (1.0 + params.CURVE);
   vec3 col = texture(Source, uv).rgb * global.MASK;
   col += texture(Pass0, uv).rgb / params.SourceSize.x;
   FragColor = vec4(col, float(params.FrameCount));
}
"#;

    #[test]
    fn transpiles_combined_shader() {
        let out = transpile(CRT);
        let src = &out.source;

        assert!(!src.contains("#pragma stage"));
        assert!(!src.contains("Position"));
        assert!(!src.contains("layout"));
        assert!(src.contains("uniform float CURVE;\n"));
        assert!(src.contains("uniform mat4 MVP;\n"));
        assert!(src.contains("uniform float MASK;\n"));
        assert!(!src.contains("uniform vec4 SourceSize"));
        assert!(!src.contains("uniform uint FrameCount"));
        assert!(src.contains("in vec2 warped;"));
        assert!(!src.contains("in vec2 vTexCoord;"));
        assert!(!src.contains("out vec4 FragColor;"));
        assert!(!src.contains("sampler2D Source;"));
        assert!(src.contains("uniform sampler2D Pass0;"));
        assert!(src.contains("vec2 uv = vTexCoord * (1.0 + CURVE);"));
        assert!(src.contains("* MASK;"));
        assert!(src.contains("/ SourceSize.x;"));
        assert!(src.contains("float(FrameCount)"));
        assert!(src.contains("#version 450"));
    }

    #[test]
    fn builtin_only_block_leaves_no_block_or_prefix() {
        let shader = "layout(std140, set = 0, binding = 0) uniform UBO { vec4 SourceSize; vec4 OutputSize; } global;\nvoid main() { FragColor = vec4(global.SourceSize.xy, global.OutputSize.zw); }\n";
        let out = transpile(shader);
        assert!(!out.source.contains("uniform"));
        assert!(!out.source.contains("UBO"));
        assert!(!out.source.contains("global."));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let once = transpile(CRT);
        let twice = transpile(&once.source);
        assert_eq!(once, twice);
    }

    #[test]
    fn records_parameters_from_output() {
        let out = transpile(CRT);
        let names: Vec<_> = out.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["CURVE", "MASK"]);
        assert_eq!(out.parameters[1].default, 0.3);
        assert_eq!(out.parameters[1].step, Some(0.05));
        assert!(out.source.contains("#pragma parameter CURVE"));
    }

    #[test]
    fn builtin_lookup() {
        assert!(is_builtin("FinalViewportSize"));
        assert!(!is_builtin("MVP"));
        assert!(!is_builtin("source"));
    }
}
