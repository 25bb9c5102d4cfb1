use slang::strip_version_directive;

/// Uniform block every pass program shares for its size vectors.
pub(crate) const PASS_BLOCK_NAME: &str = "passchain_pass";
/// Binding point the pass block is attached to after linking.
pub(crate) const PASS_BLOCK_BINDING: u32 = 1;

/// Prefixes a transpiled fragment body with the fixed preamble.
///
/// The body's own `#version` line is dropped and a `#line 1` directive keeps
/// driver diagnostics pointing at the user's lines.
pub(crate) fn wrap_fragment(body: &str) -> String {
    let body = strip_version_directive(body);
    format!("{FRAGMENT_PREAMBLE}#line 1\n{body}")
}

/// GLSL prologue injected ahead of every pass fragment shader.
///
/// The block layout must match [`PassBlock`](crate::gpu::PassBlock). GLSL 330
/// has no `binding` layout qualifier, so the block is bound by name.
const FRAGMENT_PREAMBLE: &str = r"#version 330 core
in vec2 vTexCoord;
out vec4 FragColor;
#define COMPAT_VARYING in
#define COMPAT_ATTRIBUTE in
#define COMPAT_TEXTURE texture
#define TEX0 vTexCoord
#define gl_FragColor FragColor
uniform sampler2D Source;
uniform sampler2D Original;
layout(std140) uniform passchain_pass {
    vec4 pass_SourceSize;
    vec4 pass_OriginalSize;
    vec4 pass_OutputSize;
    vec4 pass_FinalViewportSize;
};
#define SourceSize pass_SourceSize
#define OriginalSize pass_OriginalSize
#define OutputSize pass_OutputSize
#define FinalViewportSize pass_FinalViewportSize
uniform int FrameCount;
uniform float FrameTime;
uniform float FrameDirection;
";

/// Full-screen quad drawn as a four-vertex triangle strip without buffers.
pub(crate) const VERTEX_SHADER: &str = r"#version 330 core
out vec2 vTexCoord;
const vec2 positions[4] = vec2[](vec2(-1.0, -1.0), vec2(1.0, -1.0), vec2(-1.0, 1.0), vec2(1.0, 1.0));
const vec2 coords[4] = vec2[](vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(0.0, 1.0), vec2(1.0, 1.0));
void main() {
    gl_Position = vec4(positions[gl_VertexID], 0.0, 1.0);
    vTexCoord = coords[gl_VertexID];
}
";
