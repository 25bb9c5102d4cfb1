use std::fmt;
use std::path::PathBuf;

use preset::PresetError;

/// Shader stage a compile diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failure reported by the backend while building a program.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program failed to link:\n{log}")]
    Link { log: String },
    #[error("failed to create shader object: {0}")]
    Create(String),
}

/// A GPU object could not be allocated.
#[derive(Debug, thiserror::Error)]
#[error("failed to create {kind}: {message}")]
pub struct ResourceError {
    pub kind: &'static str,
    pub message: String,
}

impl ResourceError {
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Why a pipeline load failed. The previously active pipeline is untouched.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Preset(#[from] PresetError),
    #[error("pass {index}: failed to read shader {}: {source}", path.display())]
    ShaderRead {
        index: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pass {index}: shader {} failed to build: {source}", path.display())]
    Shader {
        index: usize,
        path: PathBuf,
        #[source]
        source: ShaderError,
    },
}
