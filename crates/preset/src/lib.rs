//! Multi-pass shader preset parsing.
//!
//! A preset is a line-oriented `key=value` file describing an ordered chain
//! of shader passes:
//!
//! ```text
//! shaders = 2
//! shader0 = "blur.slang"
//! scale_type0 = source
//! scale0 = 0.5
//! shader1 = crt.slang
//! filter_linear1 = false
//! textures = "noise;lut"
//! noise = textures/noise.png
//! lut = textures/lut.png
//! ```
//!
//! [`Preset`] keeps the raw table in file order, and [`PresetPlan`] turns it
//! into typed pass and texture declarations with paths resolved against the
//! preset's directory. Planning happens before any GPU work so configuration
//! mistakes fail fast with the offending key.

mod plan;
mod table;

use std::path::PathBuf;

pub use plan::{FilterMode, PassSpec, PresetPlan, ScalePolicy, ScaleType, TextureSpec};
pub use table::Preset;

/// Upper bound on the number of passes a preset may declare.
pub const MAX_PASSES: usize = 32;

/// Upper bound on the number of named side-input textures.
pub const MAX_TEXTURES: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("failed to read preset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("preset is missing the required 'shaders' key")]
    MissingPassCount,
    #[error("invalid preset 'shaders' count '{0}'; expected a positive integer")]
    InvalidPassCount(String),
    #[error("preset declares {count} passes; at most {max} are supported")]
    TooManyPasses { count: usize, max: usize },
    #[error("preset is missing '{0}'")]
    MissingKey(String),
    #[error("preset declares more than {max} named textures")]
    TooManyTextures { max: usize },
}
