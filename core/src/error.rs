//! Scene-loading and configuration error type.
//!
//! Grounded on SPEC_FULL.md §FULL-4.11 and the teacher's use of `thiserror`
//! for leaf error enums (see `kernels`/`shared_structs` crates, which derive
//! `thiserror::Error` for their GPU-facing error types).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("scene file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to parse scene description: {0}")]
    Parse(String),

    #[error("material reference {0} has no corresponding material")]
    InvalidMaterialRef(usize),

    #[error("invalid environment map configuration: {0}")]
    InvalidEnvironmentMap(String),
}
