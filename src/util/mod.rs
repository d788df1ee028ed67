//! Shared utility helpers.

pub mod error;

pub use error::{BlockMatchError, BlockMatchResult, EnvStage};
