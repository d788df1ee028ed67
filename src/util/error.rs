//! Error types for blockmatch.

use std::fmt;
use thiserror::Error;

/// Result alias for blockmatch operations.
pub type BlockMatchResult<T> = std::result::Result<T, BlockMatchError>;

/// Stage of compute environment acquisition that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvStage {
    /// Selecting a device to run on.
    DeviceDiscovery,
    /// Creating the command queue (worker pool).
    Queue,
    /// Building the block-matching program.
    ProgramBuild,
    /// Creating the kernel entry point from the built program.
    KernelCreate,
}

impl fmt::Display for EnvStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnvStage::DeviceDiscovery => "device discovery",
            EnvStage::Queue => "command queue creation",
            EnvStage::ProgramBuild => "program build",
            EnvStage::KernelCreate => "kernel creation",
        };
        f.write_str(name)
    }
}

/// Errors that can occur when preparing or dispatching block matching.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BlockMatchError {
    /// Image or block dimensions are zero or overflow.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the layout requires.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A window does not fit inside its image.
    #[error("window ({x}, {y}, {width}x{height}) out of bounds for {img_width}x{img_height} image")]
    WindowOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The reference block does not fit in the work-group local cache.
    #[error("block of {elements} elements exceeds local cache capacity {capacity}")]
    BlockTooLarge { elements: usize, capacity: usize },
    /// A scalar kernel parameter is out of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    /// A candidate window reaches outside the source image.
    #[error("candidate {index} at ({x}, {y}) reads outside the source image")]
    CandidateOutOfBounds { index: usize, x: i32, y: i32 },
    /// Two sequences that must correspond 1:1 have different lengths.
    #[error("length mismatch for {context}: expected {expected}, got {got}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    /// A kernel argument was not bound before launch.
    #[error("kernel argument {index} is not bound")]
    UnboundArgument { index: usize },
    /// A kernel argument was bound with the wrong kind of value.
    #[error("kernel argument {index} expects {expected}")]
    ArgumentType { index: usize, expected: &'static str },
    /// The kernel has no argument at this index.
    #[error("kernel has no argument at index {index}")]
    ArgumentIndex { index: usize },
    /// A buffer was created by a different compute environment.
    #[error("buffer belongs to a different compute environment")]
    ForeignBuffer,
    /// The compute environment was already released.
    #[error("compute environment has been released")]
    EnvironmentReleased,
    /// Acquiring the compute environment failed.
    #[error("compute environment {stage} failed: {reason}")]
    Environment { stage: EnvStage, reason: String },
    /// Image decoding or loading failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
}
