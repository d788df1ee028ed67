//! Blockmatch is an exhaustive block-matching engine scored by SSE.
//!
//! Given a reference block, a source image and a list of candidate offsets,
//! the kernel computes the sum of squared differences for every candidate
//! and reports which ones fall inside an acceptance threshold. Work runs in
//! work-groups that share a cached copy of the reference block, optionally in
//! parallel via the `rayon` feature and with `wide` SIMD via `simd`.
//!
//! ```
//! use blockmatch::{BlockMatcher, ComputeEnvironment, EnvConfig, ImageView, MatchConfig, Offset,
//!     ReferenceBlock};
//!
//! let env = ComputeEnvironment::acquire(EnvConfig::default())?;
//! let source = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
//! let image = ImageView::from_slice(&source, 8, 1)?;
//! let block = ReferenceBlock::new(vec![1.0, 2.0, 3.0, 4.0], 4, 1)?;
//! let matcher = BlockMatcher::new(&env).with_config(MatchConfig {
//!     th_sse: 100.0,
//!     dist_mul: 2.0,
//!     ..MatchConfig::default()
//! });
//! let results = matcher.match_block(&block, image, &[Offset::new(0, 0), Offset::new(4, 0)])?;
//! assert!(!results[0].is_accepted());
//! assert_eq!(results[1].distance, 128.0);
//! # Ok::<(), blockmatch::BlockMatchError>(())
//! ```

pub mod block;
pub mod candidate;
pub mod dispatch;
pub mod env;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod matcher;
mod trace;
pub mod util;

pub use block::{KernelParams, MatchResult, Offset, ReferenceBlock, REJECTED_DISTANCE};
pub use candidate::{best_matches, TopK};
pub use dispatch::BoundsPolicy;
pub use env::{ComputeEnvironment, EnvConfig};
pub use image::{ImageView, OwnedImage};
pub use kernel::VectorWidth;
pub use matcher::{BlockMatcher, MatchConfig};
pub use util::{BlockMatchError, BlockMatchResult, EnvStage};

#[cfg(feature = "image-io")]
pub use image::io;
