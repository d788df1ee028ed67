//! Argument binding and launch of the block-matching kernel.
//!
//! Arguments are bound by position, in the kernel's parameter order:
//!
//! | index | argument            | kind                     |
//! |-------|---------------------|--------------------------|
//! | 0     | reference block     | read-only `f32` buffer   |
//! | 1     | source image        | read-only `f32` buffer   |
//! | 2     | candidate offsets   | read-only offset buffer  |
//! | 3     | `block_width`       | int                      |
//! | 4     | `block_height`      | int                      |
//! | 5     | `src_stride`        | int                      |
//! | 6     | `src_range`         | int                      |
//! | 7     | `thSSE`             | float                    |
//! | 8     | `distMul`           | float                    |
//! | 9     | output distances    | write-only `f32` buffer  |
//! | 10    | output positions    | write-only offset buffer |
//!
//! [`KernelArgs::enqueue`] runs one work item per candidate and returns only
//! after every output element has been written. If it returns an error, the
//! output buffers are untouched.

use crate::block::{KernelParams, Offset, ReferenceBlock, REJECTED_DISTANCE};
use crate::env::{BufferAccess, ComputeEnvironment, DeviceBuffer};
use crate::kernel::workgroup::{self, KernelInputs};
use crate::trace::{trace_event, trace_span};
use crate::util::{BlockMatchError, BlockMatchResult};

/// Number of kernel parameters.
pub const NUM_ARGS: usize = 11;

pub const ARG_REF_BLOCK: usize = 0;
pub const ARG_SRC_IMAGE: usize = 1;
pub const ARG_SEARCH_POS: usize = 2;
pub const ARG_BLOCK_WIDTH: usize = 3;
pub const ARG_BLOCK_HEIGHT: usize = 4;
pub const ARG_SRC_STRIDE: usize = 5;
pub const ARG_SRC_RANGE: usize = 6;
pub const ARG_TH_SSE: usize = 7;
pub const ARG_DIST_MUL: usize = 8;
pub const ARG_OUTPUT: usize = 9;
pub const ARG_OUTPUT_POS: usize = 10;

/// What happens to candidates whose window leaves the source image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Fail the dispatch with [`BlockMatchError::CandidateOutOfBounds`].
    #[default]
    Reject,
    /// Report such candidates as rejected (sentinel distance).
    MarkRejected,
}

/// A value bound to one kernel parameter.
#[derive(Debug)]
pub enum KernelArg<'a> {
    /// Read-only `f32` buffer.
    Buffer(&'a DeviceBuffer<f32>),
    /// Read-only offset buffer.
    Offsets(&'a DeviceBuffer<Offset>),
    /// 32-bit signed integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
    /// Write-only `f32` buffer.
    OutBuffer(&'a mut DeviceBuffer<f32>),
    /// Write-only offset buffer.
    OutOffsets(&'a mut DeviceBuffer<Offset>),
}

/// Positional argument list for one dispatch.
#[derive(Debug, Default)]
pub struct KernelArgs<'a> {
    ref_block: Option<&'a DeviceBuffer<f32>>,
    src_image: Option<&'a DeviceBuffer<f32>>,
    search_pos: Option<&'a DeviceBuffer<Offset>>,
    ints: [Option<i32>; 4],
    floats: [Option<f32>; 2],
    output: Option<&'a mut DeviceBuffer<f32>>,
    output_pos: Option<&'a mut DeviceBuffer<Offset>>,
}

fn expect_access<T>(
    index: usize,
    buffer: &DeviceBuffer<T>,
    access: BufferAccess,
    expected: &'static str,
) -> BlockMatchResult<()> {
    if buffer.access() != access {
        return Err(BlockMatchError::ArgumentType { index, expected });
    }
    Ok(())
}

fn to_int(value: usize, name: &'static str) -> BlockMatchResult<i32> {
    i32::try_from(value).map_err(|_| BlockMatchError::InvalidParameter(name))
}

fn to_usize(value: i32, name: &'static str) -> BlockMatchResult<usize> {
    usize::try_from(value).map_err(|_| BlockMatchError::InvalidParameter(name))
}

impl<'a> KernelArgs<'a> {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every argument in order from typed inputs.
    pub fn bind_all(
        reference: &'a DeviceBuffer<f32>,
        source: &'a DeviceBuffer<f32>,
        candidates: &'a DeviceBuffer<Offset>,
        params: &KernelParams,
        distances: &'a mut DeviceBuffer<f32>,
        positions: &'a mut DeviceBuffer<Offset>,
    ) -> BlockMatchResult<Self> {
        let mut args = Self::new();
        args.set_arg(ARG_REF_BLOCK, KernelArg::Buffer(reference))?;
        args.set_arg(ARG_SRC_IMAGE, KernelArg::Buffer(source))?;
        args.set_arg(ARG_SEARCH_POS, KernelArg::Offsets(candidates))?;
        args.set_arg(
            ARG_BLOCK_WIDTH,
            KernelArg::Int(to_int(params.block_width, "block_width exceeds i32")?),
        )?;
        args.set_arg(
            ARG_BLOCK_HEIGHT,
            KernelArg::Int(to_int(params.block_height, "block_height exceeds i32")?),
        )?;
        args.set_arg(
            ARG_SRC_STRIDE,
            KernelArg::Int(to_int(params.src_stride, "src_stride exceeds i32")?),
        )?;
        args.set_arg(
            ARG_SRC_RANGE,
            KernelArg::Int(to_int(params.src_range, "src_range exceeds i32")?),
        )?;
        args.set_arg(ARG_TH_SSE, KernelArg::Float(params.th_sse))?;
        args.set_arg(ARG_DIST_MUL, KernelArg::Float(params.dist_mul))?;
        args.set_arg(ARG_OUTPUT, KernelArg::OutBuffer(distances))?;
        args.set_arg(ARG_OUTPUT_POS, KernelArg::OutOffsets(positions))?;
        Ok(args)
    }

    /// Binds `arg` to parameter `index`, replacing any earlier binding.
    pub fn set_arg(&mut self, index: usize, arg: KernelArg<'a>) -> BlockMatchResult<()> {
        match (index, arg) {
            (ARG_REF_BLOCK | ARG_SRC_IMAGE, KernelArg::Buffer(buffer)) => {
                expect_access(index, buffer, BufferAccess::ReadOnly, "a read-only f32 buffer")?;
                if index == ARG_REF_BLOCK {
                    self.ref_block = Some(buffer);
                } else {
                    self.src_image = Some(buffer);
                }
            }
            (ARG_REF_BLOCK | ARG_SRC_IMAGE, _) => {
                return Err(BlockMatchError::ArgumentType {
                    index,
                    expected: "a read-only f32 buffer",
                })
            }
            (ARG_SEARCH_POS, KernelArg::Offsets(buffer)) => {
                expect_access(index, buffer, BufferAccess::ReadOnly, "a read-only offset buffer")?;
                self.search_pos = Some(buffer);
            }
            (ARG_SEARCH_POS, _) => {
                return Err(BlockMatchError::ArgumentType {
                    index,
                    expected: "a read-only offset buffer",
                })
            }
            (ARG_BLOCK_WIDTH..=ARG_SRC_RANGE, KernelArg::Int(value)) => {
                self.ints[index - ARG_BLOCK_WIDTH] = Some(value);
            }
            (ARG_BLOCK_WIDTH..=ARG_SRC_RANGE, _) => {
                return Err(BlockMatchError::ArgumentType {
                    index,
                    expected: "an int",
                })
            }
            (ARG_TH_SSE | ARG_DIST_MUL, KernelArg::Float(value)) => {
                self.floats[index - ARG_TH_SSE] = Some(value);
            }
            (ARG_TH_SSE | ARG_DIST_MUL, _) => {
                return Err(BlockMatchError::ArgumentType {
                    index,
                    expected: "a float",
                })
            }
            (ARG_OUTPUT, KernelArg::OutBuffer(buffer)) => {
                expect_access(index, buffer, BufferAccess::WriteOnly, "a write-only f32 buffer")?;
                self.output = Some(buffer);
            }
            (ARG_OUTPUT, _) => {
                return Err(BlockMatchError::ArgumentType {
                    index,
                    expected: "a write-only f32 buffer",
                })
            }
            (ARG_OUTPUT_POS, KernelArg::OutOffsets(buffer)) => {
                expect_access(
                    index,
                    buffer,
                    BufferAccess::WriteOnly,
                    "a write-only offset buffer",
                )?;
                self.output_pos = Some(buffer);
            }
            (ARG_OUTPUT_POS, _) => {
                return Err(BlockMatchError::ArgumentType {
                    index,
                    expected: "a write-only offset buffer",
                })
            }
            _ => return Err(BlockMatchError::ArgumentIndex { index }),
        }
        Ok(())
    }

    fn first_unbound(&self) -> Option<usize> {
        let bound = [
            self.ref_block.is_some(),
            self.src_image.is_some(),
            self.search_pos.is_some(),
            self.ints[0].is_some(),
            self.ints[1].is_some(),
            self.ints[2].is_some(),
            self.ints[3].is_some(),
            self.floats[0].is_some(),
            self.floats[1].is_some(),
            self.output.is_some(),
            self.output_pos.is_some(),
        ];
        bound.iter().position(|&is_bound| !is_bound)
    }

    /// Launches `global_size` work items and blocks until they complete.
    ///
    /// `global_size` must equal the number of candidates and the length of
    /// both output buffers.
    pub fn enqueue(
        self,
        env: &ComputeEnvironment,
        global_size: usize,
        bounds: BoundsPolicy,
    ) -> BlockMatchResult<()> {
        if let Some(index) = self.first_unbound() {
            return Err(BlockMatchError::UnboundArgument { index });
        }
        let (Some(ref_block), Some(src_image), Some(search_pos), Some(output), Some(output_pos)) = (
            self.ref_block,
            self.src_image,
            self.search_pos,
            self.output,
            self.output_pos,
        ) else {
            return Err(BlockMatchError::UnboundArgument { index: 0 });
        };
        let [Some(block_width), Some(block_height), Some(src_stride), Some(src_range)] = self.ints
        else {
            return Err(BlockMatchError::UnboundArgument {
                index: ARG_BLOCK_WIDTH,
            });
        };
        let [Some(th_sse), Some(dist_mul)] = self.floats else {
            return Err(BlockMatchError::UnboundArgument { index: ARG_TH_SSE });
        };

        env.check_buffer(ref_block)?;
        env.check_buffer(src_image)?;
        env.check_buffer(search_pos)?;
        env.check_buffer(output)?;
        env.check_buffer(output_pos)?;

        let params = KernelParams {
            block_width: to_usize(block_width, "block_width must be non-negative")?,
            block_height: to_usize(block_height, "block_height must be non-negative")?,
            src_stride: to_usize(src_stride, "src_stride must be non-negative")?,
            src_range: to_usize(src_range, "src_range must be non-negative")?,
            th_sse,
            dist_mul,
        };
        params.validate(env.program().cache_capacity())?;

        check_len("candidate offsets", global_size, search_pos.len())?;
        check_len("output distances", global_size, output.len())?;
        check_len("output positions", global_size, output_pos.len())?;
        if ref_block.len() < params.block_len() {
            return Err(BlockMatchError::BufferTooSmall {
                needed: params.block_len(),
                got: ref_block.len(),
            });
        }
        if src_image.len() < params.src_range {
            return Err(BlockMatchError::BufferTooSmall {
                needed: params.src_range,
                got: src_image.len(),
            });
        }

        let candidates = search_pos.as_slice();
        if bounds == BoundsPolicy::Reject {
            if let Some((index, pos)) = candidates
                .iter()
                .enumerate()
                .find(|(_, &pos)| params.window_origin(pos).is_none())
            {
                return Err(BlockMatchError::CandidateOutOfBounds {
                    index,
                    x: pos.x,
                    y: pos.y,
                });
            }
        }

        let launch = env.launch();
        let _span = trace_span!(
            "dispatch",
            global_size = global_size,
            local_size = launch.local_size,
            block_len = params.block_len()
        )
        .entered();

        let inputs = KernelInputs {
            reference: ref_block.as_slice(),
            source: src_image.as_slice(),
            candidates,
            params,
        };
        let distances = output.as_mut_slice();
        workgroup::execute(&launch, &inputs, distances, output_pos.as_mut_slice());

        trace_event!(
            "dispatch_complete",
            accepted = distances.iter().filter(|&&d| d != REJECTED_DISTANCE).count()
        );
        Ok(())
    }
}

fn check_len(context: &'static str, expected: usize, got: usize) -> BlockMatchResult<()> {
    if expected != got {
        return Err(BlockMatchError::LengthMismatch {
            context,
            expected,
            got,
        });
    }
    Ok(())
}

/// Device buffers for one reference block dispatch.
pub struct DispatchBuffers {
    /// Reference block pixels.
    pub reference: DeviceBuffer<f32>,
    /// Source image pixels.
    pub source: DeviceBuffer<f32>,
    /// Candidate offsets.
    pub candidates: DeviceBuffer<Offset>,
    /// Output distances, one per candidate.
    pub distances: DeviceBuffer<f32>,
    /// Output positions, one per candidate.
    pub positions: DeviceBuffer<Offset>,
}

impl DispatchBuffers {
    /// Uploads the inputs and allocates outputs sized to `candidates`.
    pub fn stage(
        env: &ComputeEnvironment,
        block: &ReferenceBlock,
        source: &[f32],
        candidates: &[Offset],
    ) -> BlockMatchResult<Self> {
        Ok(Self {
            reference: env.upload(block.data())?,
            source: env.upload(source)?,
            candidates: env.upload(candidates)?,
            distances: env.create_output(candidates.len())?,
            positions: env.create_output(candidates.len())?,
        })
    }

    /// Binds these buffers with `params` and runs the dispatch.
    pub fn enqueue(
        &mut self,
        env: &ComputeEnvironment,
        params: &KernelParams,
        bounds: BoundsPolicy,
    ) -> BlockMatchResult<()> {
        let global_size = self.candidates.len();
        KernelArgs::bind_all(
            &self.reference,
            &self.source,
            &self.candidates,
            params,
            &mut self.distances,
            &mut self.positions,
        )?
        .enqueue(env, global_size, bounds)
    }
}
