//! Compute environment: device, worker queue and the built matching program.
//!
//! The environment is an explicit handle. Callers acquire one, pass it to
//! every dispatch, and release it (or let it drop) when no dispatch is in
//! flight. Independent environments can coexist, which keeps tests isolated.

use crate::block::LOCAL_CACHE_CAPACITY;
use crate::kernel::workgroup::Launch;
use crate::kernel::VectorWidth;
use crate::trace::{trace_error, trace_event, trace_span};
use crate::util::{BlockMatchError, BlockMatchResult, EnvStage};
use std::sync::atomic::{AtomicU64, Ordering};

mod buffer;

pub use buffer::{BufferAccess, DeviceBuffer};

/// Name of the kernel entry point built into every program.
pub const KERNEL_NAME: &str = "block_matching_multi";

/// Largest work-group the host device supports.
pub const MAX_WORK_GROUP_SIZE: usize = 1024;

/// Local memory available to one work-group, in `f32` elements (64 KiB).
pub const MAX_LOCAL_CACHE_CAPACITY: usize = 16 * 1024;

static NEXT_ENV_ID: AtomicU64 = AtomicU64::new(1);

/// Configuration for acquiring a compute environment.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvConfig {
    /// Work items per work-group.
    pub work_group_size: usize,
    /// Worker threads; `None` uses every available core.
    pub threads: Option<usize>,
    /// Vector width of the inner accumulation loop.
    pub vector_width: VectorWidth,
    /// Capacity of the local reference cache, in elements.
    pub local_cache_capacity: usize,
    /// Run work-groups on a thread pool (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            work_group_size: 64,
            threads: None,
            vector_width: VectorWidth::X4,
            local_cache_capacity: LOCAL_CACHE_CAPACITY,
            parallel: true,
        }
    }
}

/// The built block-matching program and its compile-time constants.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    build_options: String,
    build_log: String,
    cache_capacity: usize,
    vector_width: VectorWidth,
}

impl Program {
    fn build(config: &EnvConfig) -> Result<Self, String> {
        let build_options = format!(
            "-D MAX_BLOCK_SIZE={} -D VECTOR_WIDTH={}",
            config.local_cache_capacity,
            config.vector_width.lanes()
        );
        let capacity = config.local_cache_capacity;
        if capacity == 0 || capacity > MAX_LOCAL_CACHE_CAPACITY {
            return Err(format!(
                "{build_options}\nerror: local cache of {capacity} elements must be in 1..={MAX_LOCAL_CACHE_CAPACITY}"
            ));
        }
        Ok(Self {
            build_log: format!("{build_options}\nbuild succeeded"),
            build_options,
            cache_capacity: capacity,
            vector_width: config.vector_width,
        })
    }

    /// Kernel entry point name.
    pub fn kernel_name(&self) -> &'static str {
        KERNEL_NAME
    }

    /// Options the program was built with.
    pub fn build_options(&self) -> &str {
        &self.build_options
    }

    /// Diagnostic text produced by the build.
    pub fn build_log(&self) -> &str {
        &self.build_log
    }

    /// Local reference cache capacity, in elements.
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    /// Vector width of the inner loop.
    pub fn vector_width(&self) -> VectorWidth {
        self.vector_width
    }
}

/// Caller-held handle to an acquired compute environment.
pub struct ComputeEnvironment {
    id: u64,
    device_name: String,
    compute_units: usize,
    config: EnvConfig,
    program: Program,
    #[cfg(feature = "rayon")]
    pool: Option<rayon::ThreadPool>,
    released: bool,
}

impl std::fmt::Debug for ComputeEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeEnvironment")
            .field("id", &self.id)
            .field("device_name", &self.device_name)
            .field("compute_units", &self.compute_units)
            .field("config", &self.config)
            .field("released", &self.released)
            .finish()
    }
}

fn stage_error(stage: EnvStage, reason: String) -> BlockMatchError {
    let stage_name = stage.to_string();
    trace_error!(
        "environment_acquire_failed",
        stage = stage_name.as_str(),
        reason = reason.as_str()
    );
    BlockMatchError::Environment { stage, reason }
}

impl ComputeEnvironment {
    /// Acquires a new environment: device, queue, program and kernel.
    ///
    /// Each stage failure is reported with the stage that failed; a program
    /// build failure carries the full build log.
    pub fn acquire(config: EnvConfig) -> BlockMatchResult<Self> {
        let _span = trace_span!(
            "acquire_environment",
            work_group_size = config.work_group_size,
            vector_width = config.vector_width.lanes()
        )
        .entered();

        let compute_units = match config.threads {
            Some(0) => {
                return Err(stage_error(
                    EnvStage::DeviceDiscovery,
                    "a device needs at least one compute unit".to_string(),
                ))
            }
            Some(threads) => threads,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };
        let device_name = format!("host cpu ({compute_units} compute units)");

        #[cfg(feature = "rayon")]
        let pool = if config.parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(compute_units)
                .thread_name(|idx| format!("blockmatch-{idx}"))
                .build()
                .map_err(|err| stage_error(EnvStage::Queue, err.to_string()))?;
            Some(pool)
        } else {
            None
        };

        let program = Program::build(&config)
            .map_err(|log| stage_error(EnvStage::ProgramBuild, log))?;

        if config.work_group_size == 0 || config.work_group_size > MAX_WORK_GROUP_SIZE {
            return Err(stage_error(
                EnvStage::KernelCreate,
                format!(
                    "{KERNEL_NAME}: work-group size {} must be in 1..={MAX_WORK_GROUP_SIZE}",
                    config.work_group_size
                ),
            ));
        }

        let id = NEXT_ENV_ID.fetch_add(1, Ordering::Relaxed);
        trace_event!(
            "environment_acquired",
            device = device_name.as_str(),
            compute_units = compute_units
        );

        Ok(Self {
            id,
            device_name,
            compute_units,
            config,
            program,
            #[cfg(feature = "rayon")]
            pool,
            released: false,
        })
    }

    /// Releases the worker queue and program. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        #[cfg(feature = "rayon")]
        {
            self.pool = None;
        }
        self.released = true;
        trace_event!("environment_released", id = self.id);
    }

    /// Returns true once [`release`](Self::release) has run.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Human-readable device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Number of compute units (worker threads) of the device.
    pub fn compute_units(&self) -> usize {
        self.compute_units
    }

    /// Configuration the environment was acquired with.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// The built block-matching program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Stages a caller-owned buffer into device-visible memory.
    pub fn upload<T: Copy>(&self, data: &[T]) -> BlockMatchResult<DeviceBuffer<T>> {
        self.ensure_live()?;
        Ok(DeviceBuffer::new(self.id, data.to_vec(), BufferAccess::ReadOnly))
    }

    /// Allocates a default-initialized output buffer of `len` elements.
    pub fn create_output<T: Copy + Default>(&self, len: usize) -> BlockMatchResult<DeviceBuffer<T>> {
        self.ensure_live()?;
        Ok(DeviceBuffer::new(
            self.id,
            vec![T::default(); len],
            BufferAccess::WriteOnly,
        ))
    }

    /// Reads a device buffer back into a new vector.
    pub fn download<T: Copy>(&self, buffer: &DeviceBuffer<T>) -> BlockMatchResult<Vec<T>> {
        self.check_buffer(buffer)?;
        Ok(buffer.as_slice().to_vec())
    }

    /// Reads a device buffer back into caller-owned memory of equal length.
    pub fn download_into<T: Copy>(
        &self,
        buffer: &DeviceBuffer<T>,
        dst: &mut [T],
    ) -> BlockMatchResult<()> {
        self.check_buffer(buffer)?;
        if dst.len() != buffer.len() {
            return Err(BlockMatchError::LengthMismatch {
                context: "download destination",
                expected: buffer.len(),
                got: dst.len(),
            });
        }
        dst.copy_from_slice(buffer.as_slice());
        Ok(())
    }

    fn ensure_live(&self) -> BlockMatchResult<()> {
        if self.released {
            return Err(BlockMatchError::EnvironmentReleased);
        }
        Ok(())
    }

    /// Checks the environment is live and owns `buffer`.
    pub(crate) fn check_buffer<T>(&self, buffer: &DeviceBuffer<T>) -> BlockMatchResult<()> {
        self.ensure_live()?;
        if buffer.env_id() != self.id {
            return Err(BlockMatchError::ForeignBuffer);
        }
        Ok(())
    }

    /// Work-group schedule for a dispatch on this environment.
    pub(crate) fn launch(&self) -> Launch<'_> {
        Launch {
            local_size: self.config.work_group_size,
            cache_capacity: self.program.cache_capacity,
            width: self.program.vector_width,
            #[cfg(feature = "rayon")]
            pool: self.pool.as_ref(),
            #[cfg(not(feature = "rayon"))]
            _pool: std::marker::PhantomData,
        }
    }
}

impl Drop for ComputeEnvironment {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::{ComputeEnvironment, EnvConfig, KERNEL_NAME};
    use crate::util::{BlockMatchError, EnvStage};

    #[test]
    fn program_records_build_options() {
        let env = ComputeEnvironment::acquire(EnvConfig::default()).unwrap();
        let program = env.program();
        assert_eq!(program.kernel_name(), KERNEL_NAME);
        assert_eq!(program.build_options(), "-D MAX_BLOCK_SIZE=256 -D VECTOR_WIDTH=4");
        assert!(program.build_log().starts_with(program.build_options()));
    }

    #[test]
    fn oversized_cache_fails_program_build() {
        let err = ComputeEnvironment::acquire(EnvConfig {
            local_cache_capacity: 1 << 20,
            ..EnvConfig::default()
        })
        .unwrap_err();
        match err {
            BlockMatchError::Environment { stage, reason } => {
                assert_eq!(stage, EnvStage::ProgramBuild);
                assert!(reason.contains("MAX_BLOCK_SIZE=1048576"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
