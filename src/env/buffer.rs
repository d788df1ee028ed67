//! Device-visible buffers owned by a compute environment.

/// How the kernel may access a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferAccess {
    /// Input staged from the host.
    ReadOnly,
    /// Output written by the kernel.
    WriteOnly,
}

/// A buffer in device-visible memory, tagged with the environment that
/// created it.
#[derive(Debug)]
pub struct DeviceBuffer<T> {
    env_id: u64,
    data: Vec<T>,
    access: BufferAccess,
}

impl<T> DeviceBuffer<T> {
    pub(crate) fn new(env_id: u64, data: Vec<T>, access: BufferAccess) -> Self {
        Self {
            env_id,
            data,
            access,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Access mode the buffer was created with.
    pub fn access(&self) -> BufferAccess {
        self.access
    }

    pub(crate) fn env_id(&self) -> u64 {
        self.env_id
    }

    pub(crate) fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
