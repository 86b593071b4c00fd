use std::{fmt, mem};

use ndarray::Array2;

/// The compute placement of a trainer.
///
/// Tensors are placed on a device before being used. The device keeps track of the bytes
/// currently placed on it (`allocated`) and of the most it ever held (`reserved`), the way a
/// caching allocator keeps freed blocks around for reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    name: String,
    allocated: usize,
    reserved: usize,
}

impl Device {
    /// The host processor.
    pub fn cpu() -> Self {
        Self::named("cpu")
    }

    /// A device identified by `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allocated: 0,
            reserved: 0,
        }
    }

    /// Places a tensor on this device.
    ///
    /// # Returns
    /// The placed tensor, accounted for until it is `release`d.
    pub fn place(&mut self, tensor: Array2<f32>) -> Array2<f32> {
        self.alloc(bytes_of(tensor.len()));
        tensor
    }

    /// Accounts for a model's parameters and gradient living on this device.
    pub fn place_model(&mut self, size: usize) {
        self.alloc(2 * bytes_of(size));
    }

    /// Stops accounting for a tensor previously placed on this device.
    pub fn release(&mut self, tensor: &Array2<f32>) {
        self.allocated = self.allocated.saturating_sub(bytes_of(tensor.len()));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes currently in use.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Bytes held by the device, in use or not.
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Bytes reserved by the device but not currently in use.
    pub fn memory_remaining(&self) -> usize {
        self.reserved - self.allocated
    }

    fn alloc(&mut self, bytes: usize) {
        self.allocated += bytes;
        self.reserved = self.reserved.max(self.allocated);
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::cpu()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn bytes_of(len: usize) -> usize {
    len * mem::size_of::<f32>()
}
