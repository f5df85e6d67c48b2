//! Compute inventory seam: list and delete scale set instances.

mod memory;
mod traits;

pub use memory::{DeletionRecord, InMemoryCompute};
pub use traits::{ComputeProvider, ComputeResult, NetworkInterface, ScaleSetInstance};
