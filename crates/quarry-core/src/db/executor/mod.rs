//! Query execution: iterator trees, planning and page assembly.

pub(crate) mod iter;
mod load;
mod plan;

pub use iter::{Batch, IterState, ResultIterator, ResultNode, ScanColumn};
pub use load::LoadExecutor;
