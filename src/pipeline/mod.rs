//! Pipeline orchestration.
//!
//! Each group goes through the same sequence: check out the chart and the
//! values sources, render, then preview or commit against the output target.

mod orchestrator;
mod result;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::Pipeline;
pub use result::{COMMITTED_MESSAGE, PipelineMode, PipelineResult, UNCHANGED_MESSAGE};
