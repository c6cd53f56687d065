//! Torque / PBS integration for job submission.
//!
//! Torque runs the submission script exactly once, so directives and the
//! payload share one `.qsub` file.

mod adapter;
mod parser;
mod queue;
mod templates;

pub use adapter::{TorqueBackend, dependency_args};
pub use parser::parse_qsub_output;
pub use queue::TorqueQueue;
