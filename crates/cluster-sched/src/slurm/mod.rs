//! SLURM integration for job submission.
//!
//! Jobs are split into a `.sbatch` file holding only directives and a
//! `.script` file holding the payload. Some sites run the batch script on
//! every allocated node, so the payload is launched exactly once through
//! `srun`.

mod adapter;
mod parser;
mod queue;
mod templates;

pub use adapter::{SlurmBackend, dependency_args};
pub use parser::parse_sbatch_output;
pub use queue::SlurmQueue;
