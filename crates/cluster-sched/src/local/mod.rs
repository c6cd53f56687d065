//! Local execution on a worker pool.
//!
//! Jobs run as `bash <script>` on a fixed-size pool of tokio tasks. There is
//! no scheduler to hand dependencies to, so a local job waits for its
//! dependencies inside `submit` before it is queued.

mod adapter;
mod pool;
mod templates;

pub use adapter::LocalBackend;
pub use pool::{PendingResult, WorkerPool, default_pool_size};
