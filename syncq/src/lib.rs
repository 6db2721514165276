//! A blocking FIFO queue for producer-consumer pipelines over OS threads.
//!
//! [`ConcurrentQueue`] guards a backing [`Storage`] with a single lock and
//! parks consumers on a condition variable until an element shows up.

mod queue;
pub use queue::ConcurrentQueue;

pub mod storage;
pub use storage::Storage;
