pub mod job;
pub mod pool;
pub mod runner;

pub use job::{AnalysisJob, JobResult};
pub use pool::WorkerPool;
pub use runner::AnalysisRunner;
