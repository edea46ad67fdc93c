//! Python snippet execution plus the light static tooling around it:
//! heuristic analysis, unittest scaffolding, profiling and integrity checks.

pub mod analysis;
pub mod exec;
pub mod integrity;
pub mod optimize;
pub mod profile;
pub mod results;
pub mod testgen;

mod source;

pub use analysis::{analyze, CodeAnalysis};
pub use exec::Executor;
pub use results::{parse_unittest_output, ExecutionResult, TestCaseResult};
