//! Scan-to-map matching.
//!
//! - [`solver`]: damped Gauss-Newton refinement of a single pose
//! - [`search`]: best-of-N refinement around a prior with Gaussian restarts

pub mod search;
pub mod solver;
mod types;

pub use search::{HypothesisSearch, SearchConfig};
pub use solver::{residual_norm, PoseSolver, SolverConfig};
pub use types::{Hypothesis, ScanPoint, SearchOutcome};
