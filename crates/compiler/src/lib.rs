//! Grouping, emission and artifact writing for fused attention kernels.

#[cfg(feature = "cli")]
pub mod cli;
pub mod emit;
pub mod grouping;
pub mod pipeline;
pub mod session;

#[cfg(feature = "cli")]
pub use cli::*;
pub use emit::*;
pub use grouping::*;
pub use pipeline::*;
pub use session::*;
