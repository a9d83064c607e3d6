//! Kernel variant model for fused multi-head attention code generation.
//!
//! A variant is one specialization of the attention kernel template. This
//! crate enumerates them from [`config::GeneratorTables`], orders them by
//! dispatch priority and renders each entry point's CUDA source.

pub mod backward;
pub mod config;
pub mod error;
pub mod forward;
pub mod registry;
pub mod render;
pub mod variant;

pub use backward::*;
pub use config::*;
pub use error::GenerateError;
pub use forward::*;
pub use registry::*;
pub use render::*;
pub use variant::*;
