pub mod engine;
pub mod pipeline;

pub use crate::domain::model::{BuildTarget, CompiledArtifact, InstallReport};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, Toolchain};
pub use crate::utils::error::Result;
