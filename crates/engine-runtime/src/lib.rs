pub mod bootstrap;
pub mod config;
pub mod error;
pub mod execution;

pub use bootstrap::builtin_registry;
pub use config::load_config;
pub use execution::{engine::PipelineEngine, summary::RunSummary};
