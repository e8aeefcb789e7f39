pub mod core;
pub mod execution;
pub mod records;
pub mod state;
