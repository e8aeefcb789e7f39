pub mod errors;
pub mod pipeline;
pub mod step;
