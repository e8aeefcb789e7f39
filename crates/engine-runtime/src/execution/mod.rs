pub mod cursor;
pub mod engine;
pub mod summary;
