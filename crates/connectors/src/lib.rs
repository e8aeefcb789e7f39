pub mod config;
pub mod error;
pub mod file;
pub mod http;
pub mod schema;
pub mod sql;
pub mod transform;
