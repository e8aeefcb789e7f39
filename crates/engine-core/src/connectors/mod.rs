//! Contracts every source, transform, sink and schema plugin implements.

pub mod schema;
pub mod sink;
pub mod source;
pub mod transform;

pub use schema::RecordSchema;
pub use sink::{Sink, SinkFactory, scoped_load};
pub use source::{Source, SourceFactory, scoped_extract};
pub use transform::{Transform, TransformFactory};
