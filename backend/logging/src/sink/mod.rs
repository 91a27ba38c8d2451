//! Line destinations.

pub mod rotating;
pub mod stream;

pub use rotating::RotatingFileSink;
pub use stream::{MemorySink, StreamSink};
