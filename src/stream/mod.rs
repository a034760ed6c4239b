//! Stream buffers

pub mod buffer;

pub use buffer::ByteBuffer;
