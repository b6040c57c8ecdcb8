pub mod varint;

pub use frame::{Frame, FrameCodec};
pub use framer::Framer;

mod frame;
mod framer;

#[cfg(test)]
mod test;
