use bytes::BytesMut;
use log::trace;
use tokio_util::codec::Decoder;
use crate::error::Result;
use super::{Frame, FrameCodec};

#[derive(Debug)]
pub struct Framer {
    codec:   FrameCodec,
    pending: BytesMut,
}

impl Framer {
    pub fn new(codec: FrameCodec) -> Self {
        Self {
            codec:   codec,
            pending: BytesMut::new(),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Frame>> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = self.codec.decode(&mut self.pending)? {
            trace!("frame of {} bytes, {} pending", frame.data.len(), self.pending.len());
            frames.push(frame);
        }

        Ok(frames)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
