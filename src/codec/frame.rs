use std::convert::TryFrom;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use crate::error::{Error, Result};
use crate::proto::{Identifier, Reader};
use super::varint;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub data:  Bytes,
    pub extra: usize,
}

impl Frame {
    pub fn new(data: Bytes, extra: usize) -> Self {
        Self { data, extra }
    }

    pub fn fingerprint(&self) -> Option<u8> {
        match self.extra {
            0 => None,
            _ => self.data.first().copied(),
        }
    }

    pub fn body(&self) -> Bytes {
        match self.data.len() >= self.extra {
            true  => self.data.slice(self.extra..),
            false => Bytes::new(),
        }
    }

    pub fn identifier(&self) -> Option<Identifier> {
        let body = self.body();
        match body.len() {
            0 | 1 => None,
            _     => Some(Identifier::from(u16::from_be_bytes([body[0], body[1]]))),
        }
    }

    pub fn reader(&self) -> Reader<Bytes> {
        Reader::new(self.body())
    }
}

#[derive(Clone, Debug)]
pub struct FrameCodec {
    extra:    usize,
    max:      usize,
    expected: Option<usize>,
}

impl FrameCodec {
    pub fn new(extra: usize, max: usize) -> Self {
        Self {
            extra:    extra,
            max:      max,
            expected: None,
        }
    }

    pub fn inbound(max: usize) -> Self {
        Self::new(0, max)
    }

    pub fn outbound(max: usize) -> Self {
        Self::new(1, max)
    }

    pub fn extra(&self) -> usize {
        self.extra
    }

    fn prefix(&mut self, src: &mut BytesMut) -> Result<Option<usize>> {
        if let Some(n) = self.expected {
            return Ok(Some(n));
        }

        let (value, n) = match varint::decode(src)? {
            Some(prefix) => prefix,
            None         => return Ok(None),
        };

        let len = usize::try_from(value).unwrap_or(usize::MAX).saturating_add(self.extra);
        if len > self.max {
            return Err(Error::Oversize(len, self.max));
        }

        src.advance(n);
        self.expected = Some(len);

        Ok(Some(len))
    }
}

impl Decoder for FrameCodec {
    type Item  = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let len = match self.prefix(src)? {
            Some(len) => len,
            None      => return Ok(None),
        };

        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        self.expected = None;

        Ok(Some(Frame::new(src.split_to(len).freeze(), self.extra)))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, data: Bytes, dst: &mut BytesMut) -> Result<()> {
        if data.len() < self.extra {
            return Err(Error::Short(self.extra - data.len()));
        } else if data.len() > self.max {
            return Err(Error::Oversize(data.len(), self.max));
        }

        let len = u32::try_from(data.len() - self.extra).map_err(|_| {
            Error::Oversize(data.len(), self.max)
        })?;

        dst.reserve(varint::MAX_LEN + data.len());
        varint::encode(len, dst);
        dst.put(data);

        Ok(())
    }
}
