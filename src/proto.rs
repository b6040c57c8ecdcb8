use std::fmt;
use bytes::Buf;
use crate::codec::Frame;
use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Identifier(pub u8, pub u8);

pub const HANDSHAKE: Identifier = Identifier(28, 1);
pub const BULLE:     Identifier = Identifier(44, 1);

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Tuple {
    pub timestamp: u32,
    pub player:    u32,
    pub process:   u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Announce {
    pub tuple: Tuple,
    pub host:  String,
    pub ports: String,
}

impl Identifier {
    pub fn code(self) -> u16 {
        (self.0 as u16) << 8 | self.1 as u16
    }
}

impl From<u16> for Identifier {
    fn from(code: u16) -> Self {
        Identifier((code >> 8) as u8, code as u8)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

pub struct Reader<B> {
    buf: B,
}

impl<B: Buf> Reader<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn identifier(&mut self) -> Result<Identifier> {
        self.u16().map(Identifier::from)
    }

    pub fn utf(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        self.need(len)?;
        let mut raw = vec![0u8; len];
        self.buf.copy_to_slice(&mut raw);
        String::from_utf8(raw).map_err(|_| Error::Utf8)
    }

    pub fn tuple(&mut self) -> Result<Tuple> {
        Ok(Tuple {
            timestamp: self.u32()?,
            player:    self.u32()?,
            process:   self.u32()?,
        })
    }

    fn need(&self, n: usize) -> Result<()> {
        match self.buf.remaining() {
            have if have >= n => Ok(()),
            have              => Err(Error::Short(n - have)),
        }
    }
}

pub fn is_handshake(frame: &Frame) -> bool {
    frame.identifier() == Some(HANDSHAKE)
}

pub fn announce(frame: &Frame) -> Result<Option<Announce>> {
    let mut r = frame.reader();
    if r.identifier().ok() != Some(BULLE) {
        return Ok(None);
    }

    let tuple = r.tuple()?;
    let host  = r.utf()?;
    let ports = r.utf()?;

    Ok(Some(Announce { tuple, host, ports }))
}

pub fn bulle_tuple(frame: &Frame) -> Option<Tuple> {
    let mut r = frame.reader();
    match r.identifier() {
        Ok(BULLE) => r.tuple().ok(),
        _         => None,
    }
}

#[cfg(test)]
mod test {
    use bytes::{BufMut, Bytes, BytesMut};
    use crate::codec::Frame;
    use crate::error::Error;
    use super::*;

    fn inbound(host: &str, ports: &str) -> Frame {
        let mut buf = BytesMut::new();
        buf.put_u16(BULLE.code());
        buf.put_u32(1000);
        buf.put_u32(42);
        buf.put_u32(7);
        buf.put_u16(host.len() as u16);
        buf.put_slice(host.as_bytes());
        buf.put_u16(ports.len() as u16);
        buf.put_slice(ports.as_bytes());
        Frame::new(buf.freeze(), 0)
    }

    #[test]
    fn identifier_layout() {
        assert_eq!(0x1C01, HANDSHAKE.code());
        assert_eq!(BULLE, Identifier::from(0x2C01));
    }

    #[test]
    fn parse_announce() {
        let announce = announce(&inbound("10.0.0.5", "X")).unwrap();
        assert_eq!(Some(Announce {
            tuple: Tuple { timestamp: 1000, player: 42, process: 7 },
            host:  "10.0.0.5".to_string(),
            ports: "X".to_string(),
        }), announce);
    }

    #[test]
    fn truncated_announce() {
        let full  = inbound("10.0.0.5", "X");
        let frame = Frame::new(full.data.slice(..20), 0);
        assert_eq!(Err(Error::Short(4)), announce(&frame));
    }

    #[test]
    fn other_messages_ignored() {
        let frame = Frame::new(Bytes::from_static(b"\x1c\x01"), 0);
        assert_eq!(Ok(None), announce(&frame));
    }

    #[test]
    fn outbound_tuple() {
        let data  = Bytes::from_static(b"\x01\x2c\x01\x00\x00\x03\xe8\x00\x00\x00\x2a\x00\x00\x00\x07");
        let frame = Frame::new(data, 1);
        assert_eq!(Some(Tuple { timestamp: 1000, player: 42, process: 7 }), bulle_tuple(&frame));
        assert!(!is_handshake(&frame));
    }
}
