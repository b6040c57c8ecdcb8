use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;
use crate::error::Error;
use crate::proto::{BULLE, HANDSHAKE};
use super::{varint, Frame, FrameCodec, Framer};

const MAX: usize = 32 * 1024 * 1024;

fn stream(codec: &mut FrameCodec, frames: &[&[u8]]) -> BytesMut {
    let mut buf = BytesMut::new();
    for frame in frames {
        codec.encode(Bytes::copy_from_slice(frame), &mut buf).unwrap();
    }
    buf
}

fn framed(extra: usize, chunks: &[&[u8]]) -> Vec<Frame> {
    let mut framer = Framer::new(FrameCodec::new(extra, MAX));
    chunks.iter().flat_map(|chunk| framer.push(chunk).unwrap()).collect()
}

#[test]
fn varint_values() {
    let mut values = vec![0, 1, 127, 128, 255, 300, 16_383, 16_384, 2_097_151, 2_097_152, (1 << 28) - 1];
    values.extend((0..1 << 28).step_by(99_991));

    for value in values {
        let mut buf = BytesMut::new();
        varint::encode(value, &mut buf);
        assert_eq!(Some((u64::from(value), buf.len())), varint::decode(&buf).unwrap(), "{}", value);
    }
}

#[test]
fn varint_bit_layout() {
    let mut buf = BytesMut::new();
    varint::encode(300, &mut buf);
    assert_eq!(&[0xAC, 0x02], &buf[..]);
}

#[test]
fn varint_incomplete_and_malformed() {
    assert_eq!(Ok(None), varint::decode(&[]));
    assert_eq!(Ok(None), varint::decode(&[0x80, 0x80]));
    assert_eq!(Err(Error::Malformed), varint::decode(&[0x80; 5]));
    assert_eq!(Ok(Some((1 << 28, 5))), varint::decode(&[0x80, 0x80, 0x80, 0x80, 0x01]));
}

#[test]
fn frames_in_one_chunk() {
    let mut codec = FrameCodec::inbound(MAX);
    let input: Vec<&[u8]> = vec![b"\x2c\x01abc", b"", b"hello"];
    let bytes = stream(&mut codec, &input);

    let frames = framed(0, &[&bytes[..]]);
    let data   = frames.iter().map(|f| &f.data[..]).collect::<Vec<_>>();

    assert_eq!(input, data);
    assert_eq!(Some(BULLE), frames[0].identifier());
    assert_eq!(None, frames[2].fingerprint());
}

#[test]
fn rechunking_is_transparent() {
    let long  = vec![0x5Au8; 300];
    let input: Vec<&[u8]> = vec![b"\x07\x1c\x01", &long, b"\x03\x00", b"\x09\x2c\x01xyz"];

    let mut codec = FrameCodec::outbound(MAX);
    let bytes  = stream(&mut codec, &input);
    let whole  = framed(1, &[&bytes[..]]);
    let single = framed(1, &bytes.chunks(1).collect::<Vec<_>>());
    let odd    = framed(1, &bytes.chunks(7).collect::<Vec<_>>());
    let split  = framed(1, &[&bytes[..2], &bytes[2..290], &bytes[290..]]);

    assert_eq!(4, whole.len());
    assert_eq!(whole, single);
    assert_eq!(whole, odd);
    assert_eq!(whole, split);
}

#[test]
fn outbound_fingerprint() {
    let mut codec = FrameCodec::outbound(MAX);
    let bytes  = stream(&mut codec, &[&b"\x07\x1c\x01rest"[..]]);

    assert_eq!(&[0x06, 0x07, 0x1c, 0x01], &bytes[..4]);

    let frames = framed(1, &[&bytes[..]]);
    assert_eq!(1, frames.len());
    assert_eq!(Some(0x07), frames[0].fingerprint());
    assert_eq!(Some(HANDSHAKE), frames[0].identifier());
    assert_eq!(&b"\x1c\x01rest"[..], &frames[0].body()[..]);
}

#[test]
fn partial_frame_stays_pending() {
    let mut framer = Framer::new(FrameCodec::inbound(MAX));
    assert!(framer.push(&[0x05, 1, 2]).unwrap().is_empty());
    assert_eq!(2, framer.pending());
    let frames = framer.push(&[3, 4, 5, 0x01]).unwrap();
    assert_eq!(1, frames.len());
    assert_eq!(&[1, 2, 3, 4, 5], &frames[0].data[..]);
    assert_eq!(0, framer.pending());
}

#[test]
fn malformed_prefix_fails() {
    let mut framer = Framer::new(FrameCodec::inbound(MAX));
    assert_eq!(Err(Error::Malformed), framer.push(&[0xFF; 5]));
}

#[test]
fn oversize_frame_fails() {
    let mut framer = Framer::new(FrameCodec::inbound(16));
    assert_eq!(Err(Error::Oversize(17, 16)), framer.push(&[17]));
}
