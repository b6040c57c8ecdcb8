use bytes::BufMut;
use crate::error::{Error, Result};

pub const MAX_LEN: usize = 5;

pub fn encode<B: BufMut>(mut value: u32, dst: &mut B) {
    while value >= 0x80 {
        dst.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

pub fn decode(src: &[u8]) -> Result<Option<(u64, usize)>> {
    let mut value = 0u64;

    for (i, &byte) in src.iter().take(MAX_LEN).enumerate() {
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }

    match src.len() >= MAX_LEN {
        true  => Err(Error::Malformed),
        false => Ok(None),
    }
}
