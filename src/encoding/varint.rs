//! Bitcoin compact-size integers and script pushes

use crate::error::{CodecError, CodecResult};

/// Append a compact-size (CompactSize / var_int) integer
pub fn write_var_int(value: u64, buf: &mut Vec<u8>) {
    if value < 0xfd {
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Read a compact-size integer at `*pos`, advancing it
pub fn read_var_int(data: &[u8], pos: &mut usize) -> CodecResult<u64> {
    let first = *data.get(*pos).ok_or(CodecError::UnexpectedEnd(*pos))?;
    *pos += 1;
    let width = match first {
        0xfd => 2,
        0xfe => 4,
        0xff => 8,
        small => return Ok(small as u64),
    };
    let end = *pos + width;
    let bytes = data.get(*pos..end).ok_or(CodecError::UnexpectedEnd(*pos))?;
    let mut value = 0u64;
    for (i, b) in bytes.iter().enumerate() {
        value |= (*b as u64) << (8 * i);
    }
    *pos = end;
    Ok(value)
}

/// Append `data` as a minimal script push
pub fn push_data(data: &[u8], script: &mut Vec<u8>) {
    let len = data.len();
    if len < 0x4c {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(0x4c);
        script.push(len as u8);
    } else if len <= 0xffff {
        script.push(0x4d);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(0x4e);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// Append a length-prefixed byte string
pub fn write_var_bytes(data: &[u8], buf: &mut Vec<u8>) {
    write_var_int(data.len() as u64, buf);
    buf.extend_from_slice(data);
}
