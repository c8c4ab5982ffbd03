//! Minimal CBOR (RFC 8949) value model
//!
//! Covers what Cardano transactions and addresses use: unsigned and
//! negative integers, byte and text strings, definite and indefinite
//! arrays, maps, tags, null and booleans. Maps keep insertion order; the
//! caller is responsible for canonical key order.

use crate::error::{CodecError, CodecResult};

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

const INDEFINITE: u8 = 31;
const BREAK: u8 = 0xff;

/// Tag wrapping an embedded CBOR data item
pub const TAG_ENCODED_CBOR: u64 = 24;

/// Deepest container nesting `decode` accepts
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cbor {
    Unsigned(u64),
    /// Encodes the integer `-1 - n`
    Negative(u64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Cbor>),
    IndefiniteArray(Vec<Cbor>),
    Map(Vec<(Cbor, Cbor)>),
    Tag(u64, Box<Cbor>),
    Bool(bool),
    Null,
    /// An already-encoded item spliced in verbatim
    Raw(Vec<u8>),
}

impl Cbor {
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Cbor::Bytes(data.into())
    }

    /// `tag24(bytes(inner))`, the encoded-CBOR wrapper
    pub fn embedded(inner: &Cbor) -> Self {
        Cbor::Tag(TAG_ENCODED_CBOR, Box::new(Cbor::Bytes(inner.encode())))
    }

    /// Map with small unsigned keys, in the order given
    pub fn int_map(entries: Vec<(u64, Cbor)>) -> Self {
        Cbor::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Cbor::Unsigned(k), v))
                .collect(),
        )
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Cbor::Unsigned(n) => write_head(MAJOR_UNSIGNED, *n, buf),
            Cbor::Negative(n) => write_head(MAJOR_NEGATIVE, *n, buf),
            Cbor::Bytes(data) => {
                write_head(MAJOR_BYTES, data.len() as u64, buf);
                buf.extend_from_slice(data);
            }
            Cbor::Text(text) => {
                write_head(MAJOR_TEXT, text.len() as u64, buf);
                buf.extend_from_slice(text.as_bytes());
            }
            Cbor::Array(items) => {
                write_head(MAJOR_ARRAY, items.len() as u64, buf);
                for item in items {
                    item.encode_into(buf);
                }
            }
            Cbor::IndefiniteArray(items) => {
                buf.push((MAJOR_ARRAY << 5) | INDEFINITE);
                for item in items {
                    item.encode_into(buf);
                }
                buf.push(BREAK);
            }
            Cbor::Map(entries) => {
                write_head(MAJOR_MAP, entries.len() as u64, buf);
                for (key, value) in entries {
                    key.encode_into(buf);
                    value.encode_into(buf);
                }
            }
            Cbor::Tag(tag, inner) => {
                write_head(MAJOR_TAG, *tag, buf);
                inner.encode_into(buf);
            }
            Cbor::Bool(false) => buf.push(0xf4),
            Cbor::Bool(true) => buf.push(0xf5),
            Cbor::Null => buf.push(0xf6),
            Cbor::Raw(data) => buf.extend_from_slice(data),
        }
    }

    /// Decode exactly one item spanning all of `data`
    pub fn decode(data: &[u8]) -> CodecResult<Cbor> {
        let mut pos = 0;
        let value = Self::decode_at(data, &mut pos, 0)?;
        if pos != data.len() {
            return Err(CodecError::TrailingBytes(data.len() - pos));
        }
        Ok(value)
    }

    /// Decode one item at `*pos`, advancing it; `depth` counts enclosing containers
    fn decode_at(data: &[u8], pos: &mut usize, depth: usize) -> CodecResult<Cbor> {
        let offset = *pos;
        if depth > MAX_DEPTH {
            return Err(CodecError::Invalid(format!(
                "nesting deeper than {} at offset {}",
                MAX_DEPTH, offset
            )));
        }
        let initial = *data.get(offset).ok_or(CodecError::UnexpectedEnd(offset))?;
        *pos += 1;
        let major = initial >> 5;
        let info = initial & 0x1f;

        if info == INDEFINITE {
            return match major {
                MAJOR_ARRAY => {
                    let mut items = Vec::new();
                    loop {
                        match data.get(*pos) {
                            Some(&BREAK) => {
                                *pos += 1;
                                break;
                            }
                            Some(_) => items.push(Self::decode_at(data, pos, depth + 1)?),
                            None => return Err(CodecError::UnexpectedEnd(*pos)),
                        }
                    }
                    Ok(Cbor::IndefiniteArray(items))
                }
                found => Err(CodecError::UnexpectedType { found, offset }),
            };
        }

        if major == MAJOR_SIMPLE {
            return match info {
                20 => Ok(Cbor::Bool(false)),
                21 => Ok(Cbor::Bool(true)),
                22 => Ok(Cbor::Null),
                _ => Err(CodecError::Invalid(format!(
                    "unsupported simple value {} at offset {}",
                    info, offset
                ))),
            };
        }

        let arg = read_argument(info, data, pos)?;
        match major {
            MAJOR_UNSIGNED => Ok(Cbor::Unsigned(arg)),
            MAJOR_NEGATIVE => Ok(Cbor::Negative(arg)),
            MAJOR_BYTES => Ok(Cbor::Bytes(take(data, pos, arg)?.to_vec())),
            MAJOR_TEXT => {
                let raw = take(data, pos, arg)?;
                String::from_utf8(raw.to_vec())
                    .map(Cbor::Text)
                    .map_err(|e| CodecError::Invalid(e.to_string()))
            }
            MAJOR_ARRAY => {
                let mut items = Vec::new();
                for _ in 0..arg {
                    items.push(Self::decode_at(data, pos, depth + 1)?);
                }
                Ok(Cbor::Array(items))
            }
            MAJOR_MAP => {
                let mut entries = Vec::new();
                for _ in 0..arg {
                    let key = Self::decode_at(data, pos, depth + 1)?;
                    let value = Self::decode_at(data, pos, depth + 1)?;
                    entries.push((key, value));
                }
                Ok(Cbor::Map(entries))
            }
            MAJOR_TAG => Ok(Cbor::Tag(arg, Box::new(Self::decode_at(data, pos, depth + 1)?))),
            found => Err(CodecError::UnexpectedType { found, offset }),
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Cbor::Unsigned(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Cbor::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Cbor]> {
        match self {
            Cbor::Array(items) | Cbor::IndefiniteArray(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Cbor, Cbor)]> {
        match self {
            Cbor::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_tag(&self, tag: u64) -> Option<&Cbor> {
        match self {
            Cbor::Tag(t, inner) if *t == tag => Some(inner),
            _ => None,
        }
    }

    /// Value stored under an unsigned key of a map
    pub fn map_get(&self, key: u64) -> Option<&Cbor> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_u64() == Some(key))
            .map(|(_, v)| v)
    }
}

fn write_head(major: u8, value: u64, buf: &mut Vec<u8>) {
    let major = major << 5;
    if value < 24 {
        buf.push(major | value as u8);
    } else if value <= 0xff {
        buf.push(major | 24);
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(major | 25);
        buf.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= 0xffff_ffff {
        buf.push(major | 26);
        buf.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        buf.push(major | 27);
        buf.extend_from_slice(&value.to_be_bytes());
    }
}

fn read_argument(info: u8, data: &[u8], pos: &mut usize) -> CodecResult<u64> {
    let width = match info {
        0..=23 => return Ok(info as u64),
        24 => 1,
        25 => 2,
        26 => 4,
        27 => 8,
        _ => {
            return Err(CodecError::Invalid(format!(
                "reserved additional info {} at offset {}",
                info,
                *pos - 1
            )))
        }
    };
    let bytes = take(data, pos, width)?;
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

fn take<'a>(data: &'a [u8], pos: &mut usize, len: u64) -> CodecResult<&'a [u8]> {
    let len = usize::try_from(len).map_err(|_| CodecError::OutOfRange(len.to_string()))?;
    let end = pos
        .checked_add(len)
        .ok_or_else(|| CodecError::OutOfRange(len.to_string()))?;
    let slice = data.get(*pos..end).ok_or(CodecError::UnexpectedEnd(*pos))?;
    *pos = end;
    Ok(slice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_heads() {
        assert_eq!(Cbor::Unsigned(0).encode(), vec![0x00]);
        assert_eq!(Cbor::Unsigned(23).encode(), vec![0x17]);
        assert_eq!(Cbor::Unsigned(24).encode(), vec![0x18, 0x18]);
        assert_eq!(Cbor::Unsigned(1000).encode(), vec![0x19, 0x03, 0xe8]);
        assert_eq!(
            Cbor::Unsigned(764824073).encode(),
            hex::decode("1a2d964a09").unwrap()
        );
        assert_eq!(Cbor::Negative(0).encode(), vec![0x20]);
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let mut nested = vec![0x81; MAX_DEPTH];
        nested.push(0x00);
        assert!(Cbor::decode(&nested).is_ok());

        let mut deep = vec![0x81; 20_000];
        deep.push(0x00);
        assert!(matches!(Cbor::decode(&deep), Err(CodecError::Invalid(_))));

        let mut tags = vec![0xd8, 0x18].repeat(MAX_DEPTH + 1);
        tags.push(0x00);
        assert!(Cbor::decode(&tags).is_err());
    }

    #[test]
    fn test_structures() {
        let value = Cbor::Array(vec![
            Cbor::Unsigned(0),
            Cbor::Array(vec![Cbor::Unsigned(0), Cbor::bytes(vec![0xab; 2])]),
            Cbor::Map(vec![]),
        ]);
        assert_eq!(value.encode(), hex::decode("83008200 42abab a0".replace(' ', "")).unwrap());

        let indefinite = Cbor::IndefiniteArray(vec![Cbor::Unsigned(1)]);
        assert_eq!(indefinite.encode(), vec![0x9f, 0x01, 0xff]);
        assert_eq!(Cbor::Null.encode(), vec![0xf6]);
    }

    #[test]
    fn test_embedded_item() {
        let inner = Cbor::Array(vec![Cbor::Unsigned(1)]);
        assert_eq!(Cbor::embedded(&inner).encode(), vec![0xd8, 0x18, 0x42, 0x81, 0x01]);
    }

    #[test]
    fn test_decode_roundtrip_and_accessors() {
        let value = Cbor::Array(vec![
            Cbor::embedded(&Cbor::Text("hi".into())),
            Cbor::int_map(vec![(2, Cbor::Unsigned(500)), (3, Cbor::Bool(true))]),
            Cbor::IndefiniteArray(vec![Cbor::Null]),
        ]);
        let decoded = Cbor::decode(&value.encode()).unwrap();
        assert_eq!(decoded, value);

        let items = decoded.as_array().unwrap();
        assert!(items[0].as_tag(TAG_ENCODED_CBOR).is_some());
        assert_eq!(items[1].map_get(2).and_then(Cbor::as_u64), Some(500));
        assert!(items[1].map_get(7).is_none());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            Cbor::decode(&[0x42, 0x01]),
            Err(CodecError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            Cbor::decode(&[0x01, 0x02]),
            Err(CodecError::TrailingBytes(1))
        ));
        assert!(Cbor::decode(&[0x9f, 0x01]).is_err());
    }
}
