//! Recursive Length Prefix encoding
//!
//! Items are encoded eagerly into `Vec<u8>` and lists concatenate
//! already-encoded items, which keeps transaction field order visible at
//! the call site.

/// Encode an unsigned integer (big-endian, no leading zeros, zero is empty)
pub fn encode_u64(val: u64) -> Vec<u8> {
    encode_uint_bytes(&val.to_be_bytes())
}

pub fn encode_u128(val: u128) -> Vec<u8> {
    encode_uint_bytes(&val.to_be_bytes())
}

/// Encode a big-endian unsigned integer of any width, e.g. a signature scalar
pub fn encode_uint_bytes(be: &[u8]) -> Vec<u8> {
    let start = be.iter().take_while(|&&b| b == 0).count();
    encode_bytes(&be[start..])
}

/// Encode a byte string verbatim
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }

    let mut result = encode_header(0x80, data.len());
    result.extend_from_slice(data);
    result
}

/// Encode a list whose items are already RLP encoded
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len: usize = items.iter().map(Vec::len).sum();
    let mut result = encode_header(0xc0, payload_len);
    for item in items {
        result.extend_from_slice(item);
    }
    result
}

fn encode_header(offset: u8, len: usize) -> Vec<u8> {
    if len < 56 {
        vec![offset + len as u8]
    } else {
        let len_bytes = encode_length(len);
        let mut header = vec![offset + 55 + len_bytes.len() as u8];
        header.extend_from_slice(&len_bytes);
        header
    }
}

fn encode_length(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    bytes[leading_zeros..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rlp_integers() {
        assert_eq!(encode_u64(0), vec![0x80]);
        assert_eq!(encode_u64(127), vec![127]);
        assert_eq!(encode_u64(128), vec![0x81, 128]);
        assert_eq!(encode_u64(1024), vec![0x82, 0x04, 0x00]);
        assert_eq!(
            encode_u128(1_000_000_000_000_000_000),
            hex::decode("880de0b6b3a7640000").unwrap()
        );
    }

    #[test]
    fn test_bytes_keep_leading_zeros() {
        assert_eq!(encode_bytes(&[0x00]), vec![0x00]);
        assert_eq!(encode_bytes(&[]), vec![0x80]);
        assert_eq!(encode_uint_bytes(&[0x00, 0x00, 0x05]), vec![0x05]);
    }

    #[test]
    fn test_long_string_and_list() {
        let data = vec![0xaa; 60];
        let encoded = encode_bytes(&data);
        assert_eq!(&encoded[..2], &[0xb8, 60]);
        assert_eq!(encoded.len(), 62);

        let list = encode_list(&[encode_bytes(b"cat"), encode_bytes(b"dog")]);
        assert_eq!(list, hex::decode("c88363617483646f67").unwrap());
        assert_eq!(encode_list(&[]), vec![0xc0]);
    }

    #[test]
    fn test_matches_reference_decoder() {
        let items = vec![encode_u64(9), encode_bytes(&[0x11; 70]), encode_list(&[])];
        let encoded = encode_list(&items);
        let rlp = ethers_core::utils::rlp::Rlp::new(&encoded);
        assert_eq!(rlp.item_count().unwrap(), 3);
        assert_eq!(rlp.val_at::<u64>(0).unwrap(), 9);
        assert_eq!(rlp.val_at::<Vec<u8>>(1).unwrap(), vec![0x11; 70]);
    }
}
